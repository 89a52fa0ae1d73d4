// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::*;

/// A Dockerfile [`CMD` instruction][cmd].
///
/// [cmd]: https://docs.docker.com/engine/reference/builder/#cmd
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CmdInstruction {
  pub span: Span,
  pub expr: ShellOrExecExpr
}

impl CmdInstruction {
  pub fn shell<S: Into<String>>(s: S) -> CmdInstruction {
    CmdInstruction {
      span: Span::default(),
      expr: ShellOrExecExpr::shell(s)
    }
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> CmdInstruction {
    CmdInstruction {
      span: Span::default(),
      expr: ShellOrExecExpr::exec(args)
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<CmdInstruction> {
    let span = source.span(&record);
    let field = record.into_inner()
      .next()
      .ok_or_else(|| missing("cmd command"))?;

    Ok(CmdInstruction {
      span,
      expr: ShellOrExecExpr::from_record(field, source)?
    })
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a CmdInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Cmd(c) = instruction {
      Ok(c)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "CmdInstruction".into()
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::test_util::*;

  fn expr(input: &str) -> Result<ShellOrExecExpr> {
    Ok(parse_single(input, Rule::cmd)?.into_cmd().unwrap().expr)
  }

  #[test]
  fn cmd_basic() -> Result<()> {
    assert_eq!(
      expr(r#"cmd echo "hello world""#)?.as_shell().map(|s| s.to_string()),
      Some("echo \"hello world\"".to_string())
    );

    assert_eq!(
      expr(r#"cmd ["echo", "hello world"]"#)?.as_exec().map(|a| a.as_str_vec()),
      Some(vec!["echo", "hello world"])
    );

    Ok(())
  }

  #[test]
  fn cmd_two_words() -> Result<()> {
    assert_eq!(
      expr(r#"CMD ["a","b"]"#)?.as_exec().map(|a| a.as_str_vec()),
      Some(vec!["a", "b"])
    );
    assert_eq!(
      expr("CMD a b")?.as_shell().map(|s| s.to_string()),
      Some("a b".to_string())
    );

    Ok(())
  }

  #[test]
  fn cmd_multiline() -> Result<()> {
    assert_eq!(
      expr(r#"cmd echo \
        "hello world""#)?.as_shell().map(|s| s.to_string()),
      Some("echo         \"hello world\"".to_string())
    );

    assert_eq!(
      expr(r#"cmd\
        [\
        "echo", \
        "hello world"\
        ]"#)?.as_exec().map(|a| a.as_str_vec()),
      Some(vec!["echo", "hello world"])
    );

    Ok(())
  }
}
