// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::*;

/// A Dockerfile [`ENTRYPOINT` instruction][entrypoint].
///
/// [entrypoint]: https://docs.docker.com/engine/reference/builder/#entrypoint
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EntrypointInstruction {
  pub span: Span,
  pub expr: ShellOrExecExpr
}

impl EntrypointInstruction {
  pub fn exec<S: Into<String>>(args: Vec<S>) -> EntrypointInstruction {
    EntrypointInstruction {
      span: Span::default(),
      expr: ShellOrExecExpr::exec(args)
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<EntrypointInstruction> {
    let span = source.span(&record);
    let field = record.into_inner()
      .next()
      .ok_or_else(|| missing("entrypoint command"))?;

    Ok(EntrypointInstruction {
      span,
      expr: ShellOrExecExpr::from_record(field, source)?
    })
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a EntrypointInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Entrypoint(e) = instruction {
      Ok(e)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "EntrypointInstruction".into()
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_util::*;

  #[test]
  fn entrypoint_basic() -> Result<()> {
    let e = parse_single(r#"ENTRYPOINT ["/bin/sh", "-c"]"#, Rule::entrypoint)?
      .into_entrypoint().unwrap();
    assert_eq!(e.expr.as_exec().map(|a| a.as_str_vec()), Some(vec!["/bin/sh", "-c"]));

    let e = parse_single("entrypoint exec top -b", Rule::entrypoint)?
      .into_entrypoint().unwrap();
    assert_eq!(e.expr.as_shell().map(|s| s.to_string()), Some("exec top -b".to_string()));

    Ok(())
  }
}
