// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::instructions::flag::{find_flag, Flag};
use crate::parser::*;
use crate::splicer::Span;
use crate::util::*;

/// The command run by a `HEALTHCHECK CMD` instruction.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HealthcheckCmd {
  /// The `CMD` keyword as written.
  pub keyword: SpannedString,
  pub expr: ShellOrExecExpr
}

/// A Dockerfile [`HEALTHCHECK` instruction][healthcheck].
///
/// `HEALTHCHECK NONE` has no command and no flags.
///
/// [healthcheck]: https://docs.docker.com/engine/reference/builder/#healthcheck
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HealthcheckInstruction {
  pub span: Span,
  pub flags: Vec<Flag>,
  pub cmd: Option<HealthcheckCmd>
}

impl HealthcheckInstruction {
  /// Creates a `HEALTHCHECK NONE` instruction.
  pub fn none() -> HealthcheckInstruction {
    HealthcheckInstruction {
      span: Span::default(),
      flags: Vec::new(),
      cmd: None
    }
  }

  pub fn cmd(expr: ShellOrExecExpr) -> HealthcheckInstruction {
    HealthcheckInstruction {
      span: Span::default(),
      flags: Vec::new(),
      cmd: Some(HealthcheckCmd {
        keyword: SpannedString::detached("CMD"),
        expr
      })
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<HealthcheckInstruction> {
    let span = source.span(&record);
    let mut flags = Vec::new();
    let mut keyword = None;
    let mut expr = None;

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::healthcheck_none => (),
        Rule::flag => flags.push(Flag::from_record(field, source)?),
        Rule::healthcheck_cmd => keyword = Some(source.spanned(&field)),
        Rule::exec_form | Rule::shell_form => {
          expr = Some(ShellOrExecExpr::from_record(field, source)?)
        },
        _ => return Err(unexpected_token(field))
      }
    }

    let cmd = match (keyword, expr) {
      (Some(keyword), Some(expr)) => Some(HealthcheckCmd { keyword, expr }),
      (None, None) => None,
      _ => return Err(missing("healthcheck command"))
    };

    Ok(HealthcheckInstruction { span, flags, cmd })
  }

  /// Returns a flag by name, e.g. `interval` or `retries`.
  pub fn flag(&self, name: &str) -> Option<&Flag> {
    find_flag(&self.flags, name)
  }

  pub fn is_none(&self) -> bool {
    self.cmd.is_none()
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a HealthcheckInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Healthcheck(h) = instruction {
      Ok(h)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "HealthcheckInstruction".into()
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::test_util::*;

  #[test]
  fn healthcheck_none() -> Result<()> {
    let h = parse_single("HEALTHCHECK none", Rule::healthcheck)?
      .into_healthcheck().unwrap();

    assert!(h.is_none());
    assert!(h.flags.is_empty());

    Ok(())
  }

  #[test]
  fn healthcheck_cmd() -> Result<()> {
    let h = parse_single(
      "HEALTHCHECK --interval=5m --timeout=3s \\\n  CMD curl -f http://localhost/ || exit 1",
      Rule::healthcheck
    )?.into_healthcheck().unwrap();

    assert_eq!(h.flags.len(), 2);
    assert_eq!(
      h.flag("timeout").and_then(|f| f.value.as_ref()).map(|v| v.content.as_str()),
      Some("3s")
    );

    let cmd = h.cmd.unwrap();
    assert_eq!(cmd.keyword.content, "CMD");
    assert_eq!(
      cmd.expr.as_shell().map(|s| s.to_string()),
      Some("curl -f http://localhost/ || exit 1".to_string())
    );

    let h = parse_single(r#"healthcheck cmd ["true"]"#, Rule::healthcheck)?
      .into_healthcheck().unwrap();
    assert_eq!(
      h.cmd.and_then(|c| c.expr.into_exec()).map(|a| a.as_str_vec().len()),
      Some(1)
    );

    Ok(())
  }

  #[test]
  fn healthcheck_invalid() {
    assert!(parse_single("HEALTHCHECK --interval=5m", Rule::healthcheck).is_err());
    assert!(parse_single("HEALTHCHECK curl", Rule::healthcheck).is_err());
  }
}
