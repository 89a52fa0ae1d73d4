// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::instructions::flag::{find_flag, Flag};
use crate::instructions::heredoc::Heredoc;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::*;

/// A Dockerfile [`RUN` instruction][run].
///
/// An run command may be defined as either a single string (to be run in the
/// default shell), or a list of strings (to be run directly).
///
/// [run]: https://docs.docker.com/engine/reference/builder/#run
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RunInstruction {
  pub span: Span,
  pub flags: Vec<Flag>,
  pub expr: ShellOrExecExpr,

  /// Heredocs referenced by the command, in order.
  pub heredocs: Vec<Heredoc>
}

impl RunInstruction {
  pub fn new(expr: ShellOrExecExpr) -> RunInstruction {
    RunInstruction {
      span: Span::default(),
      flags: Vec::new(),
      expr,
      heredocs: Vec::new()
    }
  }

  pub fn shell<S: Into<String>>(s: S) -> RunInstruction {
    RunInstruction::new(ShellOrExecExpr::shell(s))
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> RunInstruction {
    RunInstruction::new(ShellOrExecExpr::exec(args))
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<RunInstruction> {
    let span = source.span(&record);
    let mut flags = Vec::new();
    let mut expr = None;

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::flag => flags.push(Flag::from_record(field, source)?),
        Rule::exec_form | Rule::shell_form => {
          expr = Some(ShellOrExecExpr::from_record(field, source)?)
        },
        _ => return Err(unexpected_token(field))
      }
    }

    let expr = expr.ok_or_else(|| missing("run command"))?;

    Ok(RunInstruction { span, flags, expr, heredocs: Vec::new() })
  }

  /// Returns a flag by name, e.g. `mount` or `network`.
  pub fn flag(&self, name: &str) -> Option<&Flag> {
    find_flag(&self.flags, name)
  }

  pub fn as_shell(&self) -> Option<&BreakableString> {
    self.expr.as_shell()
  }

  pub fn as_exec(&self) -> Option<&StringArray> {
    self.expr.as_exec()
  }

  pub fn into_shell(self) -> Option<BreakableString> {
    self.expr.into_shell()
  }

  pub fn into_exec(self) -> Option<StringArray> {
    self.expr.into_exec()
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a RunInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Run(r) = instruction {
      Ok(r)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "RunInstruction".into()
      })
    }
  }
}
