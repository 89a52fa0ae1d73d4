// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::*;

/// A Dockerfile [`SHELL` instruction][shell].
///
/// Docker only accepts the exec form; a shell-form argument is kept as
/// written so the instruction still round-trips.
///
/// [shell]: https://docs.docker.com/engine/reference/builder/#shell
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ShellInstruction {
  pub span: Span,
  pub expr: ShellOrExecExpr
}

impl ShellInstruction {
  pub fn exec<S: Into<String>>(args: Vec<S>) -> ShellInstruction {
    ShellInstruction {
      span: Span::default(),
      expr: ShellOrExecExpr::exec(args)
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<ShellInstruction> {
    let span = source.span(&record);
    let field = record.into_inner()
      .next()
      .ok_or_else(|| missing("shell command"))?;

    Ok(ShellInstruction {
      span,
      expr: ShellOrExecExpr::from_record(field, source)?
    })
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a ShellInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Shell(s) = instruction {
      Ok(s)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "ShellInstruction".into()
      })
    }
  }
}
