// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::instructions::pairs::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::error::*;

/// A Dockerfile [`ENV` instruction][env].
///
/// [env]: https://docs.docker.com/engine/reference/builder/#env
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EnvInstruction {
  pub span: Span,
  pub style: KeyValueStyle,
  pub vars: Vec<KeyValuePair>
}

impl EnvInstruction {
  pub fn new(vars: Vec<KeyValuePair>) -> EnvInstruction {
    EnvInstruction {
      span: Span::default(),
      style: KeyValueStyle::Equals,
      vars
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<EnvInstruction> {
    let span = source.span(&record);
    let (style, vars) = parse_key_values(record, source)?;

    Ok(EnvInstruction { span, style, vars })
  }

  /// Returns the value this instruction sets for `key`, if any.
  pub fn get(&self, key: &str) -> Option<&str> {
    find_value(&self.vars, key)
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a EnvInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Env(e) = instruction {
      Ok(e)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "EnvInstruction".into()
      })
    }
  }
}
