// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::SpannedString;

/// A Dockerfile [`EXPOSE` instruction][expose], e.g. `EXPOSE 80/tcp 443`.
///
/// [expose]: https://docs.docker.com/engine/reference/builder/#expose
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ExposeInstruction {
  pub span: Span,
  pub ports: Vec<SpannedString>
}

impl ExposeInstruction {
  pub fn new<S: Into<String>>(ports: Vec<S>) -> ExposeInstruction {
    ExposeInstruction {
      span: Span::default(),
      ports: ports.into_iter().map(SpannedString::detached).collect()
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<ExposeInstruction> {
    let span = source.span(&record);
    let mut ports = Vec::new();

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::expose_port => ports.push(source.decoded(&field)),
        _ => return Err(unexpected_token(field))
      }
    }

    Ok(ExposeInstruction { span, ports })
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a ExposeInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Expose(e) = instruction {
      Ok(e)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "ExposeInstruction".into()
      })
    }
  }
}
