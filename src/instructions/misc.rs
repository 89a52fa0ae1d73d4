// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::*;

/// A miscellaneous (unsupported) Dockerfile instruction.
///
/// These are instructions with an unknown keyword, and known instructions
/// whose arguments could not be parsed. Both are kept as written so the
/// Dockerfile still round-trips.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MiscInstruction {
  pub span: Span,
  pub instruction: SpannedString,
  pub arguments: BreakableString
}

impl MiscInstruction {
  pub fn new<S1, S2>(instruction: S1, arguments: S2) -> MiscInstruction
  where
    S1: Into<String>,
    S2: Into<String>,
  {
    MiscInstruction {
      span: Span::default(),
      instruction: SpannedString::detached(instruction),
      arguments: BreakableString::text(arguments)
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<MiscInstruction> {
    let span = source.span(&record);
    let mut instruction = None;
    let mut arguments = None;

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::misc_instruction => instruction = Some(source.spanned(&field)),
        Rule::misc_arguments => arguments = Some(source.breakable(&field)),
        _ => return Err(unexpected_token(field))
      }
    }

    let instruction = instruction.ok_or_else(|| missing("instruction name"))?;
    let arguments = arguments
      .unwrap_or_else(|| BreakableString::new((span.end, span.end)));

    Ok(MiscInstruction { span, instruction, arguments })
  }

  /// Builds an instruction from raw text without the grammar, used when a
  /// known instruction's arguments are malformed.
  pub(crate) fn from_text(
    keyword: SpannedString, span: Span, source: &Source
  ) -> MiscInstruction {
    let rest = Span::new(keyword.span.end, span.end).slice(source.content);
    let start = keyword.span.end + (rest.len() - rest.trim_start().len());

    let arguments = BreakableString::from_source(
      Span::new(start, span.end).slice(source.content),
      start,
      source.escape
    );

    MiscInstruction { span, instruction: keyword, arguments }
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a MiscInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Misc(m) = instruction {
      Ok(m)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "MiscInstruction".into()
      })
    }
  }
}
