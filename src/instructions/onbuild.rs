// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::SpannedString;

/// A Dockerfile [`ONBUILD` instruction][onbuild], wrapping a trigger
/// instruction to run in images built from this one.
///
/// [onbuild]: https://docs.docker.com/engine/reference/builder/#onbuild
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OnbuildInstruction {
  pub span: Span,

  /// The trigger's keyword as written.
  pub keyword: SpannedString,
  pub trigger: Box<Instruction>
}

impl OnbuildInstruction {
  pub fn new<I: Into<Instruction>>(trigger: I) -> OnbuildInstruction {
    let trigger = trigger.into();

    OnbuildInstruction {
      span: Span::default(),
      keyword: SpannedString::detached(trigger.keyword()),
      trigger: Box::new(trigger)
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<OnbuildInstruction> {
    let span = source.span(&record);
    let field = record.into_inner()
      .next()
      .ok_or_else(|| missing("onbuild trigger"))?;

    let trigger_span = source.span(&field);
    let text = source.text(&field);
    let keyword_len = text
      .find(|c: char| c.is_whitespace() || c == source.escape)
      .unwrap_or_else(|| text.len());

    let keyword = SpannedString::new(
      Span::new(trigger_span.start, trigger_span.start + keyword_len),
      &text[..keyword_len]
    );

    let rule = match instruction_rule(&keyword.content) {
      Some(Rule::onbuild) | Some(Rule::from) | Some(Rule::maintainer) => {
        return Err(Error::GenericParseError {
          message: format!("{} is not allowed as an ONBUILD trigger", keyword)
        });
      },
      Some(rule) => rule,
      None => Rule::misc
    };

    let (pair, source) = source.parse(rule, trigger_span)?;
    let trigger = Instruction::from_record(pair, &source)?;

    Ok(OnbuildInstruction {
      span,
      keyword,
      trigger: Box::new(trigger)
    })
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a OnbuildInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Onbuild(o) = instruction {
      Ok(o)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "OnbuildInstruction".into()
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
  fn onbuild_trigger() -> Result<()> {
    let onbuild = parse_single("ONBUILD copy . /app", Rule::onbuild)?
      .into_onbuild().unwrap();

    assert_eq!(onbuild.keyword, SpannedString::new(Span::new(8, 12), "copy"));

    let copy = onbuild.trigger.into_copy().unwrap();
    assert_eq!(copy.span, Span::new(8, 19));
    assert_eq!(copy.destination, SpannedString::new(Span::new(15, 19), "/app"));

    Ok(())
  }

  #[test]
  fn onbuild_invalid_trigger() {
    assert!(parse_single("ONBUILD ONBUILD RUN x", Rule::onbuild).is_err());
    assert!(parse_single("ONBUILD FROM alpine", Rule::onbuild).is_err());
  }

  #[test]
  fn onbuild_unknown_trigger() -> Result<()> {
    let onbuild = parse_single("ONBUILD FROB x", Rule::onbuild)?
      .into_onbuild().unwrap();

    assert_eq!(onbuild.trigger.into_misc().map(|m| m.instruction.content), Some("FROB".into()));

    Ok(())
  }
}
