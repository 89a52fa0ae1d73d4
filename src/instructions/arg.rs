// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::SpannedString;
use crate::error::*;

/// A single build argument declared by an `ARG` instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
  pub span: Span,

  /// The argument key
  pub name: SpannedString,

  /// An optional argument value, with quotes removed.
  ///
  /// This may be unset when passing arguments through to later stages in a
  /// [multi-stage build][build].
  ///
  /// [build]: https://docs.docker.com/develop/develop-images/multistage-build/
  pub value: Option<SpannedString>
}

impl Arg {
  pub fn new<S: Into<String>>(name: S, value: Option<S>) -> Arg {
    Arg {
      span: Span::default(),
      name: SpannedString::detached(name),
      value: value.map(SpannedString::detached)
    }
  }

  fn from_record(record: Pair, source: &Source) -> Result<Arg> {
    let span = source.span(&record);
    let mut name = None;
    let mut value = None;

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::arg_name => name = Some(source.spanned(&field)),
        Rule::arg_value => value = Some(source.decoded(&field)),
        _ => return Err(unexpected_token(field))
      }
    }

    let name = name.ok_or_else(|| missing("arg name"))?;

    Ok(Arg { span, name, value })
  }
}

/// A Dockerfile [`ARG` instruction][arg].
///
/// A single instruction may declare several arguments, e.g.
/// `ARG VERSION=1.0 TARGET`.
///
/// [arg]: https://docs.docker.com/engine/reference/builder/#arg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgInstruction {
  pub span: Span,
  pub args: Vec<Arg>
}

impl ArgInstruction {
  pub fn new<S: Into<String>>(name: S, value: Option<S>) -> ArgInstruction {
    ArgInstruction {
      span: Span::default(),
      args: vec![Arg::new(name, value)]
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<ArgInstruction> {
    let span = source.span(&record);
    let mut args = Vec::new();

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::arg_pair => args.push(Arg::from_record(field, source)?),
        _ => return Err(unexpected_token(field))
      }
    }

    Ok(ArgInstruction { span, args })
  }

  /// Finds a declared argument by name.
  pub fn get(&self, name: &str) -> Option<&Arg> {
    self.args.iter().find(|a| a.name.content == name)
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a ArgInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Arg(a) = instruction {
      Ok(a)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "ArgInstruction".into()
      })
    }
  }
}
