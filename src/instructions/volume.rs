// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::*;

/// A Dockerfile [`VOLUME` instruction][volume], given either as a JSON array
/// or as plain paths.
///
/// [volume]: https://docs.docker.com/engine/reference/builder/#volume
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VolumeInstruction {
  pub span: Span,
  pub paths: Vec<SpannedString>,

  /// True if the paths were given as a JSON array.
  pub json: bool
}

impl VolumeInstruction {
  pub fn new<S: Into<String>>(paths: Vec<S>) -> VolumeInstruction {
    VolumeInstruction {
      span: Span::default(),
      paths: paths.into_iter().map(SpannedString::detached).collect(),
      json: false
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<VolumeInstruction> {
    let span = source.span(&record);
    let mut paths = Vec::new();
    let mut json = false;

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::volume_path => paths.push(source.decoded(&field)),
        Rule::exec_form => {
          let array = field.into_inner()
            .next()
            .ok_or_else(|| missing("volume array"))?;

          paths.extend(StringArray::from_record(array, source)?.elements);
          json = true;
        },
        _ => return Err(unexpected_token(field))
      }
    }

    Ok(VolumeInstruction { span, paths, json })
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a VolumeInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Volume(v) = instruction {
      Ok(v)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "VolumeInstruction".into()
      })
    }
  }
}
