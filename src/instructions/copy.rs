// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use snafu::ensure;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::instructions::flag::{find_flag, Flag};
use crate::instructions::heredoc::Heredoc;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::*;

/// The parsed arguments shared by `COPY` and `ADD`.
struct PathArgs {
  flags: Vec<Flag>,
  sources: Vec<SpannedString>,
  destination: SpannedString,
  json: bool
}

fn parse_path_args(record: Pair, source: &Source) -> Result<PathArgs> {
  let mut flags = Vec::new();
  let mut paths = Vec::new();
  let mut json = false;

  for field in record.into_inner() {
    match field.as_rule() {
      Rule::flag => flags.push(Flag::from_record(field, source)?),
      Rule::copy_pathspec => paths.push(source.decoded(&field)),
      Rule::exec_form => {
        let array = field.into_inner()
          .next()
          .ok_or_else(|| missing("path array"))?;

        paths.extend(StringArray::from_record(array, source)?.elements);
        json = true;
      },
      _ => return Err(unexpected_token(field))
    }
  }

  ensure!(
    paths.len() >= 2,
    GenericParseError {
      message: "at least one source and a destination are required"
    }
  );

  let destination = paths.pop().ok_or_else(|| missing("destination"))?;

  Ok(PathArgs { flags, sources: paths, destination, json })
}

/// A Dockerfile [`COPY` instruction][copy].
///
/// Heredoc sources (e.g. `COPY <<EOF /etc/motd`) appear in `sources` as their
/// marker text, with their bodies in `heredocs`.
///
/// [copy]: https://docs.docker.com/engine/reference/builder/#copy
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CopyInstruction {
  pub span: Span,
  pub flags: Vec<Flag>,
  pub sources: Vec<SpannedString>,
  pub destination: SpannedString,

  /// True if the paths were given as a JSON array.
  pub json: bool,

  pub heredocs: Vec<Heredoc>
}

impl CopyInstruction {
  pub fn new<S: Into<String>>(sources: Vec<S>, destination: S) -> CopyInstruction {
    CopyInstruction {
      span: Span::default(),
      flags: Vec::new(),
      sources: sources.into_iter().map(SpannedString::detached).collect(),
      destination: SpannedString::detached(destination),
      json: false,
      heredocs: Vec::new()
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<CopyInstruction> {
    let span = source.span(&record);
    let args = parse_path_args(record, source)?;

    Ok(CopyInstruction {
      span,
      flags: args.flags,
      sources: args.sources,
      destination: args.destination,
      json: args.json,
      heredocs: Vec::new()
    })
  }

  /// Returns the `--from` flag, naming a stage, image or build context.
  pub fn from_flag(&self) -> Option<&Flag> {
    find_flag(&self.flags, "from")
  }
}

/// A Dockerfile [`ADD` instruction][add].
///
/// [add]: https://docs.docker.com/engine/reference/builder/#add
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AddInstruction {
  pub span: Span,
  pub flags: Vec<Flag>,
  pub sources: Vec<SpannedString>,
  pub destination: SpannedString,
  pub json: bool,
  pub heredocs: Vec<Heredoc>
}

impl AddInstruction {
  pub fn new<S: Into<String>>(sources: Vec<S>, destination: S) -> AddInstruction {
    AddInstruction {
      span: Span::default(),
      flags: Vec::new(),
      sources: sources.into_iter().map(SpannedString::detached).collect(),
      destination: SpannedString::detached(destination),
      json: false,
      heredocs: Vec::new()
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<AddInstruction> {
    let span = source.span(&record);
    let args = parse_path_args(record, source)?;

    Ok(AddInstruction {
      span,
      flags: args.flags,
      sources: args.sources,
      destination: args.destination,
      json: args.json,
      heredocs: Vec::new()
    })
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a CopyInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Copy(c) = instruction {
      Ok(c)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "CopyInstruction".into()
      })
    }
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a AddInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Add(a) = instruction {
      Ok(a)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "AddInstruction".into()
      })
    }
  }
}
