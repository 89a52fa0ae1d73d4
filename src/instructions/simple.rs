// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

//! Instructions taking a single free-form argument.

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::SpannedString;
use crate::word::decode_word;

/// Reads the argument of a single-argument instruction, joining continuation
/// lines. With `decode`, quotes are removed and escapes applied.
fn parse_argument(record: Pair, source: &Source, decode: bool) -> Result<(Span, SpannedString)> {
  let span = source.span(&record);
  let field = record.into_inner()
    .next()
    .ok_or_else(|| missing("argument"))?;

  match field.as_rule() {
    Rule::argument => {
      let joined = source.breakable(&field).to_string();
      let joined = joined.trim_end();
      let content = if decode {
        decode_word(joined, source.escape)
      } else {
        joined.to_string()
      };

      Ok((span, SpannedString::new(source.span(&field), content)))
    },
    _ => Err(unexpected_token(field))
  }
}

/// Defines a single-argument instruction struct.
macro_rules! simple_instruction {
  (
    $(#[$meta:meta])*
    $struct:ident, $variant:ident, $decode:expr
  ) => {
    $(#[$meta])*
    #[derive(Debug, PartialEq, Eq, Clone)]
    pub struct $struct {
      pub span: Span,
      pub value: SpannedString
    }

    impl $struct {
      pub fn new<S: Into<String>>(value: S) -> $struct {
        $struct {
          span: Span::default(),
          value: SpannedString::detached(value)
        }
      }

      pub(crate) fn from_record(record: Pair, source: &Source) -> Result<$struct> {
        let (span, value) = parse_argument(record, source, $decode)?;

        Ok($struct { span, value })
      }
    }

    impl<'a> TryFrom<&'a Instruction> for &'a $struct {
      type Error = Error;

      fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
        if let Instruction::$variant(i) = instruction {
          Ok(i)
        } else {
          Err(Error::ConversionError {
            from: format!("{:?}", instruction),
            to: stringify!($struct).into()
          })
        }
      }
    }
  };
}

simple_instruction!(
  /// A Dockerfile [`USER` instruction][user], e.g. `USER app:app`.
  ///
  /// [user]: https://docs.docker.com/engine/reference/builder/#user
  UserInstruction, User, true
);

simple_instruction!(
  /// A Dockerfile [`WORKDIR` instruction][workdir].
  ///
  /// [workdir]: https://docs.docker.com/engine/reference/builder/#workdir
  WorkdirInstruction, Workdir, true
);

simple_instruction!(
  /// A Dockerfile [`STOPSIGNAL` instruction][stopsignal].
  ///
  /// [stopsignal]: https://docs.docker.com/engine/reference/builder/#stopsignal
  StopSignalInstruction, StopSignal, true
);

simple_instruction!(
  /// A deprecated Dockerfile [`MAINTAINER` instruction][maintainer]. The value
  /// is kept as written, quotes included.
  ///
  /// [maintainer]: https://docs.docker.com/engine/reference/builder/#maintainer-deprecated
  MaintainerInstruction, Maintainer, false
);
