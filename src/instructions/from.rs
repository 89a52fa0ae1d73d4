// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::image::ImageRef;
use crate::instructions::flag::{find_flag, Flag};
use crate::parser::*;
use crate::splicer::*;
use crate::util::SpannedString;
use crate::error::*;

/// A Dockerfile [`FROM` instruction][from].
///
/// Contains spans for the entire instruction, the image, and the alias (if
/// any). The image is kept as written; variable references such as
/// `alpine:$TAG` are resolved separately, see
/// [`ImageRef::resolve_vars`] and [`resolve_scopes`](crate::resolve_scopes).
///
/// [from]: https://docs.docker.com/engine/reference/builder/#from
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FromInstruction {
  pub span: Span,
  pub flags: Vec<Flag>,
  pub image: SpannedString,
  pub image_parsed: ImageRef,

  /// The index of the stage this instruction begins.
  pub index: usize,
  pub alias: Option<SpannedString>
}

impl FromInstruction {
  pub fn new<S: Into<String>>(image: S, alias: Option<S>) -> FromInstruction {
    let image = SpannedString::detached(image);

    FromInstruction {
      span: Span::default(),
      flags: Vec::new(),
      image_parsed: ImageRef::parse(&image.content),
      image,
      index: 0,
      alias: alias.map(SpannedString::detached)
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source, index: usize) -> Result<FromInstruction> {
    let span = source.span(&record);
    let mut flags = Vec::new();
    let mut image_field = None;
    let mut alias_field = None;

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::flag => flags.push(Flag::from_record(field, source)?),
        Rule::from_image => image_field = Some(source.spanned(&field)),
        Rule::from_as => continue,
        Rule::from_alias => alias_field = Some(source.spanned(&field)),
        _ => return Err(unexpected_token(field))
      };
    }

    let image = image_field.ok_or_else(|| missing("from image"))?;
    let image_parsed = ImageRef::parse(&image.content);

    Ok(FromInstruction {
      span, flags, index,
      image, image_parsed,
      alias: alias_field,
    })
  }

  /// Returns the `--platform` flag, if any.
  pub fn platform(&self) -> Option<&Flag> {
    find_flag(&self.flags, "platform")
  }

  /// Replaces the image, keeping `image_parsed` in sync.
  pub fn set_image<S: Into<String>>(&mut self, image: S) {
    self.image = SpannedString::new(self.image.span, image);
    self.image_parsed = ImageRef::parse(&self.image.content);
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a FromInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::From(f) = instruction {
      Ok(f)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "FromInstruction".into()
      })
    }
  }
}
