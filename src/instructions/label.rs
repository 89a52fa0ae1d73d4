// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::convert::TryFrom;

use crate::dockerfile::Instruction;
use crate::instructions::pairs::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::error::*;

/// A Dockerfile [`LABEL` instruction][label].
///
/// A single `LABEL` instruction may set many labels.
///
/// [label]: https://docs.docker.com/engine/reference/builder/#label
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LabelInstruction {
  pub span: Span,
  pub style: KeyValueStyle,
  pub labels: Vec<KeyValuePair>
}

impl LabelInstruction {
  pub fn new(labels: Vec<KeyValuePair>) -> LabelInstruction {
    LabelInstruction {
      span: Span::default(),
      style: KeyValueStyle::Equals,
      labels
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<LabelInstruction> {
    let span = source.span(&record);
    let (style, labels) = parse_key_values(record, source)?;

    Ok(LabelInstruction { span, style, labels })
  }

  /// Returns the value of a label, if this instruction sets it.
  pub fn get(&self, key: &str) -> Option<&str> {
    find_value(&self.labels, key)
  }
}

impl<'a> TryFrom<&'a Instruction> for &'a LabelInstruction {
  type Error = Error;

  fn try_from(instruction: &'a Instruction) -> std::result::Result<Self, Self::Error> {
    if let Instruction::Label(l) = instruction {
      Ok(l)
    } else {
      Err(Error::ConversionError {
        from: format!("{:?}", instruction),
        to: "LabelInstruction".into()
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::test_util::*;
  use crate::util::SpannedString;

  fn labels(input: &str) -> Result<Vec<(String, String)>> {
    Ok(
      parse_single(input, Rule::label)?
        .into_label().unwrap()
        .labels.into_iter()
        .map(|l| (l.key.content, l.value.content))
        .collect()
    )
  }

  fn pairs(p: &[(&str, &str)]) -> Vec<(String, String)> {
    p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  #[test]
  fn label_basic() -> Result<()> {
    assert_eq!(labels("label foo=bar")?, pairs(&[("foo", "bar")]));
    assert_eq!(labels("label foo.bar=baz")?, pairs(&[("foo.bar", "baz")]));
    assert_eq!(
      labels(r#"label "foo.bar"="baz qux""#)?,
      pairs(&[("foo.bar", "baz qux")])
    );
    assert_eq!(labels(r#"LABEL "foo=bar"=bar"#)?, pairs(&[("foo=bar", "bar")]));

    Ok(())
  }

  #[test]
  fn label_spans() -> Result<()> {
    let label = parse_single(r#"LABEL a="b c""#, Rule::label)?
      .into_label().unwrap();

    assert_eq!(label, LabelInstruction {
      span: Span::new(0, 13),
      style: KeyValueStyle::Equals,
      labels: vec![KeyValuePair {
        span: Span::new(6, 13),
        key: SpannedString::new(Span::new(6, 7), "a"),
        value: SpannedString::new(Span::new(8, 13), "b c")
      }]
    });

    Ok(())
  }

  #[test]
  fn label_multi() -> Result<()> {
    assert_eq!(
      labels(r#"label foo=bar baz="qux" "quux quuz"="corge grault""#)?,
      pairs(&[("foo", "bar"), ("baz", "qux"), ("quux quuz", "corge grault")])
    );

    assert_eq!(
      labels(
        r#"label foo=bar \
          baz="qux" \
          "quux quuz"="corge grault""#
      )?,
      pairs(&[("foo", "bar"), ("baz", "qux"), ("quux quuz", "corge grault")])
    );

    Ok(())
  }

  #[test]
  fn label_escapes() -> Result<()> {
    // only a few characters may be escaped inside double quotes
    assert_eq!(
      labels(r#"label "foo.bar"="baz\n qux""#)?,
      pairs(&[("foo.bar", "baz\\n qux")])
    );

    assert_eq!(
      labels("label foo=\"bar\\\n          baz\"")?,
      pairs(&[("foo", "bar          baz")])
    );

    Ok(())
  }

  #[test]
  fn label_legacy() -> Result<()> {
    let label = parse_single("LABEL maintainer jane doe", Rule::label)?
      .into_label().unwrap();

    assert_eq!(label.style, KeyValueStyle::Legacy);
    assert_eq!(label.get("maintainer"), Some("jane doe"));

    Ok(())
  }
}
