// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::SpannedString;

/// How the pairs of an `ENV` or `LABEL` instruction were written.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum KeyValueStyle {
  /// A single `key value` pair; the value is the rest of the instruction.
  Legacy,

  /// One or more `key=value` pairs.
  Equals
}

/// A key/value pair set by an `ENV` or `LABEL` instruction.
///
/// Keys and values have their quotes removed; spans point at the text as
/// written.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct KeyValuePair {
  pub span: Span,
  pub key: SpannedString,
  pub value: SpannedString
}

impl KeyValuePair {
  pub fn new<S1, S2>(key: S1, value: S2) -> KeyValuePair
  where
    S1: Into<String>,
    S2: Into<String>,
  {
    KeyValuePair {
      span: Span::default(),
      key: SpannedString::detached(key),
      value: SpannedString::detached(value)
    }
  }

  fn from_pair_record(record: Pair, source: &Source) -> Result<KeyValuePair> {
    let span = source.span(&record);
    let mut key = None;
    let mut value = None;

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::kv_key => key = Some(source.decoded(&field)),
        Rule::kv_value => value = Some(source.decoded(&field)),
        _ => return Err(unexpected_token(field))
      }
    }

    let key = key.ok_or_else(|| missing("key"))?;

    // `key=` sets an empty value
    let value = value.unwrap_or_else(|| {
      SpannedString::new(Span::new(span.end, span.end), "")
    });

    Ok(KeyValuePair { span, key, value })
  }

  fn from_single_record(record: Pair, source: &Source) -> Result<KeyValuePair> {
    let span = source.span(&record);
    let mut key = None;
    let mut value = None;

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::kv_single_key => key = Some(source.decoded(&field)),
        Rule::kv_single_value => {
          // the value may continue over several lines
          let joined = source.breakable(&field).to_string();
          value = Some(SpannedString::new(
            source.span(&field),
            crate::word::decode_word(joined.trim_end(), source.escape)
          ));
        },
        _ => return Err(unexpected_token(field))
      }
    }

    let key = key.ok_or_else(|| missing("key"))?;
    let value = value.ok_or_else(|| missing("value"))?;

    Ok(KeyValuePair { span, key, value })
  }
}

/// Parses the pairs of an `ENV` or `LABEL` record.
pub(crate) fn parse_key_values(
  record: Pair, source: &Source
) -> Result<(KeyValueStyle, Vec<KeyValuePair>)> {
  let mut style = KeyValueStyle::Equals;
  let mut pairs = Vec::new();

  for field in record.into_inner() {
    match field.as_rule() {
      Rule::kv_pairs => {
        for pair in field.into_inner() {
          match pair.as_rule() {
            Rule::kv_pair => pairs.push(KeyValuePair::from_pair_record(pair, source)?),
            _ => return Err(unexpected_token(pair))
          }
        }
      },
      Rule::kv_single => {
        style = KeyValueStyle::Legacy;
        pairs.push(KeyValuePair::from_single_record(field, source)?);
      },
      _ => return Err(unexpected_token(field))
    }
  }

  Ok((style, pairs))
}

/// Finds the value of a key, honoring later pairs over earlier ones.
pub(crate) fn find_value<'a>(pairs: &'a [KeyValuePair], key: &str) -> Option<&'a str> {
  pairs.iter()
    .rev()
    .find(|p| p.key.content == key)
    .map(|p| p.value.as_ref())
}
