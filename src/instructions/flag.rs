// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;
use crate::util::SpannedString;

/// An option flag passed to an instruction, e.g. `--from=builder` or
/// `--mount=type=cache,target=/root/.cache`.
///
/// Flags are accepted by `FROM`, `RUN`, `COPY`, `ADD` and `HEALTHCHECK`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Flag {
  pub span: Span,
  pub name: SpannedString,

  /// The value with quotes removed, if any was given. A bare `--link` has no
  /// value; `--link=` has an empty one.
  pub value: Option<SpannedString>
}

impl Flag {
  pub fn new<S: Into<String>>(name: S, value: Option<S>) -> Flag {
    Flag {
      span: Span::default(),
      name: SpannedString::detached(name),
      value: value.map(SpannedString::detached)
    }
  }

  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<Flag> {
    let span = source.span(&record);
    let mut name = None;
    let mut value = None;

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::flag_name => name = Some(source.spanned(&field)),
        Rule::flag_value => value = Some(source.decoded(&field)),
        _ => return Err(unexpected_token(field))
      }
    }

    let name = name.ok_or_else(|| missing("flag name"))?;

    Ok(Flag { span, name, value })
  }

  /// Splits a multi-element value into its comma separated options, each an
  /// optional `key=value` pair.
  ///
  /// ```
  /// use dockerfile_ast::Flag;
  ///
  /// let flag = Flag::new("mount", Some("type=cache,target=/x,ro"));
  /// assert_eq!(flag.options(), vec![
  ///   ("type".to_string(), Some("cache".to_string())),
  ///   ("target".to_string(), Some("/x".to_string())),
  ///   ("ro".to_string(), None),
  /// ]);
  /// ```
  pub fn options(&self) -> Vec<(String, Option<String>)> {
    let value = match &self.value {
      Some(value) => value.as_ref(),
      None => return Vec::new()
    };

    value
      .split(',')
      .filter(|o| !o.is_empty())
      .map(|o| {
        let mut parts = o.splitn(2, '=');
        let key = parts.next().unwrap_or_default().to_string();
        let value = parts.next().map(String::from);

        (key, value)
      })
      .collect()
  }
}

/// Finds a flag by (case-sensitive) name.
pub(crate) fn find_flag<'a>(flags: &'a [Flag], name: &str) -> Option<&'a Flag> {
  flags.iter().find(|f| f.name.content == name)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn flag_options_empty() {
    assert!(Flag::new("link", None).options().is_empty());
    assert!(Flag::new("mount", Some("")).options().is_empty());
  }

  #[test]
  fn flag_find() {
    let flags = vec![Flag::new("from", Some("build")), Flag::new("link", None)];
    assert_eq!(find_flag(&flags, "link"), Some(&flags[1]));
    assert_eq!(find_flag(&flags, "chown"), None);
  }
}
