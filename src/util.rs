// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::fmt;

use crate::error::*;
use crate::parser::*;
use crate::splicer::Span;

/// A string with a character span.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SpannedString {
  pub span: Span,
  pub content: String
}

impl SpannedString {
  pub fn new<S: Into<String>>(span: Span, content: S) -> SpannedString {
    SpannedString { span, content: content.into() }
  }

  /// Creates a string that did not come from any source text, e.g. one built
  /// by a consumer editing the tree.
  pub fn detached<S: Into<String>>(content: S) -> SpannedString {
    SpannedString::new(Span::default(), content)
  }
}

impl AsRef<str> for SpannedString {
  fn as_ref(&self) -> &str {
    &self.content
  }
}

impl fmt::Display for SpannedString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.content.fmt(f)
  }
}

/// A component of a breakable string.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BreakableStringComponent {
  String(SpannedString),
  Comment(SpannedString)
}

impl From<SpannedString> for BreakableStringComponent {
  fn from(s: SpannedString) -> Self {
    BreakableStringComponent::String(s)
  }
}

/// A Docker string that may be broken across several lines, separated by line
/// continuations (`\\\n`), and possibly intermixed with comments.
///
/// These strings have several potentially valid interpretations. As these line
/// continuations match those natively supported by bash, a given multiline
/// `RUN` block can be pasted into a bash shell unaltered and with line
/// continuations included. However, at "runtime" line continuations and
/// comments (*) are stripped from the string handed to the shell.
///
/// To accommodate these differences, `BreakableString` keeps each line
/// continuation as its own component. `to_string()` gives the joined string
/// the shell would run, while the components keep enough structure to print
/// the continuations back out.
///
/// (*) Note that comments must occupy an entire line to be stripped.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BreakableString {
  pub span: Span,
  pub components: Vec<BreakableStringComponent>
}

impl BreakableString {
  pub fn new(span: impl Into<Span>) -> Self {
    BreakableString {
      span: span.into(),
      components: Vec::new()
    }
  }

  /// Creates a single-line string with no source span.
  pub fn text<S: Into<String>>(s: S) -> Self {
    BreakableString::new(Span::default())
      .add(BreakableStringComponent::String(SpannedString::detached(s)))
  }

  pub fn add(mut self, c: BreakableStringComponent) -> Self {
    self.components.push(c);

    self
  }

  pub fn add_string(mut self, span: impl Into<Span>, s: impl Into<String>) -> Self {
    self.components.push(
      BreakableStringComponent::String(SpannedString::new(span.into(), s))
    );

    self
  }

  pub fn add_comment(mut self, span: impl Into<Span>, s: impl Into<String>) -> Self {
    self.components.push(
      BreakableStringComponent::Comment(SpannedString::new(span.into(), s))
    );

    self
  }

  /// Splits raw instruction text starting at document offset `start` into
  /// its continuation lines.
  ///
  /// Each line after the first is either a comment, an empty line (dropped),
  /// or a continued string. A trailing escape character is removed from a
  /// string component, along with any whitespace after it.
  pub(crate) fn from_source(text: &str, start: usize, escape: char) -> Self {
    let mut s = BreakableString::new((start, start + text.len()));
    let mut offset = start;

    for (i, line) in text.split('\n').enumerate() {
      let line_start = offset;
      offset += line.len() + 1;

      let line = line.strip_suffix('\r').unwrap_or(line);
      if i > 0 {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
          continue;
        }

        if trimmed.starts_with('#') {
          let comment_start = line_start + (line.len() - trimmed.len());
          s = s.add_comment((comment_start, line_start + line.len()), trimmed);
          continue;
        }
      }

      let content = strip_continuation(line, escape).unwrap_or(line);
      s = s.add_string((line_start, line_start + content.len()), content);
    }

    s
  }

  /// Returns the string components, skipping comments.
  pub fn iter_components(&self) -> impl Iterator<Item = &SpannedString> {
    self.components.iter().filter_map(|c| match c {
      BreakableStringComponent::String(s) => Some(s),
      BreakableStringComponent::Comment(_) => None
    })
  }

  /// Returns true if this string spans more than one line.
  pub fn is_multiline(&self) -> bool {
    self.components.len() > 1
  }
}

impl fmt::Display for BreakableString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for s in self.iter_components() {
      write!(f, "{}", s.content)?;
    }

    Ok(())
  }
}

/// If `line` ends with the escape character (ignoring trailing spaces and
/// tabs), returns the line without it.
pub(crate) fn strip_continuation(line: &str, escape: char) -> Option<&str> {
  line
    .trim_end_matches(|c: char| c == ' ' || c == '\t' || c == '\r')
    .strip_suffix(escape)
}

/// An exec-form string array, e.g. `["echo", "hello"]`.
///
/// Element spans cover the quoted literal as written; the content is the
/// decoded JSON string.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StringArray {
  pub span: Span,
  pub elements: Vec<SpannedString>
}

impl StringArray {
  pub fn new<S: Into<String>>(elements: Vec<S>) -> StringArray {
    StringArray {
      span: Span::default(),
      elements: elements.into_iter().map(SpannedString::detached).collect()
    }
  }

  /// Returns the decoded values of each element.
  pub fn as_str_vec(&self) -> Vec<&str> {
    self.elements.iter().map(|e| e.as_ref()).collect()
  }

  /// Parses a `string_array` pair, decoding each element as a JSON string.
  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<StringArray> {
    let span = source.span(&record);
    let mut elements = Vec::new();

    for field in record.into_inner() {
      match field.as_rule() {
        Rule::string => {
          let content: String = serde_json::from_str(source.text(&field))
            .map_err(|e| Error::GenericParseError {
              message: format!("invalid JSON string: {}", e)
            })?;

          elements.push(SpannedString::new(source.span(&field), content));
        },
        _ => return Err(unexpected_token(field))
      }
    }

    Ok(StringArray { span, elements })
  }
}

/// A string that may be either an exec-form string array or a shell-form
/// string, as accepted by `RUN`, `CMD`, `ENTRYPOINT`, `SHELL` and
/// `HEALTHCHECK CMD`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ShellOrExecExpr {
  Shell(BreakableString),
  Exec(StringArray)
}

impl ShellOrExecExpr {
  /// Parses the command following an instruction's keyword and flags.
  ///
  /// A string array that is not valid JSON (e.g. one containing an unknown
  /// escape sequence) is kept as shell form, as Docker does.
  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<ShellOrExecExpr> {
    match record.as_rule() {
      Rule::exec_form => {
        let span = source.span(&record);
        let array = record.into_inner()
          .next()
          .ok_or_else(|| missing("string array"))?;

        match StringArray::from_record(array, source) {
          Ok(array) => Ok(ShellOrExecExpr::Exec(array)),
          Err(_) => Ok(ShellOrExecExpr::Shell(BreakableString::from_source(
            span.slice(source.content), span.start, source.escape
          )))
        }
      },
      Rule::shell_form => Ok(ShellOrExecExpr::Shell(source.breakable(&record))),
      _ => Err(unexpected_token(record))
    }
  }

  pub fn shell<S: Into<String>>(s: S) -> ShellOrExecExpr {
    ShellOrExecExpr::Shell(BreakableString::text(s))
  }

  pub fn exec<S: Into<String>>(args: Vec<S>) -> ShellOrExecExpr {
    ShellOrExecExpr::Exec(StringArray::new(args))
  }

  /// Unpacks this expression into its inner value if it is a Shell-form
  /// instruction, otherwise returns None.
  pub fn into_shell(self) -> Option<BreakableString> {
    if let ShellOrExecExpr::Shell(s) = self {
      Some(s)
    } else {
      None
    }
  }

  /// Unpacks this expression into its inner value if it is a Shell-form
  /// instruction, otherwise returns None.
  pub fn as_shell(&self) -> Option<&BreakableString> {
    if let ShellOrExecExpr::Shell(s) = self {
      Some(s)
    } else {
      None
    }
  }

  /// Unpacks this expression into its inner value if it is an Exec-form
  /// instruction, otherwise returns None.
  pub fn into_exec(self) -> Option<StringArray> {
    if let ShellOrExecExpr::Exec(s) = self {
      Some(s)
    } else {
      None
    }
  }

  /// Unpacks this expression into its inner value if it is an Exec-form
  /// instruction, otherwise returns None.
  pub fn as_exec(&self) -> Option<&StringArray> {
    if let ShellOrExecExpr::Exec(s) = self {
      Some(s)
    } else {
      None
    }
  }

  pub fn span(&self) -> Span {
    match self {
      ShellOrExecExpr::Shell(s) => s.span,
      ShellOrExecExpr::Exec(a) => a.span
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_breakable_from_source() {
    let text = "foo && \\\n    # implicitly escaped\n\n    bar";
    let s = BreakableString::from_source(text, 4, '\\');

    assert_eq!(
      s,
      BreakableString::new((4, 4 + text.len()))
        .add_string((4, 11), "foo && ")
        .add_comment((17, 37), "# implicitly escaped")
        .add_string((39, 46), "    bar")
    );
    assert_eq!(s.to_string(), "foo &&     bar");
    assert!(s.is_multiline());
  }

  #[test]
  fn test_breakable_backtick() {
    let s = BreakableString::from_source("dir C:\\ `\n  /w", 0, '`');
    assert_eq!(s.to_string(), "dir C:\\   /w");
  }

  #[test]
  fn test_strip_continuation() {
    assert_eq!(strip_continuation("foo \\  ", '\\'), Some("foo "));
    assert_eq!(strip_continuation("foo", '\\'), None);
    assert_eq!(strip_continuation("foo `", '`'), Some("foo "));
  }
}
