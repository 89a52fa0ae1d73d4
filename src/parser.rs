// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::borrow::Cow;

use pest::Parser;
use snafu::ResultExt;

use crate::error::*;
use crate::splicer::Span;
use crate::util::{BreakableString, SpannedString};
use crate::word::decode_word;

/// The internal Pest parser.
#[derive(Parser)]
#[grammar = "dockerfile.pest"]
pub(crate) struct DockerfileParser;

/// A Pest Pair for Dockerfile rules.
pub(crate) type Pair<'a> = pest::iterators::Pair<'a, Rule>;

/// Returns the grammar rule for an instruction keyword, matched
/// case-insensitively. Unknown keywords have no rule and are parsed as
/// `Rule::misc`.
pub(crate) fn instruction_rule(keyword: &str) -> Option<Rule> {
  let rule = match keyword.to_ascii_lowercase().as_str() {
    "from" => Rule::from,
    "arg" => Rule::arg,
    "run" => Rule::run,
    "cmd" => Rule::cmd,
    "label" => Rule::label,
    "expose" => Rule::expose,
    "env" => Rule::env,
    "add" => Rule::add,
    "copy" => Rule::copy,
    "entrypoint" => Rule::entrypoint,
    "volume" => Rule::volume,
    "user" => Rule::user,
    "workdir" => Rule::workdir,
    "onbuild" => Rule::onbuild,
    "stopsignal" => Rule::stopsignal,
    "healthcheck" => Rule::healthcheck,
    "shell" => Rule::shell,
    "maintainer" => Rule::maintainer,
    _ => return None
  };

  Some(rule)
}

/// Returns the text the grammar should see for `content`.
///
/// The grammar only knows `\` as an escape character. For a backtick-escaped
/// file the two characters trade places; both are a single byte, so every
/// offset into the view is also an offset into the original.
pub(crate) fn grammar_view(content: &str, escape: char) -> Cow<'_, str> {
  if escape == '\\' {
    return Cow::Borrowed(content);
  }

  Cow::Owned(content.chars().map(|c| match c {
    '\\' => escape,
    c if c == escape => '\\',
    c => c
  }).collect())
}

/// Returns a view of `content` where only escaped line breaks use `\`.
///
/// In a backtick-escaped file a JSON string escape such as `\"` turns into a
/// backtick in the grammar view and no longer parses as an escape. Exec-form
/// arrays are read again against this view, which keeps every other
/// character as written.
pub(crate) fn continuation_view(content: &str, escape: char) -> Cow<'_, str> {
  if escape == '\\' {
    return Cow::Borrowed(content);
  }

  let chars: Vec<char> = content.chars().collect();
  let continues = |i: usize| {
    chars[i + 1..].iter()
      .find(|c| **c != ' ' && **c != '\t' && **c != '\r')
      .map_or(false, |c| *c == '\n')
  };

  Cow::Owned(chars.iter().enumerate().map(|(i, &c)| match c {
    c if c == escape && continues(i) => '\\',
    c => c
  }).collect())
}

/// Maps pairs parsed from a slice of the grammar view back onto the original
/// Dockerfile text.
///
/// Pairs only ever provide positions; all content is read from `content` so
/// that a swapped view never leaks into the tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Source<'a> {
  pub content: &'a str,
  view: &'a str,
  offset: usize,
  pub escape: char
}

impl<'a> Source<'a> {
  pub fn new(content: &'a str, view: &'a str, escape: char) -> Source<'a> {
    Source { content, view, offset: 0, escape }
  }

  /// Parses the given span of the document with a single grammar rule,
  /// returning the top-level pair along with a `Source` positioned at the
  /// start of the span.
  pub fn parse(&self, rule: Rule, span: Span) -> Result<(Pair<'a>, Source<'a>)> {
    let input = self.view.get(span.start..span.end)
      .ok_or(Error::UnknownParseError)?;

    let pair = DockerfileParser::parse(rule, input)
      .context(ParseError)?
      .next()
      .ok_or(Error::UnknownParseError)?;

    let source = Source { offset: span.start, ..*self };
    Ok((pair, source))
  }

  /// Returns the document span of a pair.
  pub fn span(&self, pair: &Pair) -> Span {
    let pest_span = pair.as_span();

    Span {
      start: self.offset + pest_span.start(),
      end: self.offset + pest_span.end()
    }
  }

  /// Returns the original text of a pair.
  pub fn text(&self, pair: &Pair) -> &'a str {
    self.span(pair).slice(self.content)
  }

  /// Returns a pair's original text, unaltered.
  pub fn spanned(&self, pair: &Pair) -> SpannedString {
    SpannedString {
      span: self.span(pair),
      content: self.text(pair).to_string()
    }
  }

  /// Returns a pair's text after Dockerfile word processing: quotes removed,
  /// escapes applied and escaped line breaks joined.
  pub fn decoded(&self, pair: &Pair) -> SpannedString {
    SpannedString {
      span: self.span(pair),
      content: decode_word(self.text(pair), self.escape)
    }
  }

  /// Returns a pair's text split into its continuation lines.
  pub fn breakable(&self, pair: &Pair) -> BreakableString {
    BreakableString::from_source(self.text(pair), self.span(pair).start, self.escape)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_grammar_view() {
    assert_eq!(grammar_view(r"a\b`c", '\\'), r"a\b`c");
    assert_eq!(grammar_view(r"a\b`c", '`'), r"a`b\c");
  }

  #[test]
  fn test_continuation_view() {
    assert_eq!(continuation_view("a `\nb", '\\'), "a `\nb");
    assert_eq!(continuation_view("[\"a\\\"b\", `\n  \"c`d\"] ` \r\n", '`'), "[\"a\\\"b\", \\\n  \"c`d\"] \\ \r\n");
  }

  #[test]
  fn test_instruction_rule() {
    assert_eq!(instruction_rule("FROM"), Some(Rule::from));
    assert_eq!(instruction_rule("HealthCheck"), Some(Rule::healthcheck));
    assert_eq!(instruction_rule("frob"), None);
  }

  #[test]
  fn test_source_offsets() -> Result<()> {
    let content = "FROM alpine\nRUN echo hi";
    let source = Source::new(content, content, '\\');
    let (pair, source) = source.parse(Rule::run, Span::new(12, 23))?;
    assert_eq!(source.span(&pair), Span::new(12, 23));
    assert_eq!(source.text(&pair), "RUN echo hi");

    Ok(())
  }
}
