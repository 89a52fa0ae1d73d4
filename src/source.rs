// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

//! Splits Dockerfile text into parser directives, logical instructions and
//! heredoc bodies.
//!
//! Blank lines and comments between these are not recorded here; the builder
//! recovers them as trivia from the gaps between spans.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::splicer::Span;
use crate::util::{strip_continuation, SpannedString};

lazy_static! {
  static ref DIRECTIVE: Regex = Regex::new(
    r"^[ \t]*#[ \t]*([A-Za-z][A-Za-z0-9_]*)[ \t]*=[ \t]*(.*?)[ \t]*$"
  ).unwrap();

  static ref HEREDOC: Regex = Regex::new(
    r#"^<<(-)?(?:"([^"]+)"|'([^']+)'|([A-Za-z0-9_][A-Za-z0-9_.\-]*))"#
  ).unwrap();
}

/// Directive names this library understands.
const KNOWN_DIRECTIVES: &[&str] = &["syntax", "escape"];

/// Instructions that may carry heredocs.
const HEREDOC_INSTRUCTIONS: &[&str] = &["run", "copy", "add"];

/// A physical line, excluding its line break.
#[derive(Debug, Clone, Copy)]
struct Line {
  start: usize,
  end: usize
}

impl Line {
  fn text<'a>(&self, content: &'a str) -> &'a str {
    &content[self.start..self.end]
  }

  fn span(&self) -> Span {
    Span::new(self.start, self.end)
  }
}

fn split_lines(content: &str) -> Vec<Line> {
  let bytes = content.as_bytes();
  let mut lines = Vec::new();
  let mut start = 0;

  let line = |start: usize, end: usize| {
    if end > start && bytes[end - 1] == b'\r' {
      Line { start, end: end - 1 }
    } else {
      Line { start, end }
    }
  };

  for (i, b) in bytes.iter().enumerate() {
    if *b == b'\n' {
      lines.push(line(start, i));
      start = i + 1;
    }
  }

  if start < content.len() {
    lines.push(line(start, content.len()));
  }

  lines
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawDirective {
  pub span: Span,
  pub name: SpannedString,
  pub value: SpannedString
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawHeredoc {
  /// The `<<[-]DELIM` word within the instruction.
  pub marker: Span,
  pub delimiter: String,
  pub strip_tabs: bool,
  pub expand: bool,

  /// All body lines, including the line break of the last one.
  pub body: Span,

  /// The terminating line, if one was found.
  pub terminator: Option<Span>
}

impl RawHeredoc {
  fn end(&self) -> usize {
    self.terminator.map(|t| t.end).unwrap_or(self.body.end)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawInstruction {
  /// The keyword as written.
  pub keyword: SpannedString,

  /// The logical instruction: the keyword line and any continued lines, up to
  /// the last non-whitespace character. Heredoc bodies are not included.
  pub span: Span,

  pub heredocs: Vec<RawHeredoc>
}

impl RawInstruction {
  /// The end of the instruction including any heredoc bodies.
  pub fn end(&self) -> usize {
    self.heredocs.last().map(RawHeredoc::end).unwrap_or(self.span.end)
  }
}

/// The line-level structure of a Dockerfile.
#[derive(Debug)]
pub(crate) struct SourceText {
  pub escape: char,
  pub directives: Vec<RawDirective>,
  pub instructions: Vec<RawInstruction>,
  pub diagnostics: Vec<Diagnostic>
}

fn is_blank(text: &str) -> bool {
  text.trim().is_empty()
}

fn is_comment(text: &str) -> bool {
  text.trim_start().starts_with('#')
}

struct Reader<'a> {
  content: &'a str,
  lines: Vec<Line>,
  escape: char,
  directives: Vec<RawDirective>,
  instructions: Vec<RawInstruction>,
  diagnostics: Vec<Diagnostic>
}

impl<'a> Reader<'a> {
  fn diagnostic<S: Into<String>>(&mut self, kind: DiagnosticKind, span: Span, message: S) {
    self.diagnostics.push(Diagnostic::new(kind, Some(span), message));
  }

  fn text(&self, index: usize) -> &'a str {
    self.lines[index].text(self.content)
  }

  /// Reads the directive section at the top of the file, returning the index
  /// of the first line after it.
  fn read_directives(&mut self) -> usize {
    let mut i = 0;

    while i < self.lines.len() {
      let line = self.lines[i];
      let caps = match DIRECTIVE.captures(line.text(self.content)) {
        Some(caps) => caps,
        None => break
      };

      let (name_match, value_match) = match (caps.get(1), caps.get(2)) {
        (Some(n), Some(v)) => (n, v),
        _ => break
      };

      let name = SpannedString::new(
        Span::new(line.start + name_match.start(), line.start + name_match.end()),
        name_match.as_str()
      );
      let value = SpannedString::new(
        Span::new(line.start + value_match.start(), line.start + value_match.end()),
        value_match.as_str()
      );

      let lower = name.content.to_ascii_lowercase();
      if !KNOWN_DIRECTIVES.contains(&lower.as_str()) {
        // unknown directives are comments and end the directive section
        self.diagnostic(
          DiagnosticKind::UnknownParserDirective,
          line.span(),
          format!("unknown parser directive '{}' is treated as a comment", name)
        );
        i += 1;
        break;
      }

      let duplicate = self.directives.iter()
        .any(|d| d.name.content.eq_ignore_ascii_case(&lower));

      if duplicate {
        self.diagnostic(
          DiagnosticKind::DuplicateParserDirective,
          line.span(),
          format!("parser directive '{}' may only be given once", lower)
        );
      } else if lower == "escape" {
        match value.content.as_str() {
          "\\" => self.escape = '\\',
          "`" => self.escape = '`',
          other => self.diagnostic(
            DiagnosticKind::InvalidParserDirective,
            line.span(),
            format!("invalid escape character '{}', expected '\\' or '`'", other)
          )
        }
      }

      self.directives.push(RawDirective { span: line.span(), name, value });
      i += 1;
    }

    i
  }

  /// Reads a logical instruction starting at line `i`, returning the index of
  /// the first line after it.
  fn read_instruction(&mut self, i: usize) -> usize {
    let line = self.lines[i];
    let text = line.text(self.content);
    let indent = text.len() - text.trim_start().len();
    let escape = self.escape;

    let keyword_len = text[indent..]
      .find(|c: char| c.is_whitespace() || c == escape)
      .unwrap_or(text.len() - indent);

    let keyword_start = line.start + indent;
    let keyword = SpannedString::new(
      Span::new(keyword_start, keyword_start + keyword_len),
      &text[indent..indent + keyword_len]
    );

    // follow continuations, skipping comment and blank lines in between
    let mut last = i;
    while strip_continuation(self.text(last), escape).is_some() {
      let mut next = last + 1;
      while next < self.lines.len() {
        let text = self.text(next);
        if is_blank(text) {
          self.diagnostic(
            DiagnosticKind::EmptyContinuationLine,
            self.lines[next].span(),
            "empty continuation lines are deprecated"
          );
        } else if !is_comment(text) {
          break;
        }

        next += 1;
      }

      if next >= self.lines.len() {
        break;
      }

      last = next;
    }

    let last_text = self.text(last);
    let end = self.lines[last].start + last_text.trim_end().len();
    let span = Span::new(keyword_start, end.max(keyword.span.end));

    trace!(keyword = %keyword, start = span.start, end = span.end, "read instruction");

    let mut next = last + 1;
    let mut heredocs = Vec::new();

    let lower = keyword.content.to_ascii_lowercase();
    if HEREDOC_INSTRUCTIONS.contains(&lower.as_str()) {
      let arguments = Span::new(keyword.span.end, span.end);
      for marker in find_heredoc_markers(self.content, arguments, escape) {
        let (heredoc, after) = self.read_heredoc(marker, next);
        next = after;
        heredocs.push(heredoc);
      }
    }

    self.instructions.push(RawInstruction { keyword, span, heredocs });

    next
  }

  /// Reads a heredoc body starting at line `i` up to and including its
  /// terminator.
  fn read_heredoc(&mut self, marker: HeredocMarker, i: usize) -> (RawHeredoc, usize) {
    let body_start = self.lines.get(i)
      .map(|l| l.start)
      .unwrap_or_else(|| self.content.len());

    let mut j = i;
    while j < self.lines.len() {
      let text = self.text(j);
      let candidate = if marker.strip_tabs {
        text.trim_start_matches('\t')
      } else {
        text
      };

      if candidate == marker.delimiter {
        let heredoc = RawHeredoc {
          marker: marker.span,
          delimiter: marker.delimiter,
          strip_tabs: marker.strip_tabs,
          expand: marker.expand,
          body: Span::new(body_start, self.lines[j].start),
          terminator: Some(self.lines[j].span())
        };

        return (heredoc, j + 1);
      }

      j += 1;
    }

    self.diagnostic(
      DiagnosticKind::UnterminatedHeredoc,
      marker.span,
      format!("heredoc '{}' is never terminated", marker.delimiter)
    );

    let heredoc = RawHeredoc {
      marker: marker.span,
      delimiter: marker.delimiter,
      strip_tabs: marker.strip_tabs,
      expand: marker.expand,
      body: Span::new(body_start, self.content.len()),
      terminator: None
    };

    (heredoc, self.lines.len())
  }

  fn read(mut self) -> SourceText {
    let mut i = self.read_directives();

    while i < self.lines.len() {
      let line = self.lines[i];
      let text = line.text(self.content);

      if is_blank(text) {
        i += 1;
        continue;
      }

      if is_comment(text) {
        let known = DIRECTIVE.captures(text)
          .and_then(|caps| caps.get(1))
          .map(|name| KNOWN_DIRECTIVES.contains(&name.as_str().to_ascii_lowercase().as_str()))
          .unwrap_or(false);

        if known {
          self.diagnostic(
            DiagnosticKind::DirectiveAfterContent,
            line.span(),
            "parser directives must appear at the top of the file; treated as a comment"
          );
        }

        i += 1;
        continue;
      }

      i = self.read_instruction(i);
    }

    SourceText {
      escape: self.escape,
      directives: self.directives,
      instructions: self.instructions,
      diagnostics: self.diagnostics
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeredocMarker {
  span: Span,
  delimiter: String,
  strip_tabs: bool,
  expand: bool
}

/// Splits text into words on unquoted whitespace, returning each word with
/// its offset.
fn split_words(text: &str, escape: char) -> Vec<(usize, &str)> {
  let mut words = Vec::new();
  let mut start: Option<usize> = None;
  let mut quote: Option<char> = None;
  let mut chars = text.char_indices().peekable();

  while let Some((i, c)) = chars.next() {
    if quote.is_none() && c.is_whitespace() {
      if let Some(s) = start.take() {
        words.push((s, &text[s..i]));
      }
      continue;
    }

    if start.is_none() {
      start = Some(i);
    }

    match (quote, c) {
      (Some('\''), '\'') => quote = None,
      (Some('\''), _) => (),
      (_, c) if c == escape => {
        chars.next();
      },
      (None, '"') | (None, '\'') => quote = Some(c),
      (Some('"'), '"') => quote = None,
      _ => ()
    }
  }

  if let Some(s) = start {
    words.push((s, &text[s..]));
  }

  words
}

fn find_heredoc_markers(content: &str, arguments: Span, escape: char) -> Vec<HeredocMarker> {
  let text = arguments.slice(content);
  if text.trim_start().starts_with('[') {
    return Vec::new();
  }

  split_words(text, escape)
    .into_iter()
    .filter(|(_, word)| word.starts_with("<<") && !word.starts_with("<<<"))
    .filter_map(|(offset, word)| {
      let caps = HEREDOC.captures(word)?;
      let whole = caps.get(0)?;
      let (delimiter, expand) = match (caps.get(2), caps.get(3), caps.get(4)) {
        (Some(d), _, _) | (_, Some(d), _) => (d.as_str(), false),
        (_, _, Some(d)) => (d.as_str(), true),
        _ => return None
      };

      let start = arguments.start + offset;
      Some(HeredocMarker {
        span: Span::new(start, start + whole.end()),
        delimiter: delimiter.to_string(),
        strip_tabs: caps.get(1).is_some(),
        expand
      })
    })
    .collect()
}

/// Reads the line structure of a Dockerfile.
pub(crate) fn read_source(content: &str) -> SourceText {
  let reader = Reader {
    content,
    lines: split_lines(content),
    escape: '\\',
    directives: Vec::new(),
    instructions: Vec::new(),
    diagnostics: Vec::new()
  };

  reader.read()
}
