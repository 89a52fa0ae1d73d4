// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

use crate::source::RawHeredoc;
use crate::splicer::Span;
use crate::util::SpannedString;

/// An inline document introduced by `<<DELIM` (or `<<-DELIM`) in a `RUN`,
/// `COPY` or `ADD` instruction.
///
/// ```text
/// RUN <<-EOF
///   echo hello
/// EOF
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Heredoc {
  /// The span of the `<<[-]DELIM` marker within the instruction.
  pub span: Span,

  /// The delimiter, without quotes.
  pub delimiter: String,

  /// True for `<<-`, which strips leading tabs from each body line.
  pub strip_tabs: bool,

  /// False if the delimiter was quoted, which disables variable expansion
  /// in the body.
  pub expand: bool,

  /// The body exactly as written, including the line break before the
  /// terminator.
  pub body: SpannedString,

  /// The span of the terminating line, or None if the body ran to the end of
  /// the file.
  pub terminator: Option<Span>
}

impl Heredoc {
  pub fn new<S1, S2>(delimiter: S1, body: S2) -> Heredoc
  where
    S1: Into<String>,
    S2: Into<String>,
  {
    Heredoc {
      span: Span::default(),
      delimiter: delimiter.into(),
      strip_tabs: false,
      expand: true,
      body: SpannedString::detached(body),
      terminator: None
    }
  }

  pub(crate) fn from_raw(raw: &RawHeredoc, content: &str) -> Heredoc {
    Heredoc {
      span: raw.marker,
      delimiter: raw.delimiter.clone(),
      strip_tabs: raw.strip_tabs,
      expand: raw.expand,
      body: SpannedString::new(raw.body, raw.body.slice(content)),
      terminator: raw.terminator
    }
  }

  /// Returns the body as the builder would see it, with leading tabs removed
  /// from each line if this is a `<<-` heredoc.
  pub fn content(&self) -> String {
    if !self.strip_tabs {
      return self.body.content.clone();
    }

    self.body.content
      .split_inclusive('\n')
      .map(|line| line.trim_start_matches('\t'))
      .collect()
  }

  /// Returns the marker as it would be written, e.g. `<<-"EOF"`.
  pub fn marker(&self) -> String {
    let dash = if self.strip_tabs { "-" } else { "" };

    if self.expand {
      format!("<<{}{}", dash, self.delimiter)
    } else {
      format!("<<{}\"{}\"", dash, self.delimiter)
    }
  }
}
