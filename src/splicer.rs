// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::convert::TryInto;

use tracing::warn;

use crate::dockerfile::Dockerfile;

/// An offset used to adjust proceeding Spans after content has been spliced
#[derive(Debug)]
struct SpliceOffset {
  /// The replaced span, relative to the original document.
  replaced: Span,
  position: usize,
  offset: isize
}

/// A byte-index tuple representing a span of characters in a string
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct Span {
  pub start: usize,
  pub end: usize
}

impl Span {
  pub fn new(start: usize, end: usize) -> Span {
    Span { start, end }
  }

  /// Returns the number of bytes covered by this span.
  pub fn len(&self) -> usize {
    self.end.saturating_sub(self.start)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns the smallest span covering both `self` and `other`.
  pub fn join(&self, other: &Span) -> Span {
    Span {
      start: self.start.min(other.start),
      end: self.end.max(other.end)
    }
  }

  /// Returns true if the spans share at least one byte.
  pub fn overlaps(&self, other: &Span) -> bool {
    self.start < other.end && other.start < self.end
  }

  /// Returns true if `other` lies entirely within this span.
  pub fn contains(&self, other: &Span) -> bool {
    other.start >= self.start && other.end <= self.end
  }

  /// Returns the text this span covers in `content`, or an empty string if the
  /// span does not fit.
  pub fn slice<'a>(&self, content: &'a str) -> &'a str {
    content.get(self.start..self.end).unwrap_or("")
  }

  fn adjust_offsets(&self, offsets: &[SpliceOffset]) -> Span {
    let mut start = self.start as isize;
    let mut end = self.end as isize;

    for splice in offsets {
      if splice.position < start as usize {
        start += splice.offset;
        end += splice.offset;
      } else if splice.position < end as usize {
        end += splice.offset;
      }
    }

    Span {
      start: start.try_into().ok().unwrap_or(0),
      end: end.try_into().ok().unwrap_or(0)
    }
  }
}

impl From<(usize, usize)> for Span {
  fn from(tup: (usize, usize)) -> Span {
    Span::new(tup.0, tup.1)
  }
}

/// A utility to repeatedly replace spans of text within a larger document.
///
/// Each subsequent call to `Splicer::splice(...)` rewrites the `content` buffer
/// and appends to the list of internal offsets. `Splicer::splice(...)` then
/// adjusts span bounds at call-time to ensures repeated calls to `splice(...)`
/// continue to work even if one or both of the span bounds have shifted.
///
/// This is a text-level alternative to editing nodes and re-printing: it never
/// re-renders anything outside of the replaced spans.
///
/// # Example
/// ```
/// use dockerfile_ast::*;
///
/// let dockerfile = Dockerfile::parse(r#"
///   FROM alpine:3.10
/// "#);
///
/// let from = dockerfile.stages[0].from().unwrap();
///
/// let mut splicer = dockerfile.splicer();
/// splicer.splice(&from.image.span, "alpine:3.11");
///
/// assert_eq!(splicer.content, r#"
///   FROM alpine:3.11
/// "#);
/// ```
pub struct Splicer {
  /// The current content of the splice buffer.
  pub content: String,

  splice_offsets: Vec<SpliceOffset>
}

impl Splicer {
  /// Creates a new Splicer from the given Dockerfile.
  pub(crate) fn from(dockerfile: &Dockerfile) -> Splicer {
    Splicer::from_str(&dockerfile.content)
  }

  /// Creates a new Splicer over an arbitrary string.
  pub(crate) fn from_str(s: &str) -> Splicer {
    Splicer {
      content: s.to_string(),
      splice_offsets: Vec::new()
    }
  }

  /// Replaces a Span with the given replacement string, mutating the `content`
  /// string.
  ///
  /// Sections may be deleted by replacing them with an empty string (`""`).
  ///
  /// Note that spans are always relative to the *original input document*.
  /// Span offsets are recalculated at call-time to account for previous calls
  /// to `splice(...)` that may have shifted one or both of the span bounds, so
  /// splices may be made in any order.
  ///
  /// Returns false and leaves the content alone if the span overlaps an
  /// earlier splice or does not fit the document.
  pub fn splice(&mut self, span: &Span, replacement: &str) -> bool {
    if let Some(earlier) = self.splice_offsets.iter().find(|s| s.replaced.overlaps(span)) {
      warn!("splice at {:?} overlaps an earlier splice at {:?}", span, earlier.replaced);
      return false;
    }

    let adjusted = span.adjust_offsets(&self.splice_offsets);
    if self.content.get(adjusted.start..adjusted.end).is_none() {
      warn!("splice at {:?} does not fit the document", span);
      return false;
    }

    // determine the splice offset (only used on subsequent splices)
    let offset = replacement.len() as isize - adjusted.len() as isize;
    self.splice_offsets.push(SpliceOffset { replaced: *span, position: adjusted.start, offset });

    self.content.replace_range(adjusted.start..adjusted.end, replacement);
    true
  }
}
