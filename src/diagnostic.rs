// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

use std::fmt;

use crate::splicer::Span;

/// The kind of a non-fatal structural problem found while building or
/// resolving a Dockerfile.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DiagnosticKind {
  /// Two stages share a name (names compare case-insensitively).
  DuplicateStageName,

  /// A `FROM` names a stage that is defined later, or itself.
  ForwardStageReference,

  /// A heredoc body ran to the end of the file without its terminator.
  UnterminatedHeredoc,

  /// A `[`-prefixed argument was not a valid JSON string array and was
  /// treated as shell form.
  InvalidJsonArray,

  /// A `# key=value` line at the top of the file names an unsupported
  /// directive.
  UnknownParserDirective,

  /// The same parser directive was given more than once.
  DuplicateParserDirective,

  /// A parser directive has an unusable value, e.g. `# escape=x`.
  InvalidParserDirective,

  /// A parser directive appears after the directive section has ended and is
  /// treated as a comment.
  DirectiveAfterContent,

  /// An ENV or LABEL instruction mixes `key=value` and `key value` styles.
  MixedKeyValueStyle,

  /// A variable reference could not be resolved.
  UndefinedVariable,

  /// The instruction keyword is not a known Dockerfile instruction.
  UnknownInstruction,

  /// The instruction arguments could not be parsed.
  InvalidInstruction,

  /// An instruction other than `ARG` appears before the first `FROM`.
  InstructionBeforeFrom,

  /// An empty line appears inside a line continuation.
  EmptyContinuationLine
}

impl fmt::Display for DiagnosticKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

/// A non-fatal problem attached to a build or resolution result.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Diagnostic {
  pub kind: DiagnosticKind,

  /// The location in the original text, if the problem has one.
  pub span: Option<Span>,

  pub message: String
}

impl Diagnostic {
  pub fn new<S: Into<String>>(
    kind: DiagnosticKind, span: Option<Span>, message: S
  ) -> Diagnostic {
    Diagnostic {
      kind,
      span,
      message: message.into()
    }
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.span {
      Some(span) => write!(
        f, "{} at {}..{}: {}", self.kind, span.start, span.end, self.message
      ),
      None => write!(f, "{}: {}", self.kind, self.message)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    let d = Diagnostic::new(
      DiagnosticKind::UndefinedVariable,
      Some(Span::new(4, 9)),
      "variable 'V' is not defined"
    );
    assert_eq!(
      d.to_string(),
      "UndefinedVariable at 4..9: variable 'V' is not defined"
    );

    let d = Diagnostic::new(DiagnosticKind::DuplicateParserDirective, None, "x");
    assert_eq!(d.to_string(), "DuplicateParserDirective: x");
  }
}
