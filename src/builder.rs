// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

//! Assembles a [`Dockerfile`] tree from source text.
//!
//! The source reader splits the text into directives and logical
//! instructions; each instruction is then parsed on its own so that one
//! malformed line never takes the rest of the file down with it.

use tracing::{debug, trace};

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::dockerfile::{Dockerfile, Instruction, Node, ParserDirective};
use crate::instructions::*;
use crate::parser::*;
use crate::source::{read_source, RawInstruction};
use crate::splicer::Span;
use crate::stage::{Stage, StageParent, Stages};
use crate::util::{ShellOrExecExpr, SpannedString};

/// Returns true if an instruction's arguments looked like a JSON array but
/// were read as shell text or plain paths.
fn json_fallback(instruction: &Instruction) -> bool {
  let shell_array = |expr: &ShellOrExecExpr| match expr {
    ShellOrExecExpr::Shell(shell) => shell.to_string().trim_start().starts_with('['),
    ShellOrExecExpr::Exec(_) => false
  };

  let path_array = |json: bool, sources: &[SpannedString]| {
    !json && sources.first().map_or(false, |p| p.content.starts_with('['))
  };

  match instruction {
    Instruction::Run(r) => shell_array(&r.expr),
    Instruction::Cmd(c) => shell_array(&c.expr),
    Instruction::Entrypoint(e) => shell_array(&e.expr),
    Instruction::Shell(s) => shell_array(&s.expr),
    Instruction::Healthcheck(h) => h.cmd.as_ref().map_or(false, |c| shell_array(&c.expr)),
    Instruction::Volume(v) => path_array(v.json, &v.paths),
    Instruction::Copy(c) => path_array(c.json, &c.sources),
    Instruction::Add(a) => path_array(a.json, &a.sources),
    Instruction::Onbuild(o) => json_fallback(&o.trigger),
    _ => false
  }
}

struct Builder<'a> {
  content: &'a str,
  directives: Vec<ParserDirective>,
  preamble: Vec<Node>,
  stages: Stages,
  diagnostics: Vec<Diagnostic>,

  /// The end of the last node consumed.
  cursor: usize
}

impl<'a> Builder<'a> {
  fn diagnostic<S: Into<String>>(&mut self, kind: DiagnosticKind, span: Span, message: S) {
    self.diagnostics.push(Diagnostic::new(kind, Some(span), message));
  }

  fn trivia(&mut self, start: usize, end: usize) -> Span {
    let trivia = Span::new(self.cursor, start);
    self.cursor = end;
    trivia
  }

  /// Parses one instruction. `exec` is a second view of the text to read
  /// exec-form arrays from when the grammar view cannot.
  fn parse_instruction(&mut self, raw: &RawInstruction, source: &Source, exec: Option<&Source>) -> Instruction {
    let keyword = raw.keyword.content.to_ascii_uppercase();
    let rule = match instruction_rule(&keyword) {
      Some(rule) => rule,
      None => {
        self.diagnostic(
          DiagnosticKind::UnknownInstruction,
          raw.keyword.span,
          format!("unknown instruction '{}'", raw.keyword.content)
        );

        Rule::misc
      }
    };

    let parse = |source: &Source| source.parse(rule, raw.span)
      .and_then(|(pair, source)| Instruction::from_record(pair, &source));

    let mut parsed = parse(source);
    let retry = match (&parsed, exec) {
      (Ok(instruction), Some(exec)) if json_fallback(instruction) => Some(exec),
      _ => None
    };

    if let Some(exec) = retry {
      match parse(exec) {
        Ok(retried) if !json_fallback(&retried) => {
          trace!("read {} exec form at {:?} from continuation view", keyword, raw.span);
          parsed = Ok(retried);
        },
        _ => ()
      }
    }

    match parsed {
      Ok(instruction) => instruction,
      Err(e) => {
        debug!("invalid {} instruction at {:?}: {}", keyword, raw.span, e);
        self.diagnostic(
          DiagnosticKind::InvalidInstruction,
          raw.span,
          format!("invalid {} instruction: {}", keyword, e)
        );

        MiscInstruction::from_text(raw.keyword.clone(), raw.span, source).into()
      }
    }
  }

  fn check_expr(&mut self, keyword: &str, expr: &ShellOrExecExpr, span: Span) {
    if let ShellOrExecExpr::Shell(shell) = expr {
      if shell.to_string().trim_start().starts_with('[') {
        self.diagnostic(
          DiagnosticKind::InvalidJsonArray,
          span,
          format!("{} arguments are not a valid JSON array, using shell form", keyword)
        );
      }
    }
  }

  fn check_paths(&mut self, keyword: &str, json: bool, first: Option<&str>, span: Span) {
    if !json && first.map(|p| p.starts_with('[')).unwrap_or(false) {
      self.diagnostic(
        DiagnosticKind::InvalidJsonArray,
        span,
        format!("{} arguments are not a valid JSON array, using plain paths", keyword)
      );
    }
  }

  fn check_style(&mut self, keyword: &str, style: KeyValueStyle, pairs: &[KeyValuePair], span: Span) {
    let mixed = style == KeyValueStyle::Legacy
      && pairs.iter().any(|p| p.key.content.contains('='));

    if mixed {
      self.diagnostic(
        DiagnosticKind::MixedKeyValueStyle,
        span,
        format!("{} mixes key=value and key value forms", keyword)
      );
    }
  }

  /// Reports problems in an instruction that parsed successfully.
  fn validate(&mut self, instruction: &Instruction) {
    let span = instruction.span();

    match instruction {
      Instruction::Env(e) => self.check_style("ENV", e.style, &e.vars, span),
      Instruction::Label(l) => self.check_style("LABEL", l.style, &l.labels, span),
      Instruction::Run(r) => self.check_expr("RUN", &r.expr, span),
      Instruction::Cmd(c) => self.check_expr("CMD", &c.expr, span),
      Instruction::Entrypoint(e) => self.check_expr("ENTRYPOINT", &e.expr, span),
      Instruction::Shell(s) => self.check_expr("SHELL", &s.expr, span),
      Instruction::Healthcheck(h) => {
        if let Some(cmd) = &h.cmd {
          self.check_expr("HEALTHCHECK", &cmd.expr, span);
        }
      },
      Instruction::Volume(v) => {
        let first = v.paths.first().map(|p| p.content.as_str());
        self.check_paths("VOLUME", v.json, first, span);
      },
      Instruction::Copy(c) => {
        let first = c.sources.first().map(|p| p.content.as_str());
        self.check_paths("COPY", c.json, first, span);
      },
      Instruction::Add(a) => {
        let first = a.sources.first().map(|p| p.content.as_str());
        self.check_paths("ADD", a.json, first, span);
      },
      Instruction::Onbuild(o) => self.validate(&o.trigger),
      _ => ()
    }
  }

  fn start_stage(&mut self, node: Node) {
    let index = self.stages.len();

    let (parent, name) = match node.instruction().as_from() {
      Some(from) => {
        let image_name = from.image.content.to_ascii_lowercase();

        let parent = if image_name == "scratch" {
          StageParent::Scratch
        } else if let Some(stage) = self.stages.get_by_name(&image_name) {
          StageParent::Stage(stage.index)
        } else {
          match image_name.parse::<usize>() {
            Ok(n) if n < index => StageParent::Stage(n),
            _ => StageParent::Image(from.image_parsed.clone())
          }
        };

        let name = from.alias.as_ref().map(|a| (a.span, a.content.to_ascii_lowercase()));
        (parent, name)
      },
      None => (StageParent::Scratch, None)
    };

    if let Some((span, name)) = &name {
      if self.stages.get_by_name(name).is_some() {
        self.diagnostic(
          DiagnosticKind::DuplicateStageName,
          *span,
          format!("stage name '{}' is already in use", name)
        );
      }
    }

    let root = match parent {
      StageParent::Stage(p) => self.stages[p].root.clone(),
      _ => parent.clone()
    };

    trace!("stage {} (name: {:?}, parent: {})", index, name, parent);

    self.stages.push(Stage {
      index,
      name: name.map(|(_, n)| n),
      instructions: vec![node],
      parent,
      root
    });
  }

  fn add_node(&mut self, node: Node) {
    if node.instruction().as_from().is_some() {
      self.start_stage(node);
      return;
    }

    match self.stages.last_mut() {
      Some(stage) => stage.instructions.push(node),
      None => {
        if node.instruction().as_arg().is_none() {
          if let Some(span) = node.span {
            self.diagnostic(
              DiagnosticKind::InstructionBeforeFrom,
              span,
              format!("{} instruction appears before the first FROM", node.keyword)
            );
          }
        }

        self.preamble.push(node);
      }
    }
  }

  /// Reports `FROM` instructions that name their own stage or a later one.
  fn check_forward_references(&mut self) {
    let mut found = Vec::new();

    for stage in self.stages.iter() {
      let from = match (&stage.parent, stage.from()) {
        (StageParent::Image(_), Some(from)) => from,
        _ => continue
      };

      let image_name = from.image.content.to_ascii_lowercase();
      let by_name = self.stages.iter()
        .skip(stage.index)
        .any(|s| s.name.as_deref() == Some(image_name.as_str()));

      let by_index = match image_name.parse::<usize>() {
        Ok(n) => n >= stage.index && n < self.stages.len(),
        Err(_) => false
      };

      // a stage index can only mean a stage, but a name may just as well be
      // a registry image that a later alias shadows
      let message = if by_index {
        format!("stage '{}' is not defined before it is used", from.image.content)
      } else if by_name {
        format!(
          "'{}' is read as an image here but is shadowed by a later stage of the same name",
          from.image.content
        )
      } else {
        continue
      };

      found.push((from.image.span, message));
    }

    for (span, message) in found {
      self.diagnostic(DiagnosticKind::ForwardStageReference, span, message);
    }
  }
}

/// Builds a Dockerfile tree from text. Never fails: problems are reported as
/// diagnostics and the offending text is kept verbatim.
pub(crate) fn build(content: &str) -> (Dockerfile, Vec<Diagnostic>) {
  let text = read_source(content);
  let view = grammar_view(content, text.escape);
  let source = Source::new(content, &view, text.escape);
  let exec_view = continuation_view(content, text.escape);
  let exec_source = Source::new(content, &exec_view, text.escape);
  let exec = if text.escape == '\\' { None } else { Some(&exec_source) };

  let mut builder = Builder {
    content,
    directives: Vec::new(),
    preamble: Vec::new(),
    stages: Stages::default(),
    diagnostics: text.diagnostics,
    cursor: 0
  };

  for raw in text.directives {
    let trivia = builder.trivia(raw.span.start, raw.span.end);
    builder.directives.push(ParserDirective::parsed(trivia, raw.span, raw.name, raw.value));
  }

  for raw in &text.instructions {
    let start = raw.keyword.span.start;
    let end = raw.end();
    let trivia = builder.trivia(start, end);

    let mut instruction = builder.parse_instruction(raw, &source, exec);

    if let Some(heredocs) = instruction.heredocs_mut() {
      heredocs.extend(raw.heredocs.iter().map(|h| Heredoc::from_raw(h, builder.content)));
    }

    if let Instruction::From(from) = &mut instruction {
      from.index = builder.stages.len();
    }

    builder.validate(&instruction);

    trace!("{} at {}..{}", raw.keyword.content, start, end);
    let node = Node::parsed(trivia, Span::new(start, end), raw.keyword.content.clone(), instruction);
    builder.add_node(node);
  }

  builder.check_forward_references();

  let trailing = Span::new(builder.cursor, content.len());

  debug!(
    "built dockerfile: {} directives, {} global instructions, {} stages, {} diagnostics",
    builder.directives.len(),
    builder.preamble.len(),
    builder.stages.len(),
    builder.diagnostics.len()
  );

  let dockerfile = Dockerfile {
    content: content.to_string(),
    escape: text.escape,
    directives: builder.directives,
    preamble: builder.preamble,
    stages: builder.stages,
    trailing
  };

  (dockerfile, builder.diagnostics)
}

#[cfg(test)]
mod tests {
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  use super::*;

  fn kinds(input: &str) -> Vec<DiagnosticKind> {
    build(input).1.into_iter().map(|d| d.kind).collect()
  }

  #[test]
  fn build_trivia() {
    let input = indoc!(r#"
      # syntax=docker/dockerfile:1

      # base image
      FROM alpine

      RUN true
      # trailing
    "#);

    let (dockerfile, diagnostics) = build(input);
    assert!(diagnostics.is_empty());

    let directive = &dockerfile.directives[0];
    assert_eq!(directive.trivia, Span::new(0, 0));
    assert_eq!(directive.value.content, "docker/dockerfile:1");

    let from = &dockerfile.stages[0].instructions[0];
    assert_eq!(from.trivia.slice(input), "\n\n# base image\n");
    assert_eq!(from.span.map(|s| s.slice(input)), Some("FROM alpine"));

    let run = &dockerfile.stages[0].instructions[1];
    assert_eq!(run.trivia.slice(input), "\n\n");
    assert_eq!(dockerfile.trailing.slice(input), "\n# trailing\n");
  }

  #[test]
  fn build_heredoc_node() {
    let input = indoc!(r#"
      FROM alpine
      RUN <<EOF
      echo hi
      EOF
      CMD ["sh"]
    "#);

    let (dockerfile, _) = build(input);
    let run = &dockerfile.stages[0].instructions[1];
    assert_eq!(run.span.map(|s| s.slice(input)), Some("RUN <<EOF\necho hi\nEOF"));
    assert_eq!(run.instruction().span().slice(input), "RUN <<EOF");
    assert_eq!(run.instruction().heredocs()[0].body.content, "echo hi\n");

    let cmd = &dockerfile.stages[0].instructions[2];
    assert_eq!(cmd.trivia.slice(input), "\n");
  }

  #[test]
  fn build_invalid_instructions() {
    let (dockerfile, diagnostics) = build("FROM alpine\nFROBNICATE a b\nCOPY onlyone\n");

    assert_eq!(
      diagnostics.iter().map(|d| d.kind).collect::<Vec<_>>(),
      vec![DiagnosticKind::UnknownInstruction, DiagnosticKind::InvalidInstruction]
    );

    let stage = &dockerfile.stages[0];
    let frob = stage.instructions[1].instruction().as_misc().unwrap();
    assert_eq!(frob.instruction.content, "FROBNICATE");
    assert_eq!(frob.arguments.to_string(), "a b");

    let copy = stage.instructions[2].instruction().as_misc().unwrap();
    assert_eq!(copy.instruction.content, "COPY");
    assert_eq!(copy.arguments.to_string(), "onlyone");
    assert_eq!(stage.instructions[2].keyword, "COPY");
  }

  #[test]
  fn build_stage_diagnostics() {
    assert_eq!(
      kinds(indoc!(r#"
        FROM alpine AS base
        FROM ubuntu AS BASE
      "#)),
      vec![DiagnosticKind::DuplicateStageName]
    );

    assert_eq!(
      kinds(indoc!(r#"
        FROM later AS first
        FROM alpine AS later
        FROM 2
      "#)),
      vec![DiagnosticKind::ForwardStageReference, DiagnosticKind::ForwardStageReference]
    );

    let (_, diagnostics) = build("FROM alpine\nRUN true\nFROM 1\nFROM debian AS alpine\n");
    let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, vec![
      "'alpine' is read as an image here but is shadowed by a later stage of the same name",
      "stage '1' is not defined before it is used",
    ]);
    assert!(diagnostics.iter().all(|d| d.kind == DiagnosticKind::ForwardStageReference));

    assert_eq!(
      kinds("RUN echo hi\nARG X\nFROM alpine\n"),
      vec![DiagnosticKind::InstructionBeforeFrom]
    );
  }

  #[test]
  fn build_validation() {
    assert_eq!(
      kinds("FROM alpine\nENV A=1 B 2\n"),
      vec![DiagnosticKind::MixedKeyValueStyle]
    );

    assert_eq!(
      kinds("FROM alpine\nCMD [\"sh\", 'x']\nVOLUME [/data\n"),
      vec![DiagnosticKind::InvalidJsonArray, DiagnosticKind::InvalidJsonArray]
    );

    assert_eq!(kinds("FROM alpine\nONBUILD RUN [oops]\n"), vec![DiagnosticKind::InvalidJsonArray]);
  }

  #[test]
  fn build_backtick_escape() {
    let input = "# escape=`\nFROM mcr.microsoft.com/windows\nRUN dir `\n  C:\\Windows\n";
    let (dockerfile, diagnostics) = build(input);

    assert!(diagnostics.is_empty());
    assert_eq!(dockerfile.escape, '`');

    let run = dockerfile.stages[0].instructions[1].instruction().as_run().unwrap();
    assert_eq!(run.as_shell().map(|s| s.to_string()), Some("dir   C:\\Windows".into()));
  }

  #[test]
  fn build_backtick_exec_arrays() {
    let input = concat!(
      "# escape=`\n",
      "FROM mcr.microsoft.com/windows\n",
      "RUN [\"echo\", \"a\\\"b\"]\n",
      "CMD [\"cmd\", `\n",
      "  \"/S\", \"C:\\\\dir\"]\n",
      "COPY [\"a\\\"b\", \"C:\\\\dest\\\\\"]\n",
      "ENTRYPOINT [oops `\n",
      "  x]\n",
    );

    let (dockerfile, diagnostics) = build(input);
    let kinds: Vec<DiagnosticKind> = diagnostics.into_iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::InvalidJsonArray]);

    let instructions = &dockerfile.stages[0].instructions;
    let elements = |i: usize| -> Vec<String> {
      let expr = match instructions[i].instruction() {
        Instruction::Run(r) => &r.expr,
        Instruction::Cmd(c) => &c.expr,
        _ => panic!("unexpected instruction")
      };

      expr.as_exec().unwrap().elements.iter().map(|e| e.content.clone()).collect()
    };

    assert_eq!(elements(1), vec!["echo", "a\"b"]);
    assert_eq!(elements(2), vec!["cmd", "/S", "C:\\dir"]);

    let copy = instructions[3].instruction().as_copy().unwrap();
    assert!(copy.json);
    assert_eq!(copy.sources[0].content, "a\"b");
    assert_eq!(copy.destination.content, "C:\\dest\\");

    // still shell form, continuation intact
    let entrypoint = instructions[4].instruction().as_entrypoint().unwrap();
    assert_eq!(entrypoint.expr.as_shell().map(|s| s.to_string()), Some("[oops   x]".into()));
  }

  #[test]
  fn build_stage_parents() {
    let (dockerfile, _) = build(indoc!(r#"
      FROM alpine AS base
      FROM base AS next
      FROM scratch
    "#));

    let stages = &dockerfile.stages;
    assert_eq!(stages[1].parent, StageParent::Stage(0));
    assert_eq!(stages[2].parent, StageParent::Scratch);
    assert_eq!(stages[2].from().map(|f| f.index), Some(2));
  }
}
