// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

//! Turns a [`Dockerfile`] tree back into text.
//!
//! Unmodified nodes are copied from the original text along with their
//! trivia, so printing an unedited tree reproduces its input byte for byte.
//! Modified and new nodes are rendered in a canonical form.

use serde_json::Value;

use crate::dockerfile::{Dockerfile, Instruction, Node, ParserDirective};
use crate::instructions::*;
use crate::util::{BreakableString, BreakableStringComponent, ShellOrExecExpr, SpannedString};
use crate::word::{source_text, word_text};

struct Printer<'a> {
  content: &'a str,
  escape: char,
  out: String
}

impl<'a> Printer<'a> {
  /// Writes trivia, adding a line break if the preceding node was rendered
  /// and nothing else would separate it from the next one.
  fn trivia(&mut self, trivia: &str) {
    if !self.out.is_empty() && !self.out.ends_with('\n') && !trivia.contains('\n') {
      self.out.push('\n');
    }

    self.out.push_str(trivia);
  }

  fn directive(&mut self, directive: &ParserDirective) {
    let trivia = directive.trivia.slice(self.content);
    self.trivia(trivia);

    match directive.span {
      Some(span) if !directive.is_modified() => self.out.push_str(span.slice(self.content)),
      _ => {
        let line = format!("# {}={}", directive.name.content, directive.value.content);
        self.out.push_str(&line);
      }
    }
  }

  fn node(&mut self, node: &Node) {
    let trivia = node.trivia.slice(self.content);
    self.trivia(trivia);

    match node.span {
      Some(span) if !node.is_modified() => self.out.push_str(span.slice(self.content)),
      _ => {
        let instruction = node.instruction();
        let keyword = if node.keyword.eq_ignore_ascii_case(instruction.keyword()) {
          node.keyword.as_str()
        } else {
          instruction.keyword()
        };

        let rendered = Canonical::new(self.content, self.escape).instruction(instruction, keyword);
        self.out.push_str(&rendered);
      }
    }
  }
}

fn json_array(elements: &[SpannedString]) -> String {
  let elements: Vec<String> = elements.iter()
    .map(|e| Value::String(e.content.clone()).to_string())
    .collect();

  format!("[{}]", elements.join(", "))
}

/// Renders shell text, putting each continued line back on its own line.
/// Comments before the first or after the last line of text are dropped.
fn render_breakable(breakable: &BreakableString, escape: char) -> String {
  let is_string = |c: &BreakableStringComponent| {
    matches!(c, BreakableStringComponent::String(_))
  };

  let components = &breakable.components;
  let (first, last) = match (
    components.iter().position(is_string),
    components.iter().rposition(is_string)
  ) {
    (Some(first), Some(last)) => (first, last),
    _ => return String::new()
  };

  let mut out = String::new();
  for (i, component) in components[first..=last].iter().enumerate() {
    if i > 0 && !out.ends_with('\n') {
      out.push(escape);
      out.push('\n');
    }

    match component {
      BreakableStringComponent::String(s) => out.push_str(&s.content),
      BreakableStringComponent::Comment(c) => {
        out.push_str(c.content.trim());
        out.push('\n');
      }
    }
  }

  out
}

fn render_heredocs(heredocs: &[Heredoc]) -> String {
  let mut out = String::new();

  for heredoc in heredocs {
    out.push('\n');
    out.push_str(&heredoc.body.content);
    if !heredoc.body.content.is_empty() && !heredoc.body.content.ends_with('\n') {
      out.push('\n');
    }
    out.push_str(&heredoc.delimiter);
  }

  out
}

/// Renders instructions in canonical form. Words whose content is unchanged
/// keep the text they were written as; everything else is quoted so that it
/// reads back as the same literal value.
pub(crate) struct Canonical<'a> {
  content: &'a str,
  escape: char
}

impl<'a> Canonical<'a> {
  pub(crate) fn new(content: &'a str, escape: char) -> Canonical<'a> {
    Canonical { content, escape }
  }

  fn word(&self, word: &SpannedString) -> String {
    word_text(word, self.content, self.escape)
  }

  fn expr(&self, expr: &ShellOrExecExpr) -> String {
    match expr {
      ShellOrExecExpr::Shell(s) => render_breakable(s, self.escape),
      ShellOrExecExpr::Exec(a) => json_array(&a.elements)
    }
  }

  fn flags(&self, flags: &[Flag]) -> String {
    flags.iter()
      .map(|f| match &f.value {
        Some(value) => format!(" --{}={}", f.name.content, self.word(value)),
        None => format!(" --{}", f.name.content)
      })
      .collect()
  }

  fn pairs(&self, style: KeyValueStyle, pairs: &[KeyValuePair]) -> String {
    if let (KeyValueStyle::Legacy, [pair]) = (style, pairs) {
      // the legacy value runs to the end of the line, so it can only be
      // reused as written
      if let Some(value) = source_text(&pair.value, self.content, self.escape) {
        return format!("{} {}", self.word(&pair.key), value);
      }
    }

    pairs.iter()
      .map(|p| format!("{}={}", self.word(&p.key), self.word(&p.value)))
      .collect::<Vec<_>>()
      .join(" ")
  }

  /// Renders paths as a JSON array if they were written as one or contain
  /// whitespace, otherwise as plain words.
  fn paths(&self, paths: &[&SpannedString], json: bool) -> String {
    let needs_json = paths.iter().any(|p| p.content.chars().any(char::is_whitespace));

    if json || needs_json {
      let elements: Vec<SpannedString> = paths.iter().map(|p| (*p).clone()).collect();
      json_array(&elements)
    } else {
      paths.iter()
        .map(|p| self.word(p))
        .collect::<Vec<_>>()
        .join(" ")
    }
  }

  /// Renders COPY and ADD. Heredoc sources are written from their heredoc, in
  /// order, so the marker always matches its delimiter and quoting.
  fn copy(
    &self,
    keyword: &str,
    flags: &[Flag],
    sources: &[SpannedString],
    destination: &SpannedString,
    json: bool,
    heredocs: &[Heredoc]
  ) -> String {
    let mut paths: Vec<&SpannedString> = sources.iter().collect();
    paths.push(destination);

    let paths = if heredocs.is_empty() {
      self.paths(&paths, json)
    } else {
      // heredoc markers only work as plain words
      let mut markers = heredocs.iter();
      paths.iter()
        .map(|p| {
          let marker = if p.content.starts_with("<<") { markers.next() } else { None };
          marker.map(Heredoc::marker).unwrap_or_else(|| self.word(p))
        })
        .collect::<Vec<_>>()
        .join(" ")
    };

    format!("{}{} {}{}", keyword, self.flags(flags), paths, render_heredocs(heredocs))
  }

  /// Renders an instruction in canonical form using the given keyword.
  pub(crate) fn instruction(&self, instruction: &Instruction, keyword: &str) -> String {
    match instruction {
      Instruction::From(from) => {
        let mut out = format!("{}{} {}", keyword, self.flags(&from.flags), self.word(&from.image));
        if let Some(alias) = &from.alias {
          out.push_str(" AS ");
          out.push_str(&alias.content);
        }

        out
      },
      Instruction::Arg(arg) => {
        let args: Vec<String> = arg.args.iter()
          .map(|a| match &a.value {
            Some(value) => format!("{}={}", a.name.content, self.word(value)),
            None => a.name.content.clone()
          })
          .collect();

        format!("{} {}", keyword, args.join(" "))
      },
      Instruction::Label(label) => format!("{} {}", keyword, self.pairs(label.style, &label.labels)),
      Instruction::Env(env) => format!("{} {}", keyword, self.pairs(env.style, &env.vars)),
      Instruction::Run(run) => format!(
        "{}{} {}{}",
        keyword,
        self.flags(&run.flags),
        self.expr(&run.expr),
        render_heredocs(&run.heredocs)
      ),
      Instruction::Cmd(cmd) => format!("{} {}", keyword, self.expr(&cmd.expr)),
      Instruction::Entrypoint(e) => format!("{} {}", keyword, self.expr(&e.expr)),
      Instruction::Shell(s) => format!("{} {}", keyword, self.expr(&s.expr)),
      Instruction::Copy(c) => self.copy(
        keyword, &c.flags, &c.sources, &c.destination, c.json, &c.heredocs
      ),
      Instruction::Add(a) => self.copy(
        keyword, &a.flags, &a.sources, &a.destination, a.json, &a.heredocs
      ),
      Instruction::Expose(expose) => {
        let ports: Vec<String> = expose.ports.iter().map(|p| self.word(p)).collect();
        format!("{} {}", keyword, ports.join(" "))
      },
      Instruction::Volume(volume) => {
        let paths: Vec<&SpannedString> = volume.paths.iter().collect();
        format!("{} {}", keyword, self.paths(&paths, volume.json))
      },
      Instruction::User(u) => format!("{} {}", keyword, self.word(&u.value)),
      Instruction::Workdir(w) => format!("{} {}", keyword, self.word(&w.value)),
      Instruction::StopSignal(s) => format!("{} {}", keyword, self.word(&s.value)),
      Instruction::Maintainer(m) => format!("{} {}", keyword, m.value.content),
      Instruction::Onbuild(onbuild) => {
        let trigger_keyword = if onbuild.keyword.content.eq_ignore_ascii_case(onbuild.trigger.keyword()) {
          onbuild.keyword.content.as_str()
        } else {
          onbuild.trigger.keyword()
        };

        format!("{} {}", keyword, self.instruction(&onbuild.trigger, trigger_keyword))
      },
      Instruction::Healthcheck(h) => match &h.cmd {
        None => format!("{} NONE", keyword),
        Some(cmd) => format!("{}{} CMD {}", keyword, self.flags(&h.flags), self.expr(&cmd.expr))
      },
      Instruction::Misc(misc) => {
        let arguments = render_breakable(&misc.arguments, self.escape);
        if arguments.is_empty() {
          keyword.to_string()
        } else {
          format!("{} {}", keyword, arguments)
        }
      }
    }
  }
}

/// Prints a Dockerfile. Unmodified nodes are reproduced exactly.
pub(crate) fn print(dockerfile: &Dockerfile) -> String {
  let mut printer = Printer {
    content: &dockerfile.content,
    escape: dockerfile.escape,
    out: String::with_capacity(dockerfile.content.len())
  };

  for directive in &dockerfile.directives {
    printer.directive(directive);
  }

  for node in dockerfile.nodes() {
    printer.node(node);
  }

  let trailing = dockerfile.trailing.slice(&dockerfile.content);
  printer.out.push_str(trailing);

  printer.out
}
