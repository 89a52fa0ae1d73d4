// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

//! Variable scoping and expansion.
//!
//! Resolution never touches the tree: results are returned as a side table
//! indexed the same way as the tree itself, with one [`ResolvedStep`] per
//! node. `Scopes::global_steps[i]` belongs to `Dockerfile::preamble[i]` and
//! `Scopes::stages[s].steps[i]` to `Dockerfile::stages[s].instructions[i]`.

use std::collections::BTreeMap;

use tracing::debug;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::dockerfile::{Dockerfile, Instruction, Node};
use crate::image::ImageRef;
use crate::instructions::*;
use crate::splicer::Span;
use crate::stage::{Stage, StageParent};
use crate::util::{ShellOrExecExpr, SpannedString};
use crate::word::{quote_word, source_text, Quoting, VarValue, WordProcessor};

/// Platform args Docker declares in the global scope.
const PLATFORM_ARGS: &[&str] = &[
  "TARGETPLATFORM", "TARGETOS", "TARGETARCH", "TARGETVARIANT",
  "BUILDPLATFORM", "BUILDOS", "BUILDARCH", "BUILDVARIANT",
];

/// Proxy args Docker declares in every stage.
const PROXY_ARGS: &[&str] = &[
  "HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy",
  "FTP_PROXY", "ftp_proxy", "NO_PROXY", "no_proxy",
  "ALL_PROXY", "all_proxy",
];

/// Options for scope resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeOptions {
  /// Values for declared ARGs, as given by `--build-arg`. These take
  /// precedence over ARG defaults.
  pub build_args: BTreeMap<String, String>
}

impl ScopeOptions {
  pub fn with_build_arg<S1, S2>(mut self, name: S1, value: S2) -> Self
  where
    S1: Into<String>,
    S2: Into<String>,
  {
    self.build_args.insert(name.into(), value.into());
    self
  }
}

/// Where a binding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingOrigin {
  /// An `ARG` before the first `FROM`.
  GlobalArg,

  /// An `ARG` inside a stage.
  Arg,

  /// An `ENV`, either in the stage or inherited from a parent stage.
  Env,

  /// A variable Docker predefines.
  Automatic
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
  pub name: String,

  /// The bound value, or None if the variable is declared without one.
  pub value: Option<String>,
  pub origin: BindingOrigin
}

/// An ordered set of bindings. Each name appears at most once, at the
/// position it was first declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
  bindings: Vec<Binding>
}

impl Bindings {
  pub fn get(&self, name: &str) -> Option<&Binding> {
    self.bindings.iter().find(|b| b.name == name)
  }

  /// Returns the value of a variable, if it is bound to one.
  pub fn value(&self, name: &str) -> Option<&str> {
    self.get(name).and_then(|b| b.value.as_deref())
  }

  pub fn lookup(&self, name: &str) -> VarValue {
    match self.get(name) {
      Some(Binding { value: Some(value), .. }) => VarValue::Set(value.clone()),
      Some(_) => VarValue::Declared,
      None => VarValue::Undefined
    }
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Binding> {
    self.bindings.iter()
  }

  pub fn len(&self) -> usize {
    self.bindings.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bindings.is_empty()
  }

  /// Returns all variables bound to a value.
  pub fn to_map(&self) -> BTreeMap<String, String> {
    self.bindings.iter()
      .filter_map(|b| b.value.clone().map(|v| (b.name.clone(), v)))
      .collect()
  }

  pub(crate) fn set(&mut self, binding: Binding) {
    match self.bindings.iter_mut().find(|b| b.name == binding.name) {
      Some(existing) => *existing = binding,
      None => self.bindings.push(binding)
    }
  }

  /// Sets an ARG binding unless an ENV of the same name is already bound.
  fn set_arg(&mut self, binding: Binding) {
    let shadowed = self.get(&binding.name)
      .map(|b| b.origin == BindingOrigin::Env)
      .unwrap_or(false);

    if !shadowed {
      self.set(binding);
    }
  }
}

/// A single expanded word or command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
  /// The location of the text in the original Dockerfile. Empty for nodes
  /// that have no source.
  pub span: Span,

  /// The text before expansion.
  pub raw: String,

  /// The text after expansion.
  pub value: String,

  /// Variables referenced, in order of first use.
  pub variables: Vec<String>
}

/// Resolution results for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedStep {
  /// The bindings visible to the instruction, before its own effect.
  pub bindings: Bindings,

  /// Every expandable word of the instruction, in order.
  pub expansions: Vec<Expansion>
}

/// Resolution results for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageScope {
  pub index: usize,

  /// The `FROM` image with variables expanded.
  pub image: Option<ImageRef>,

  /// Global ARGs the stage picked up by referencing them in its `FROM`.
  pub inherited: Vec<String>,

  pub steps: Vec<ResolvedStep>,

  /// The bindings in effect at the end of the stage.
  pub bindings: Bindings
}

/// The result of scope resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scopes {
  /// Bindings after all global ARGs.
  pub global: Bindings,
  pub global_steps: Vec<ResolvedStep>,
  pub stages: Vec<StageScope>,
  pub diagnostics: Vec<Diagnostic>
}

impl Scopes {
  /// Returns the resolution results for a node by stage and instruction
  /// index.
  pub fn step(&self, stage: usize, instruction: usize) -> Option<&ResolvedStep> {
    self.stages.get(stage).and_then(|s| s.steps.get(instruction))
  }
}

struct Resolver<'a> {
  content: &'a str,
  escape: char,
  options: &'a ScopeOptions,
  diagnostics: Vec<Diagnostic>
}

impl<'a> Resolver<'a> {
  fn expand(
    &mut self,
    bindings: &Bindings,
    span: Option<Span>,
    raw: String,
    quoting: Quoting,
    step: &mut ResolvedStep
  ) -> String {
    let lookup = |name: &str| bindings.lookup(name);
    let mut processor = WordProcessor::new(self.escape, quoting).with_lookup(&lookup);
    let value = processor.process(&raw);

    for name in &processor.undefined {
      self.diagnostics.push(Diagnostic::new(
        DiagnosticKind::UndefinedVariable,
        span,
        format!("variable '{}' is not defined", name)
      ));
    }

    step.expansions.push(Expansion {
      span: span.unwrap_or_default(),
      raw,
      value: value.clone(),
      variables: processor.referenced
    });

    value
  }

  /// Expands a word, reading its text as written when the node is unchanged.
  /// Edited words expand their written text while it still matches, and are
  /// otherwise taken literally, the same way they are printed.
  fn expand_word(
    &mut self,
    bindings: &Bindings,
    node: &Node,
    word: &SpannedString,
    step: &mut ResolvedStep
  ) -> String {
    let (span, raw) = if !node.is_modified() && !word.span.is_empty() {
      (Some(word.span), word.span.slice(self.content).to_string())
    } else {
      let raw = match source_text(word, self.content, self.escape) {
        Some(raw) => raw.to_string(),
        None => quote_word(&word.content, self.escape)
      };

      (None, raw)
    };

    self.expand(bindings, span, raw, Quoting::Word, step)
  }

  fn expand_flags(&mut self, bindings: &Bindings, node: &Node, flags: &[Flag], step: &mut ResolvedStep) {
    for value in flags.iter().filter_map(|f| f.value.as_ref()) {
      self.expand_word(bindings, node, value, step);
    }
  }

  fn expand_words<'w, I>(&mut self, bindings: &Bindings, node: &Node, words: I, step: &mut ResolvedStep)
  where
    I: IntoIterator<Item = &'w SpannedString>
  {
    for word in words {
      self.expand_word(bindings, node, word, step);
    }
  }

  fn expand_heredocs(&mut self, bindings: &Bindings, node: &Node, heredocs: &[Heredoc], step: &mut ResolvedStep) {
    for heredoc in heredocs.iter().filter(|h| h.expand) {
      let span = if node.is_modified() { None } else { Some(heredoc.body.span) };
      self.expand(bindings, span, heredoc.content(), Quoting::Shell, step);
    }
  }

  /// Resolves the arguments of an `ARG` instruction against `bindings`.
  fn resolve_arg(
    &mut self,
    bindings: &Bindings,
    fallback: Option<&Bindings>,
    node: &Node,
    arg: &ArgInstruction,
    origin: BindingOrigin,
    step: &mut ResolvedStep
  ) -> Vec<Binding> {
    let mut updates = Vec::new();

    for a in &arg.args {
      let name = &a.name.content;
      let default = a.value.as_ref()
        .map(|v| self.expand_word(bindings, node, v, step));

      let value = self.options.build_args.get(name).cloned()
        .or(default)
        .or_else(|| fallback.and_then(|f| f.value(name)).map(String::from));

      updates.push(Binding { name: name.clone(), value, origin });
    }

    updates
  }

  fn resolve_global(&mut self, dockerfile: &Dockerfile) -> (Bindings, Vec<ResolvedStep>) {
    let mut global = Bindings::default();
    for name in PLATFORM_ARGS {
      global.set(Binding {
        name: name.to_string(),
        value: self.options.build_args.get(*name).cloned(),
        origin: BindingOrigin::Automatic
      });
    }

    let mut steps = Vec::new();
    for node in &dockerfile.preamble {
      let mut step = ResolvedStep { bindings: global.clone(), expansions: Vec::new() };

      if let Instruction::Arg(arg) = node.instruction() {
        let updates = self.resolve_arg(
          &global, None, node, arg, BindingOrigin::GlobalArg, &mut step
        );

        for binding in updates {
          global.set(binding);
        }
      }

      steps.push(step);
    }

    (global, steps)
  }

  fn resolve_from(
    &mut self,
    global: &Bindings,
    node: &Node,
    from: &FromInstruction,
    bindings: &mut Bindings,
    step: &mut ResolvedStep
  ) -> (ImageRef, Vec<String>) {
    let image = self.expand_word(global, node, &from.image, step);
    self.expand_flags(global, node, &from.flags, step);

    let mut inherited: Vec<String> = Vec::new();
    for name in step.expansions.iter().flat_map(|e| e.variables.iter()) {
      if inherited.contains(name) {
        continue;
      }

      if let Some(binding) = global.get(name) {
        bindings.set(binding.clone());
        inherited.push(name.clone());
      }
    }

    (ImageRef::parse(&image), inherited)
  }

  /// Expands the arguments of an instruction and applies its effect on
  /// `bindings`.
  fn resolve_instruction(
    &mut self,
    global: &Bindings,
    node: &Node,
    instruction: &Instruction,
    bindings: &mut Bindings,
    step: &mut ResolvedStep
  ) {
    let current = bindings.clone();

    match instruction {
      Instruction::Arg(arg) => {
        let updates = self.resolve_arg(
          &current, Some(global), node, arg, BindingOrigin::Arg, step
        );

        for binding in updates {
          bindings.set_arg(binding);
        }
      },
      Instruction::Env(env) => {
        // every pair sees the bindings from before the instruction
        let mut updates = Vec::new();
        for pair in &env.vars {
          let value = self.expand_word(&current, node, &pair.value, step);
          updates.push(Binding {
            name: pair.key.content.clone(),
            value: Some(value),
            origin: BindingOrigin::Env
          });
        }

        for binding in updates {
          bindings.set(binding);
        }
      },
      Instruction::Label(label) => {
        for pair in &label.labels {
          self.expand_word(&current, node, &pair.key, step);
          self.expand_word(&current, node, &pair.value, step);
        }
      },
      Instruction::Run(run) => {
        self.expand_flags(&current, node, &run.flags, step);

        if let ShellOrExecExpr::Shell(shell) = &run.expr {
          let span = if node.is_modified() { None } else { Some(shell.span) };
          self.expand(&current, span, shell.to_string(), Quoting::Shell, step);
        }
      },
      Instruction::Copy(copy) => {
        self.expand_flags(&current, node, &copy.flags, step);
        self.expand_words(&current, node, copy.sources.iter().chain(Some(&copy.destination)), step);
        self.expand_heredocs(&current, node, &copy.heredocs, step);
      },
      Instruction::Add(add) => {
        self.expand_flags(&current, node, &add.flags, step);
        self.expand_words(&current, node, add.sources.iter().chain(Some(&add.destination)), step);
        self.expand_heredocs(&current, node, &add.heredocs, step);
      },
      Instruction::Workdir(w) => { self.expand_word(&current, node, &w.value, step); },
      Instruction::User(u) => { self.expand_word(&current, node, &u.value, step); },
      Instruction::StopSignal(s) => { self.expand_word(&current, node, &s.value, step); },
      Instruction::Expose(e) => self.expand_words(&current, node, &e.ports, step),
      Instruction::Volume(v) => self.expand_words(&current, node, &v.paths, step),
      _ => ()
    }
  }

  fn resolve_stage(&mut self, global: &Bindings, stage: &Stage, parent: Option<&Bindings>) -> StageScope {
    let mut bindings = Bindings::default();
    for name in PROXY_ARGS {
      bindings.set(Binding {
        name: name.to_string(),
        value: self.options.build_args.get(*name).cloned(),
        origin: BindingOrigin::Automatic
      });
    }

    // a stage built on another one starts with its environment
    if let Some(parent) = parent {
      for binding in parent.iter().filter(|b| b.origin == BindingOrigin::Env) {
        bindings.set(binding.clone());
      }
    }

    let mut image = None;
    let mut inherited = Vec::new();
    let mut steps = Vec::with_capacity(stage.instructions.len());

    for (i, node) in stage.instructions.iter().enumerate() {
      let mut step = ResolvedStep { bindings: bindings.clone(), expansions: Vec::new() };

      match node.instruction() {
        Instruction::From(from) if i == 0 => {
          step.bindings = global.clone();
          let (resolved, names) = self.resolve_from(global, node, from, &mut bindings, &mut step);
          image = Some(resolved);
          inherited = names;
        },
        instruction => {
          self.resolve_instruction(global, node, instruction, &mut bindings, &mut step);
        }
      }

      steps.push(step);
    }

    StageScope { index: stage.index, image, inherited, steps, bindings }
  }
}

/// Resolves variable scopes with the given options.
pub fn resolve_scopes_with(dockerfile: &Dockerfile, options: &ScopeOptions) -> Scopes {
  let mut resolver = Resolver {
    content: &dockerfile.content,
    escape: dockerfile.escape,
    options,
    diagnostics: Vec::new()
  };

  let (global, global_steps) = resolver.resolve_global(dockerfile);

  let mut stages: Vec<StageScope> = Vec::with_capacity(dockerfile.stages.len());
  for stage in dockerfile.stages.iter() {
    let parent = match stage.parent {
      StageParent::Stage(p) => stages.get(p).map(|s| &s.bindings),
      _ => None
    };

    let scope = resolver.resolve_stage(&global, stage, parent);
    stages.push(scope);
  }

  debug!(
    stages = stages.len(),
    diagnostics = resolver.diagnostics.len(),
    "resolved variable scopes"
  );

  Scopes {
    global,
    global_steps,
    stages,
    diagnostics: resolver.diagnostics
  }
}

/// Resolves variable scopes with no build arguments.
///
/// # Example
/// ```
/// use dockerfile_ast::*;
///
/// let dockerfile = Dockerfile::parse(r#"
///   ARG VERSION=3.12
///   FROM alpine:$VERSION
///   ENV HOME=/root
///   WORKDIR $HOME/app
/// "#);
///
/// let scopes = resolve_scopes(&dockerfile);
/// assert_eq!(scopes.stages[0].image, Some(ImageRef::parse("alpine:3.12")));
/// assert_eq!(scopes.step(0, 2).unwrap().expansions[0].value, "/root/app");
/// ```
pub fn resolve_scopes(dockerfile: &Dockerfile) -> Scopes {
  resolve_scopes_with(dockerfile, &ScopeOptions::default())
}
