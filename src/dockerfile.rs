// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::fmt;
use std::io::{Read, BufReader};
use std::str::FromStr;

use snafu::ResultExt;

use crate::builder;
use crate::diagnostic::Diagnostic;
use crate::error::*;
use crate::instructions::*;
use crate::parser::*;
use crate::printer;
use crate::scope::{self, Scopes, ScopeOptions};
use crate::splicer::*;
use crate::stage::*;
use crate::util::SpannedString;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Instruction {
  From(FromInstruction),
  Arg(ArgInstruction),
  Label(LabelInstruction),
  Run(RunInstruction),
  Entrypoint(EntrypointInstruction),
  Cmd(CmdInstruction),
  Copy(CopyInstruction),
  Add(AddInstruction),
  Env(EnvInstruction),
  Expose(ExposeInstruction),
  Volume(VolumeInstruction),
  User(UserInstruction),
  Workdir(WorkdirInstruction),
  Onbuild(OnbuildInstruction),
  StopSignal(StopSignalInstruction),
  Healthcheck(HealthcheckInstruction),
  Shell(ShellInstruction),
  Maintainer(MaintainerInstruction),
  Misc(MiscInstruction)
}

/// Maps an instruction struct to its enum variant, implementing From<T> on
/// Instruction for it along with `as_*` and `into_*` accessors.
macro_rules! impl_from_instruction {
  ($struct:ident, $enum:ident, $as:ident, $into:ident) => {
    impl From<$struct> for Instruction {
      fn from(ins: $struct) -> Self {
        Instruction::$enum(ins)
      }
    }

    impl Instruction {
      pub fn $as(&self) -> Option<&$struct> {
        if let Instruction::$enum(i) = self {
          Some(i)
        } else {
          None
        }
      }

      pub fn $into(self) -> Option<$struct> {
        if let Instruction::$enum(i) = self {
          Some(i)
        } else {
          None
        }
      }
    }
  };
}

impl_from_instruction!(FromInstruction, From, as_from, into_from);
impl_from_instruction!(ArgInstruction, Arg, as_arg, into_arg);
impl_from_instruction!(LabelInstruction, Label, as_label, into_label);
impl_from_instruction!(RunInstruction, Run, as_run, into_run);
impl_from_instruction!(EntrypointInstruction, Entrypoint, as_entrypoint, into_entrypoint);
impl_from_instruction!(CmdInstruction, Cmd, as_cmd, into_cmd);
impl_from_instruction!(CopyInstruction, Copy, as_copy, into_copy);
impl_from_instruction!(AddInstruction, Add, as_add, into_add);
impl_from_instruction!(EnvInstruction, Env, as_env, into_env);
impl_from_instruction!(ExposeInstruction, Expose, as_expose, into_expose);
impl_from_instruction!(VolumeInstruction, Volume, as_volume, into_volume);
impl_from_instruction!(UserInstruction, User, as_user, into_user);
impl_from_instruction!(WorkdirInstruction, Workdir, as_workdir, into_workdir);
impl_from_instruction!(OnbuildInstruction, Onbuild, as_onbuild, into_onbuild);
impl_from_instruction!(StopSignalInstruction, StopSignal, as_stop_signal, into_stop_signal);
impl_from_instruction!(HealthcheckInstruction, Healthcheck, as_healthcheck, into_healthcheck);
impl_from_instruction!(ShellInstruction, Shell, as_shell, into_shell);
impl_from_instruction!(MaintainerInstruction, Maintainer, as_maintainer, into_maintainer);
impl_from_instruction!(MiscInstruction, Misc, as_misc, into_misc);

impl Instruction {
  /// Converts a parsed instruction record into its instruction type.
  pub(crate) fn from_record(record: Pair, source: &Source) -> Result<Instruction> {
    let instruction: Instruction = match record.as_rule() {
      Rule::from => FromInstruction::from_record(record, source, 0)?.into(),
      Rule::arg => ArgInstruction::from_record(record, source)?.into(),
      Rule::label => LabelInstruction::from_record(record, source)?.into(),
      Rule::run => RunInstruction::from_record(record, source)?.into(),
      Rule::entrypoint => EntrypointInstruction::from_record(record, source)?.into(),
      Rule::cmd => CmdInstruction::from_record(record, source)?.into(),
      Rule::copy => CopyInstruction::from_record(record, source)?.into(),
      Rule::add => AddInstruction::from_record(record, source)?.into(),
      Rule::env => EnvInstruction::from_record(record, source)?.into(),
      Rule::expose => ExposeInstruction::from_record(record, source)?.into(),
      Rule::volume => VolumeInstruction::from_record(record, source)?.into(),
      Rule::user => UserInstruction::from_record(record, source)?.into(),
      Rule::workdir => WorkdirInstruction::from_record(record, source)?.into(),
      Rule::onbuild => OnbuildInstruction::from_record(record, source)?.into(),
      Rule::stopsignal => StopSignalInstruction::from_record(record, source)?.into(),
      Rule::healthcheck => HealthcheckInstruction::from_record(record, source)?.into(),
      Rule::shell => ShellInstruction::from_record(record, source)?.into(),
      Rule::maintainer => MaintainerInstruction::from_record(record, source)?.into(),
      Rule::misc => MiscInstruction::from_record(record, source)?.into(),
      _ => return Err(unexpected_token(record))
    };

    Ok(instruction)
  }

  /// Returns the canonical (uppercase) keyword of this instruction. For
  /// miscellaneous instructions, this is the keyword as written.
  pub fn keyword(&self) -> &str {
    match self {
      Instruction::From(_) => "FROM",
      Instruction::Arg(_) => "ARG",
      Instruction::Label(_) => "LABEL",
      Instruction::Run(_) => "RUN",
      Instruction::Entrypoint(_) => "ENTRYPOINT",
      Instruction::Cmd(_) => "CMD",
      Instruction::Copy(_) => "COPY",
      Instruction::Add(_) => "ADD",
      Instruction::Env(_) => "ENV",
      Instruction::Expose(_) => "EXPOSE",
      Instruction::Volume(_) => "VOLUME",
      Instruction::User(_) => "USER",
      Instruction::Workdir(_) => "WORKDIR",
      Instruction::Onbuild(_) => "ONBUILD",
      Instruction::StopSignal(_) => "STOPSIGNAL",
      Instruction::Healthcheck(_) => "HEALTHCHECK",
      Instruction::Shell(_) => "SHELL",
      Instruction::Maintainer(_) => "MAINTAINER",
      Instruction::Misc(m) => &m.instruction.content
    }
  }

  /// Returns the span of the instruction text, excluding heredoc bodies.
  pub fn span(&self) -> Span {
    match self {
      Instruction::From(i) => i.span,
      Instruction::Arg(i) => i.span,
      Instruction::Label(i) => i.span,
      Instruction::Run(i) => i.span,
      Instruction::Entrypoint(i) => i.span,
      Instruction::Cmd(i) => i.span,
      Instruction::Copy(i) => i.span,
      Instruction::Add(i) => i.span,
      Instruction::Env(i) => i.span,
      Instruction::Expose(i) => i.span,
      Instruction::Volume(i) => i.span,
      Instruction::User(i) => i.span,
      Instruction::Workdir(i) => i.span,
      Instruction::Onbuild(i) => i.span,
      Instruction::StopSignal(i) => i.span,
      Instruction::Healthcheck(i) => i.span,
      Instruction::Shell(i) => i.span,
      Instruction::Maintainer(i) => i.span,
      Instruction::Misc(i) => i.span
    }
  }

  /// Returns the heredocs attached to this instruction, if any.
  pub fn heredocs(&self) -> &[Heredoc] {
    match self {
      Instruction::Run(r) => &r.heredocs,
      Instruction::Copy(c) => &c.heredocs,
      Instruction::Add(a) => &a.heredocs,
      _ => &[]
    }
  }

  pub(crate) fn heredocs_mut(&mut self) -> Option<&mut Vec<Heredoc>> {
    match self {
      Instruction::Run(r) => Some(&mut r.heredocs),
      Instruction::Copy(c) => Some(&mut c.heredocs),
      Instruction::Add(a) => Some(&mut a.heredocs),
      _ => None
    }
  }
}

/// An instruction in the tree, along with everything needed to print it back
/// out as written.
///
/// Nodes built from a Dockerfile print verbatim until their instruction is
/// borrowed mutably via [`Node::instruction_mut`], after which they print in
/// canonical form. Nodes created with [`Node::new`] always print in
/// canonical form.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Node {
  /// The whitespace, comments and blank lines preceding this node, including
  /// the line break that ends the previous one.
  pub trivia: Span,

  /// The span of the node, from its keyword through its last heredoc
  /// terminator. None for nodes that did not come from source text.
  pub span: Option<Span>,

  /// The keyword as written, e.g. `run` or `RUN`.
  pub keyword: String,

  instruction: Instruction,
  modified: bool
}

impl Node {
  pub fn new<I: Into<Instruction>>(instruction: I) -> Node {
    let instruction = instruction.into();

    Node {
      trivia: Span::default(),
      span: None,
      keyword: instruction.keyword().to_string(),
      instruction,
      modified: false
    }
  }

  pub(crate) fn parsed(
    trivia: Span, span: Span, keyword: String, instruction: Instruction
  ) -> Node {
    Node {
      trivia,
      span: Some(span),
      keyword,
      instruction,
      modified: false
    }
  }

  pub fn instruction(&self) -> &Instruction {
    &self.instruction
  }

  /// Returns the instruction for editing and marks this node as modified.
  pub fn instruction_mut(&mut self) -> &mut Instruction {
    self.modified = true;
    &mut self.instruction
  }

  /// Replaces the instruction, marking this node as modified.
  pub fn set_instruction<I: Into<Instruction>>(&mut self, instruction: I) {
    self.modified = true;
    self.instruction = instruction.into();
  }

  pub fn into_instruction(self) -> Instruction {
    self.instruction
  }

  /// Returns true if this node must be printed in canonical form.
  pub fn is_modified(&self) -> bool {
    self.modified || self.span.is_none()
  }
}

/// A parser directive, e.g. `# syntax=docker/dockerfile:1`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParserDirective {
  pub trivia: Span,

  /// The span of the directive line, or None for new directives.
  pub span: Option<Span>,
  pub name: SpannedString,
  pub value: SpannedString,
  modified: bool
}

impl ParserDirective {
  pub fn new<S1, S2>(name: S1, value: S2) -> ParserDirective
  where
    S1: Into<String>,
    S2: Into<String>,
  {
    ParserDirective {
      trivia: Span::default(),
      span: None,
      name: SpannedString::detached(name),
      value: SpannedString::detached(value),
      modified: false
    }
  }

  pub(crate) fn parsed(
    trivia: Span, span: Span, name: SpannedString, value: SpannedString
  ) -> ParserDirective {
    ParserDirective { trivia, span: Some(span), name, value, modified: false }
  }

  pub fn set_value<S: Into<String>>(&mut self, value: S) {
    self.value = SpannedString::new(self.value.span, value);
    self.modified = true;
  }

  pub fn is_modified(&self) -> bool {
    self.modified || self.span.is_none()
  }
}

/// A parsed Dockerfile.
///
/// The tree owns the original text; every node refers into it by span. Text
/// that belongs to no node (comments, blank lines) is kept as trivia on the
/// node that follows it, or in `trailing` at the end of the file.
#[derive(Debug, Clone)]
pub struct Dockerfile {
  /// The raw content of the Dockerfile
  pub content: String,

  /// The escape character in effect, `\` unless changed by a directive.
  pub escape: char,

  pub directives: Vec<ParserDirective>,

  /// Instructions preceding the first FROM. These should all be ARGs; others
  /// are kept here and reported as diagnostics.
  pub preamble: Vec<Node>,

  pub stages: Stages,

  /// Trivia after the last node.
  pub trailing: Span
}

impl Dockerfile {
  /// Parses a Dockerfile, discarding diagnostics.
  ///
  /// Parsing never fails: malformed instructions are kept as
  /// [`MiscInstruction`]s. Use [`Dockerfile::build`] to see what went wrong.
  pub fn parse(input: &str) -> Dockerfile {
    builder::build(input).0
  }

  /// Parses a Dockerfile, returning the tree along with any structural
  /// problems found.
  pub fn build(input: &str) -> (Dockerfile, Vec<Diagnostic>) {
    builder::build(input)
  }

  pub fn from_reader<R>(reader: R) -> Result<(Dockerfile, Vec<Diagnostic>)>
  where
    R: Read
  {
    let mut buf = String::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader.read_to_string(&mut buf).context(ReadError)?;

    Ok(Dockerfile::build(&buf))
  }

  /// Returns the value of a parser directive, if given.
  pub fn directive(&self, name: &str) -> Option<&str> {
    self.directives.iter()
      .find(|d| d.name.content.eq_ignore_ascii_case(name))
      .map(|d| d.value.as_ref())
  }

  /// Returns the ARG instructions preceding the first FROM.
  pub fn global_args(&self) -> impl Iterator<Item = &ArgInstruction> {
    self.preamble.iter().filter_map(|n| n.instruction().as_arg())
  }

  /// Returns all nodes in document order.
  pub fn nodes(&self) -> impl Iterator<Item = &Node> {
    self.preamble.iter()
      .chain(self.stages.iter().flat_map(|s| s.instructions.iter()))
  }

  /// Returns all instructions in document order.
  pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
    self.nodes().map(Node::instruction)
  }

  /// Resolves variable scopes with no build arguments.
  pub fn resolve_scopes(&self) -> Scopes {
    scope::resolve_scopes(self)
  }

  pub fn resolve_scopes_with(&self, options: &ScopeOptions) -> Scopes {
    scope::resolve_scopes_with(self, options)
  }

  /// Prints the Dockerfile, reproducing unmodified nodes exactly.
  pub fn print(&self) -> String {
    printer::print(self)
  }

  pub fn splicer(&self) -> Splicer {
    Splicer::from(self)
  }
}

impl FromStr for Dockerfile {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Dockerfile::parse(s))
  }
}

impl fmt::Display for Dockerfile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&printer::print(self))
  }
}
