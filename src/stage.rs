// (C) Copyright 2020-2021 Hewlett Packard Enterprise Development LP

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::dockerfile::{Instruction, Node};
use crate::image::ImageRef;
use crate::instructions::FromInstruction;

/// The parent image of a Docker build stage
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum StageParent {
  /// An externally-built image, potentially from a remote registry
  Image(ImageRef),

  /// An index of a previous stage within the current Dockerfile
  Stage(usize),

  /// The empty (scratch) parent image
  Scratch
}

impl fmt::Display for StageParent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StageParent::Image(image) => image.fmt(f),
      StageParent::Stage(index) => index.fmt(f),
      StageParent::Scratch => write!(f, "scratch")
    }
  }
}

/// A single stage in a [multi-stage build].
///
/// A stage begins with (and includes) a `FROM` instruction and continues until
/// (but does *not* include) the next `FROM` instruction, if any.
///
/// Stages have an index and an optional alias. Later `COPY --from=$index [...]`
/// instructions may copy files between unnamed build stages. The alias, if
/// defined in this stage's `FROM` instruction, may be used as well.
///
/// Note that instructions in a Dockerfile before the first `FROM` are kept in
/// [`Dockerfile::preamble`](crate::Dockerfile::preamble), not in the first
/// stage.
///
/// [multi-stage build]: https://docs.docker.com/develop/develop-images/multistage-build/
#[derive(Debug, Eq, Clone)]
pub struct Stage {
  /// The stage index.
  pub index: usize,

  /// The stage's FROM alias, if any, lowercased.
  pub name: Option<String>,

  /// An ordered list of nodes in this stage, starting with its `FROM`.
  pub instructions: Vec<Node>,

  /// The direct parent of this stage.
  ///
  /// If this is the first stage, it will be equal to the root stage.
  pub parent: StageParent,

  /// The root image of this stage, either an external reference (possibly from
  /// a remote registry) or `scratch`.
  pub root: StageParent
}

impl Ord for Stage {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    self.index.cmp(&other.index)
  }
}

impl PartialOrd for Stage {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for Stage {
  fn eq(&self, other: &Self) -> bool {
    self.index == other.index
  }
}

impl Stage {
  /// Returns this stage's `FROM` instruction.
  ///
  /// This is None only if the first node was replaced with something else.
  pub fn from(&self) -> Option<&FromInstruction> {
    self.instructions.first().and_then(|n| n.instruction().as_from())
  }

  /// Finds the index, relative to this stage, of an ARG instruction defining
  /// the given name. Only instructions following the ARG definition in a
  /// particular stage will have the value in scope, even if it was a defined
  /// globally or in a previous stage.
  pub fn arg_index(&self, name: &str) -> Option<usize> {
    self.instructions
      .iter()
      .enumerate()
      .find_map(|(i, node)| match node.instruction() {
        Instruction::Arg(a) if a.get(name).is_some() => Some(i),
        _ => None
      })
  }
}

/// A collection of stages in a [multi-stage build].
///
/// # Example
/// ```
/// use dockerfile_ast::Dockerfile;
///
/// let dockerfile = Dockerfile::parse(r#"
///   FROM alpine:3.12 as build
///   RUN echo "hello world" > /foo
///
///   FROM ubuntu:18.04
///   COPY --from=0 /foo /foo
/// "#);
///
/// for stage in dockerfile.stages.iter() {
///   println!("stage #{}, name: {:?}", stage.index, stage.name)
/// }
/// ```
///
/// [multi-stage build]: https://docs.docker.com/develop/develop-images/multistage-build/
#[derive(Debug, Clone, Default)]
pub struct Stages {
  stages: Vec<Stage>
}

impl Stages {
  pub(crate) fn push(&mut self, stage: Stage) {
    self.stages.push(stage);
  }

  pub(crate) fn last_mut(&mut self) -> Option<&mut Stage> {
    self.stages.last_mut()
  }

  /// Attempts to fetch a stage by its name (`FROM` alias).
  pub fn get_by_name(&self, name: &str) -> Option<&Stage> {
    let name = name.to_ascii_lowercase();
    self.stages.iter().find(|s| s.name.as_deref() == Some(name.as_str()))
  }

  /// Attempts to fetch a stage by its string representation.
  ///
  /// Stages with a valid integer value are retrieved by index, otherwise by
  /// name.
  pub fn get(&self, s: &str) -> Option<&Stage> {
    match s.parse::<usize>() {
      Ok(index) => self.stages.get(index),
      Err(_) => self.get_by_name(s)
    }
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  /// Returns an iterator over `stages`, wrapping the underlying `Vec::iter()`.
  pub fn iter(&self) -> std::slice::Iter<'_, Stage> {
    self.stages.iter()
  }

  pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Stage> {
    self.stages.iter_mut()
  }
}

impl Index<usize> for Stages {
  type Output = Stage;

  fn index(&self, index: usize) -> &Self::Output {
    &self.stages[index]
  }
}

impl IndexMut<usize> for Stages {
  fn index_mut(&mut self, index: usize) -> &mut Self::Output {
    &mut self.stages[index]
  }
}

impl<'a> IntoIterator for &'a Stages {
  type Item = &'a Stage;
  type IntoIter = std::slice::Iter<'a, Stage>;

  fn into_iter(self) -> Self::IntoIter {
    self.stages.iter()
  }
}

impl IntoIterator for Stages {
  type Item = Stage;
  type IntoIter = std::vec::IntoIter<Stage>;

  fn into_iter(self) -> Self::IntoIter {
    self.stages.into_iter()
  }
}

#[cfg(test)]
mod tests {
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::dockerfile::Dockerfile;

  #[test]
  fn test_stages() {
    let dockerfile = Dockerfile::parse(indoc!(r#"
      FROM alpine:3.12

      FROM ubuntu:18.04 as build
      RUN echo "hello world"

      FROM build as build2
      COPY /foo /bar
      COPY /bar /baz

      FROM build as build3
    "#));

    let stages = &dockerfile.stages;
    assert_eq!(stages.len(), 4);

    assert_eq!(stages[0].parent, StageParent::Image(ImageRef::parse("alpine:3.12")));
    assert_eq!(stages[0].name, None);

    assert_eq!(stages[1].name, Some("build".into()));
    assert_eq!(stages[1].instructions.len(), 2);
    assert_eq!(stages[1].parent, StageParent::Image(ImageRef::parse("ubuntu:18.04")));
    assert_eq!(stages[1].root, StageParent::Image(ImageRef::parse("ubuntu:18.04")));

    assert_eq!(stages[2].name, Some("build2".into()));
    assert_eq!(stages[2].instructions.len(), 3);
    assert_eq!(stages[2].parent, StageParent::Stage(1));
    assert_eq!(stages[2].root, StageParent::Image(ImageRef::parse("ubuntu:18.04")));

    assert_eq!(stages[3].instructions.len(), 1);
    assert_eq!(stages[3].parent, StageParent::Stage(2));
    assert_eq!(stages[3].root, StageParent::Image(ImageRef::parse("ubuntu:18.04")));
    assert_eq!(stages[3].from().map(|f| f.index), Some(3));
  }

  #[test]
  fn test_stages_get() {
    let dockerfile = Dockerfile::parse(indoc!(r#"
      FROM alpine:3.12

      FROM ubuntu:18.04 as Build

      FROM build as build2
      FROM scratch
    "#));

    let stages = &dockerfile.stages;
    assert_eq!(stages.get("0").unwrap().index, 0);
    assert_eq!(stages.get("1"), stages.get("BUILD"));
    assert_eq!(stages.get("2"), stages.get("build2"));
    assert_eq!(stages.get("9"), None);
    assert_eq!(stages[3].root, StageParent::Scratch);
    assert_eq!(stages[3].root.to_string(), "scratch");
  }

  #[test]
  fn test_stages_numeric_parent() {
    let dockerfile = Dockerfile::parse(indoc!(r#"
      FROM alpine:3.12
      FROM 0
    "#));

    assert_eq!(dockerfile.stages[1].parent, StageParent::Stage(0));
    assert_eq!(
      dockerfile.stages[1].root,
      StageParent::Image(ImageRef::parse("alpine:3.12"))
    );
  }

  #[test]
  fn test_arg_index() {
    let dockerfile = Dockerfile::parse(indoc!(r#"
      ARG VERSION=1
      FROM alpine
      RUN true
      ARG VERSION
      ARG OTHER=2
    "#));

    let stage = &dockerfile.stages[0];
    assert_eq!(stage.arg_index("VERSION"), Some(2));
    assert_eq!(stage.arg_index("OTHER"), Some(3));
    assert_eq!(stage.arg_index("MISSING"), None);
  }
}
