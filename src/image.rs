// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use std::collections::HashSet;
use std::fmt;

use crate::dockerfile::Dockerfile;
use crate::scope::resolve_scopes;
use crate::word::{Quoting, VarValue, WordProcessor};

/// A parsed docker image reference
///
/// The `Display` impl may be used to convert a parsed image back to a plain
/// string:
/// ```
/// use dockerfile_ast::ImageRef;
///
/// let image = ImageRef::parse("alpine:3.11");
/// assert_eq!(image.registry, None);
/// assert_eq!(image.image, "alpine");
/// assert_eq!(image.tag, Some("3.11".to_string()));
/// assert_eq!(format!("{}", image), "alpine:3.11");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
  /// an optional registry, generally Docker Hub if unset
  pub registry: Option<String>,

  /// an image string, possibly including a user or organization name
  pub image: String,

  /// An optional image tag (after the colon, e.g. `:1.2.3`), generally inferred
  /// to mean `:latest` if unset
  pub tag: Option<String>,

  /// An optional embedded image hash, e.g. `sha256:...`. Conflicts with `tag`.
  pub hash: Option<String>
}

/// Whether the first path component of an image names a registry host.
///
/// Docker Hub namespaces look like hostnames without a dot or port, so only
/// `localhost` or a token with `.` or `:` counts.
fn is_registry(token: &str) -> bool {
  token == "localhost" || token.contains('.') || token.contains(':')
}

impl ImageRef {
  /// Parses an `ImageRef` from a string.
  ///
  /// Parsing never fails; unexpanded variable references and malformed names
  /// are split on the same separators as anything else, and `Display` puts
  /// them back together unchanged.
  pub fn parse(s: &str) -> ImageRef {
    let (registry, rest) = match s.split_once('/') {
      Some((host, rest)) if is_registry(host) => (Some(host.to_string()), rest),
      _ => (None, s)
    };

    // a digest takes precedence over a tag
    if let Some((image, hash)) = rest.split_once('@') {
      return ImageRef {
        registry,
        image: image.to_string(),
        tag: None,
        hash: Some(hash.to_string())
      };
    }

    let (image, tag) = match rest.split_once(':') {
      Some((image, tag)) => (image, Some(tag.to_string())),
      None => (rest, None)
    };

    ImageRef { registry, image: image.to_string(), tag, hash: None }
  }

  /// Given a Dockerfile (and its global `ARG`s), perform any necessary
  /// variable substitution to resolve any variable references in this
  /// `ImageRef` and returns a list of variables included in the end result.
  ///
  /// If this `ImageRef` references a variable that is not declared, or is
  /// declared without a value, returns None; otherwise, returns the
  /// fully-substituted image. Defaults given with `${name:-default}` are
  /// honored.
  pub fn resolve_vars_with_context(
    &self, dockerfile: &Dockerfile
  ) -> Option<(ImageRef, HashSet<String>)> {
    let global = resolve_scopes(dockerfile).global;

    // a declared variable with no value can't produce a useful image name
    let lookup = |name: &str| match global.lookup(name) {
      VarValue::Set(value) => VarValue::Set(value),
      _ => VarValue::Undefined
    };

    let mut processor = WordProcessor::new(dockerfile.escape, Quoting::Word)
      .with_lookup(&lookup);
    let resolved = processor.process(&self.to_string());

    if !processor.undefined.is_empty() {
      return None;
    }

    let used_vars = processor.referenced.into_iter()
      .filter(|name| global.value(name).is_some())
      .collect();

    Some((ImageRef::parse(&resolved), used_vars))
  }

  /// Given a Dockerfile (and its global `ARG`s), perform any necessary
  /// variable substitution to resolve any variable references in this
  /// `ImageRef`.
  ///
  /// If this `ImageRef` contains any unknown variables, returns None;
  /// otherwise, returns the fully-substituted image.
  pub fn resolve_vars(&self, dockerfile: &Dockerfile) -> Option<ImageRef> {
    self.resolve_vars_with_context(dockerfile).map(|(image, _vars)| image)
  }
}

impl fmt::Display for ImageRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(registry) = &self.registry {
      write!(f, "{}/", registry)?;
    }

    write!(f, "{}", self.image)?;

    if let Some(tag) = &self.tag {
      write!(f, ":{}", tag)?;
    } else if let Some(hash) = &self.hash {
      write!(f, "@{}", hash)?;
    }

    Ok(())
  }
}
