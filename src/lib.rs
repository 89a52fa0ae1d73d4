// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

#![forbid(unsafe_code)]

//! # Round-trip Dockerfile syntax trees
//!
//! A pure Rust library for parsing Dockerfiles into a syntax tree that keeps
//! every byte of the original formatting. Untouched files print back exactly
//! as they were read; edited instructions print in a canonical form. It also
//! resolves `ARG` and `ENV` scoping the way a build would, which makes it
//! useful for linters, static analysis and automated rewriting tools.
//!
//! ## Quick start
//!
//! ```rust
//! use dockerfile_ast::*;
//!
//! let input = r#"
//!   FROM alpine:3.11 as builder
//!   RUN echo "hello world" > /hello-world
//!
//!   FROM scratch
//!   COPY --from=builder /hello-world /hello-world
//! "#;
//!
//! let (mut dockerfile, diagnostics) = Dockerfile::build(input);
//! assert!(diagnostics.is_empty());
//! assert_eq!(dockerfile.to_string(), input);
//!
//! for stage in dockerfile.stages.iter() {
//!   println!("stage #{}", stage.index);
//!   for node in &stage.instructions {
//!     println!("  {:?}", node.instruction());
//!   }
//! }
//!
//! if let Instruction::From(from) = dockerfile.stages[0].instructions[0].instruction_mut() {
//!   from.set_image("alpine:3.12");
//! }
//!
//! assert!(dockerfile.to_string().contains("FROM alpine:3.12 AS builder"));
//! ```

#[macro_use] extern crate pest_derive;

mod error;
mod parser;
mod util;
mod word;
mod source;
mod diagnostic;
mod image;
mod instructions;
mod splicer;
mod stage;
mod dockerfile;
mod builder;
mod scope;
mod printer;

pub use diagnostic::*;
pub use dockerfile::*;
pub use error::*;
pub use image::*;
pub use instructions::*;
pub use parser::Rule;
pub use scope::*;
pub use splicer::*;
pub use stage::*;
pub use util::*;
pub use word::VarValue;

#[cfg(test)] mod test_util;
