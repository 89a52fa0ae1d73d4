// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

use crate::dockerfile::Instruction;
use crate::error::*;
use crate::parser::{Rule, Source};
use crate::splicer::Span;

/// Parses a string into a single instruction using a particular syntax rule.
///
/// Trailing whitespace is excluded the same way the source reader excludes
/// it from an instruction, so multi-line `indoc!` inputs work as expected.
pub fn parse_single(input: &str, rule: Rule) -> Result<Instruction> {
  let source = Source::new(input, input, '\\');
  let (record, source) = source.parse(rule, Span::new(0, input.trim_end().len()))?;

  Instruction::from_record(record, &source)
}
