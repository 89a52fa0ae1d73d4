// (C) Copyright 2019-2021 Hewlett Packard Enterprise Development LP

#![allow(dead_code)]

use dockerfile_ast::*;

pub fn strings(strs: &[&str]) -> Vec<String> {
  strs.iter().map(|s| String::from(*s)).collect()
}

/// Returns the key/value pairs of an ENV or LABEL as plain strings.
pub fn pairs(pairs: &[KeyValuePair]) -> Vec<(String, String)> {
  pairs.iter()
    .map(|p| (p.key.content.clone(), p.value.content.clone()))
    .collect()
}

/// Returns the continuation-joined text of a shell-form command.
pub fn shell(expr: &ShellOrExecExpr) -> Option<String> {
  expr.as_shell().map(|s| s.to_string())
}

/// Returns the elements of an exec-form command.
pub fn exec(expr: &ShellOrExecExpr) -> Option<Vec<String>> {
  expr.as_exec().map(|a| a.elements.iter().map(|e| e.content.clone()).collect())
}

pub fn kinds(diagnostics: &[Diagnostic]) -> Vec<DiagnosticKind> {
  diagnostics.iter().map(|d| d.kind).collect()
}

/// Parses and prints a Dockerfile.
pub fn reprint(input: &str) -> String {
  Dockerfile::parse(input).to_string()
}
