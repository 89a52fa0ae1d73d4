// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

//! Dockerfile word processing: quote removal, escapes, and `$VAR` expansion.

use crate::util::SpannedString;

/// The value of a variable as seen by a lookup.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum VarValue {
  /// The variable is bound to a value.
  Set(String),

  /// The variable is declared (e.g. `ARG FOO` with no default) but has no
  /// value. It expands to the empty string and counts as unset.
  Declared,

  /// The variable is not in scope.
  Undefined
}

/// How quotes in the processed text are treated.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Quoting {
  /// Quotes are removed and escapes applied, as for ENV values or paths.
  Word,

  /// The text is kept as written and only variables are replaced, as for a
  /// shell-form command.
  Shell
}

/// A single-pass word processor.
///
/// Without a lookup, `$` has no special meaning and only quoting and escapes
/// are processed.
pub(crate) struct WordProcessor<'a> {
  escape: char,
  quoting: Quoting,
  lookup: Option<&'a dyn Fn(&str) -> VarValue>,

  /// Names of all variables referenced, in order of first use.
  pub referenced: Vec<String>,

  /// Names of referenced variables that were not in scope and had no default.
  pub undefined: Vec<String>
}

fn push_unique(list: &mut Vec<String>, name: &str) {
  if !list.iter().any(|n| n == name) {
    list.push(name.to_string());
  }
}

fn is_name_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> WordProcessor<'a> {
  pub fn new(escape: char, quoting: Quoting) -> WordProcessor<'a> {
    WordProcessor {
      escape,
      quoting,
      lookup: None,
      referenced: Vec::new(),
      undefined: Vec::new()
    }
  }

  pub fn with_lookup(mut self, lookup: &'a dyn Fn(&str) -> VarValue) -> Self {
    self.lookup = Some(lookup);
    self
  }

  pub fn process(&mut self, s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_double = false;
    let mut i = 0;

    while i < chars.len() {
      let c = chars[i];

      if c == self.escape {
        if let Some(next) = line_break_end(&chars, i + 1) {
          i = next;
          continue;
        }

        match chars.get(i + 1) {
          Some(&n) => {
            match self.quoting {
              Quoting::Shell => {
                out.push(c);
                out.push(n);
              },
              Quoting::Word => {
                // inside double quotes only a few characters are escapable
                if in_double && n != '"' && n != '$' && n != self.escape {
                  out.push(c);
                }
                out.push(n);
              }
            }
            i += 2;
          },
          None => {
            out.push(c);
            i += 1;
          }
        }

        continue;
      }

      if c == '\'' && !in_double {
        let close = chars[i + 1..].iter().position(|&c| c == '\'').map(|p| p + i + 1);
        let end = close.unwrap_or(chars.len());

        if self.quoting == Quoting::Shell {
          out.extend(&chars[i..close.map(|c| c + 1).unwrap_or(end)]);
        } else {
          out.extend(&chars[i + 1..end]);
        }

        i = close.map(|c| c + 1).unwrap_or(end);
        continue;
      }

      if c == '"' {
        in_double = !in_double;
        if self.quoting == Quoting::Shell {
          out.push(c);
        }

        i += 1;
        continue;
      }

      if c == '$' && self.lookup.is_some() {
        if let Some((value, next)) = self.variable(&chars, i) {
          out.push_str(&value);
          i = next;
          continue;
        }
      }

      out.push(c);
      i += 1;
    }

    out
  }

  fn lookup(&mut self, name: &str) -> VarValue {
    push_unique(&mut self.referenced, name);

    match self.lookup {
      Some(lookup) => lookup(name),
      None => VarValue::Undefined
    }
  }

  /// Expands a plain reference, recording it as undefined if needed.
  fn resolve(&mut self, name: &str) -> String {
    match self.lookup(name) {
      VarValue::Set(value) => value,
      VarValue::Declared => String::new(),
      VarValue::Undefined => {
        push_unique(&mut self.undefined, name);
        String::new()
      }
    }
  }

  /// Parses the variable reference starting at the `$` at `start`. Returns the
  /// expansion and the index just past the reference, or None if this `$`
  /// does not start a reference.
  fn variable(&mut self, chars: &[char], start: usize) -> Option<(String, usize)> {
    let first = *chars.get(start + 1)?;

    if first != '{' {
      if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
      }

      let end = chars[start + 1..].iter()
        .position(|&c| !is_name_char(c))
        .map(|p| p + start + 1)
        .unwrap_or(chars.len());

      let name: String = chars[start + 1..end].iter().collect();
      return Some((self.resolve(&name), end));
    }

    let name_start = start + 2;
    let name_end = chars[name_start..].iter()
      .position(|&c| !is_name_char(c))
      .map(|p| p + name_start)?;

    if name_end == name_start {
      return None;
    }

    let name: String = chars[name_start..name_end].iter().collect();

    let (colon, op, word_start) = match (chars.get(name_end), chars.get(name_end + 1)) {
      (Some('}'), _) => return Some((self.resolve(&name), name_end + 1)),
      (Some(':'), Some(&op)) if op == '-' || op == '+' => (true, op, name_end + 2),
      (Some(&op), _) if op == '-' || op == '+' => (false, op, name_end + 1),
      _ => return None
    };

    let word_end = closing_brace(chars, word_start)?;
    let word: String = chars[word_start..word_end].iter().collect();

    let value = match self.lookup(&name) {
      VarValue::Set(value) => Some(value),
      _ => None
    };

    let is_set = if colon {
      value.as_ref().map(|v| !v.is_empty()).unwrap_or(false)
    } else {
      value.is_some()
    };

    let expansion = match (op, is_set) {
      ('-', true) => value.unwrap_or_default(),
      ('-', false) => self.process(&word),
      (_, true) => self.process(&word),
      (_, false) => String::new()
    };

    Some((expansion, word_end + 1))
  }
}

/// If an escaped line break starts at `start` (optional spaces or tabs, an
/// optional `\r`, then `\n`), returns the index just past it.
fn line_break_end(chars: &[char], start: usize) -> Option<usize> {
  let mut i = start;
  while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
    i += 1;
  }

  if chars.get(i) == Some(&'\r') {
    i += 1;
  }

  if chars.get(i) == Some(&'\n') {
    Some(i + 1)
  } else {
    None
  }
}

/// Finds the `}` closing a `${...}` word, honoring nested references.
fn closing_brace(chars: &[char], start: usize) -> Option<usize> {
  let mut depth = 0;
  let mut i = start;

  while i < chars.len() {
    match chars[i] {
      '$' if chars.get(i + 1) == Some(&'{') => {
        depth += 1;
        i += 2;
        continue;
      },
      '}' if depth == 0 => return Some(i),
      '}' => depth -= 1,
      _ => ()
    }

    i += 1;
  }

  None
}

/// Applies Dockerfile quoting rules to a raw word without expanding
/// variables.
pub(crate) fn decode_word(raw: &str, escape: char) -> String {
  WordProcessor::new(escape, Quoting::Word).process(raw)
}

/// Quotes a value for canonical output if it would not survive as a bare
/// word. A quoted `$` stays literal.
pub(crate) fn quote_word(value: &str, escape: char) -> String {
  let needs_quotes = value.is_empty() || value.chars().any(|c| {
    c.is_whitespace() || c == '"' || c == '\'' || c == '$' || c == escape
  });

  if !needs_quotes {
    return value.to_string();
  }

  let mut out = String::with_capacity(value.len() + 2);
  out.push('"');
  for c in value.chars() {
    if c == '"' || c == '$' || c == escape {
      out.push(escape);
    }
    out.push(c);
  }
  out.push('"');

  out
}

/// Returns true if `raw` has no whitespace or line continuation outside of
/// quotes or escapes.
fn is_single_word(raw: &str, escape: char) -> bool {
  let mut chars = raw.chars();
  let mut quote = None;

  while let Some(c) = chars.next() {
    match quote {
      Some('\'') if c == '\'' => quote = None,
      Some('\'') => {},
      _ if c == escape => {
        if matches!(chars.next(), Some('\n') | Some('\r')) {
          return false;
        }
      },
      Some(_) if c == '"' => quote = None,
      Some(_) => {},
      None if c == '"' || c == '\'' => quote = Some(c),
      None if c.is_whitespace() => return false,
      None => {}
    }
  }

  true
}

/// Returns the text a word was written as, as long as it still decodes to
/// the word's content.
pub(crate) fn source_text<'a>(word: &SpannedString, content: &'a str, escape: char) -> Option<&'a str> {
  if word.span.is_empty() {
    return None;
  }

  let raw = word.span.slice(content);
  if !raw.is_empty() && decode_word(raw, escape) == word.content {
    Some(raw)
  } else {
    None
  }
}

/// Returns the text to print for a word: its original text if unchanged and
/// still a single word, otherwise its content quoted as a literal.
pub(crate) fn word_text(word: &SpannedString, content: &str, escape: char) -> String {
  match source_text(word, content, escape) {
    Some(raw) if is_single_word(raw, escape) => raw.to_string(),
    _ => quote_word(&word.content, escape)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::splicer::Span;

  fn vars(name: &str) -> VarValue {
    match name {
      "foo" => VarValue::Set("bar".into()),
      "empty" => VarValue::Set("".into()),
      "declared" => VarValue::Declared,
      _ => VarValue::Undefined
    }
  }

  fn expand(s: &str) -> (String, Vec<String>) {
    let lookup = vars;
    let mut p = WordProcessor::new('\\', Quoting::Word).with_lookup(&lookup);
    let out = p.process(s);
    (out, p.undefined)
  }

  #[test]
  fn test_decode() {
    assert_eq!(decode_word("foo", '\\'), "foo");
    assert_eq!(decode_word(r#""hello world""#, '\\'), "hello world");
    assert_eq!(decode_word(r#""bar\"baz""#, '\\'), "bar\"baz");
    assert_eq!(decode_word(r#""a\nb""#, '\\'), r"a\nb");
    assert_eq!(decode_word("'$foo \\ x'", '\\'), "$foo \\ x");
    assert_eq!(decode_word(r"hello\ world", '\\'), "hello world");
    assert_eq!(decode_word("a\"b c\"d", '\\'), "ab cd");
    assert_eq!(decode_word("\"bar\\\n   baz\"", '\\'), "bar   baz");
    assert_eq!(decode_word("C:\\path `\"x`\"", '`'), "C:\\path \"x\"");
    assert_eq!(decode_word("$foo", '\\'), "$foo");
  }

  #[test]
  fn test_expand_basic() {
    assert_eq!(expand("hello $foo"), ("hello bar".into(), vec![]));
    assert_eq!(expand("hello ${foo}!"), ("hello bar!".into(), vec![]));
    assert_eq!(expand("$foo$foo"), ("barbar".into(), vec![]));
    assert_eq!(expand("a $nope b"), ("a  b".into(), vec!["nope".to_string()]));
    assert_eq!(expand("$declared"), ("".into(), vec![]));
    assert_eq!(expand("cost: $5"), ("cost: $5".into(), vec![]));
    assert_eq!(expand(r"\$foo"), ("$foo".into(), vec![]));
    assert_eq!(expand("'$foo'"), ("$foo".into(), vec![]));
    assert_eq!(expand("\"$foo\""), ("bar".into(), vec![]));
  }

  #[test]
  fn test_expand_modifiers() {
    assert_eq!(expand("${foo:-x}"), ("bar".into(), vec![]));
    assert_eq!(expand("${nope:-x}"), ("x".into(), vec![]));
    assert_eq!(expand("${empty:-x}"), ("x".into(), vec![]));
    assert_eq!(expand("${empty-x}"), ("".into(), vec![]));
    assert_eq!(expand("${declared-x}"), ("x".into(), vec![]));
    assert_eq!(expand("${foo:+alt}"), ("alt".into(), vec![]));
    assert_eq!(expand("${empty:+alt}"), ("".into(), vec![]));
    assert_eq!(expand("${empty+alt}"), ("alt".into(), vec![]));
    assert_eq!(expand("${nope:+alt}"), ("".into(), vec![]));
    assert_eq!(expand("${nope:-${foo}}"), ("bar".into(), vec![]));
    assert_eq!(
      expand("${nope:-$other}"),
      ("".into(), vec!["other".to_string()])
    );
  }

  #[test]
  fn test_expand_shell() {
    let lookup = vars;
    let mut p = WordProcessor::new('\\', Quoting::Shell).with_lookup(&lookup);
    assert_eq!(
      p.process(r#"echo "$foo" '$foo' \$foo $missing"#),
      r#"echo "bar" '$foo' \$foo "#
    );
    assert_eq!(p.referenced, vec!["foo".to_string(), "missing".to_string()]);
    assert_eq!(p.undefined, vec!["missing".to_string()]);
  }

  #[test]
  fn test_quote_word() {
    assert_eq!(quote_word("bar", '\\'), "bar");
    assert_eq!(quote_word("", '\\'), "\"\"");
    assert_eq!(quote_word("a b", '\\'), "\"a b\"");
    assert_eq!(quote_word("a\"b", '\\'), "\"a\\\"b\"");
    assert_eq!(decode_word(&quote_word("x \\ \"y\"", '\\'), '\\'), "x \\ \"y\"");

    assert_eq!(quote_word("$HOME", '\\'), "\"\\$HOME\"");
    assert_eq!(quote_word("C:\\dir", '`'), "C:\\dir");
    assert_eq!(quote_word("$A`", '`'), "\"`$A``\"");

    let lookup = |_: &str| VarValue::Set("/root".to_string());
    let quoted = quote_word("$HOME/${X}", '\\');
    let mut p = WordProcessor::new('\\', Quoting::Word).with_lookup(&lookup);
    assert_eq!(p.process(&quoted), "$HOME/${X}");
    assert!(p.referenced.is_empty());
  }

  #[test]
  fn test_word_text() {
    let content = r#"ENV A='$HOME' B=x\ y C=plain"#;
    let word = |start, end| SpannedString {
      span: Span::new(start, end),
      content: decode_word(&content[start..end], '\\')
    };

    let single = word(6, 13);
    assert_eq!(single.content, "$HOME");
    assert_eq!(word_text(&single, content, '\\'), "'$HOME'");
    assert_eq!(source_text(&single, content, '\\'), Some("'$HOME'"));

    let escaped = word(16, 20);
    assert_eq!(escaped.content, "x y");
    assert_eq!(word_text(&escaped, content, '\\'), "x\\ y");

    let mut changed = word(23, 28);
    changed.content = "new $V".to_string();
    assert_eq!(source_text(&changed, content, '\\'), None);
    assert_eq!(word_text(&changed, content, '\\'), "\"new \\$V\"");

    let created = SpannedString { span: Span::default(), content: "a'b".to_string() };
    assert_eq!(word_text(&created, content, '\\'), "\"a'b\"");

    assert!(is_single_word("\"a b\"", '\\'));
    assert!(is_single_word("'a b'", '\\'));
    assert!(!is_single_word("hello big world", '\\'));
    assert!(is_single_word("x\\ y", '\\'));
    assert!(!is_single_word("a`  b", '`'));
    assert!(!is_single_word("a \\\n  b", '\\'));
  }
}
