//! PHP source files that `return` an array literal.
//!
//! This is a compatibility format for settings files consumed by PHP code
//! via `$settings = require 'settings.php';`. Files are never executed here.
//! Reading uses a parser for the literal subset of PHP:
//!
//! ```text
//! file    := "<?php" return expr ";" ["?>"]
//! expr    := array | string | number | true | false | null
//! array   := "[" entries "]" | "array" "(" entries ")"
//! entries := [entry ("," entry)* [","]]
//! entry   := expr "=>" expr | expr
//! ```
//!
//! Strings may be single- or double-quoted (interpolation is refused).
//! Comments (`//`, `#`, `/* */`) are skipped.
//!
//! PHP has a single array type, so written files keep mappings and lists
//! apart by spelling: mappings always use quoted string keys, lists use
//! positional entries, and an empty mapping is written `array()` while an
//! empty list is written `[]`. Reading applies the same rule: an array whose
//! keys are exactly `0..n` in order is a list.

use indexmap::IndexMap;

use crate::codec::{Codec, MAX_DEPTH, document_root};
use crate::error::StoreError;
use crate::format::Format;
use crate::value::{Map, Value};

const OPEN_TAG: &str = "<?php";
const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, Default)]
pub struct PhpCodec;

impl Codec for PhpCodec {
    fn format(&self) -> Format {
        Format::Php
    }

    fn serialize(&self, tree: &Map) -> Result<String, StoreError> {
        let mut out = String::from("<?php\n\nreturn ");
        write_map(&mut out, tree, 0);
        out.push_str(";\n");
        Ok(out)
    }

    fn deserialize(&self, text: &str) -> Result<Map, StoreError> {
        // Empty content is never handed to the parser.
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        let value = Parser::new(text).document()?;
        if !matches!(value, Value::Map(_) | Value::Seq(_)) {
            return Err(StoreError::NotAMappingDocument {
                format: Format::Php,
            });
        }
        document_root(Format::Php, value)
    }
}

// --- Writing ---

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(i) => out.push_str(&i.to_string()),
        // Debug keeps the fraction on whole numbers: `2.0`, not `2`.
        Value::Float(f) => out.push_str(&format!("{f:?}")),
        Value::String(s) => write_string(out, s),
        Value::Map(map) => write_map(out, map, depth),
        Value::Seq(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push_str("[\n");
            for item in items {
                indent(out, depth + 1);
                write_value(out, item, depth + 1);
                out.push_str(",\n");
            }
            indent(out, depth);
            out.push(']');
        }
    }
}

fn write_map(out: &mut String, map: &Map, depth: usize) {
    if map.is_empty() {
        out.push_str("array()");
        return;
    }
    out.push_str("[\n");
    for (key, value) in map {
        indent(out, depth + 1);
        write_string(out, key);
        out.push_str(" => ");
        write_value(out, value, depth + 1);
        out.push_str(",\n");
    }
    indent(out, depth);
    out.push(']');
}

fn write_string(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        if matches!(c, '\\' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

// --- Reading ---

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ArrayKey {
    Index(i64),
    Name(String),
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn document(&mut self) -> Result<Value, StoreError> {
        self.skip_whitespace();
        if !self.eat_keyword(OPEN_TAG) {
            return Err(self.error("expected `<?php` open tag"));
        }
        self.skip_trivia();
        if !self.eat_keyword("return") {
            return Err(self.error("expected `return`"));
        }
        let value = self.expr()?;
        self.skip_trivia();
        self.expect(';')?;
        self.skip_trivia();
        if self.rest().starts_with("?>") {
            self.pos += 2;
            self.skip_trivia();
        }
        if !self.rest().is_empty() {
            return Err(self.error("unexpected content after the returned value"));
        }
        Ok(value)
    }

    fn expr(&mut self) -> Result<Value, StoreError> {
        self.skip_trivia();
        match self.peek() {
            Some('[') => {
                self.pos += 1;
                self.array(']', false)
            }
            Some('\'') => self.single_quoted().map(Value::String),
            Some('"') => self.double_quoted().map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let word = self.identifier();
                match word.to_ascii_lowercase().as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    "array" => {
                        self.skip_trivia();
                        self.expect('(')?;
                        self.array(')', true)
                    }
                    _ => Err(self.error(&format!("unsupported expression `{word}`"))),
                }
            }
            Some(c) => Err(self.error(&format!("unexpected `{c}`"))),
            None => Err(self.error("unexpected end of file")),
        }
    }

    /// Parse array entries up to `close`. `long_form` marks `array(...)`,
    /// which is how an empty mapping is spelled.
    fn array(&mut self, close: char, long_form: bool) -> Result<Value, StoreError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let array = self.array_entries(close, long_form);
        self.depth -= 1;
        array
    }

    fn array_entries(&mut self, close: char, long_form: bool) -> Result<Value, StoreError> {
        let mut entries: IndexMap<ArrayKey, Value> = IndexMap::new();
        let mut next_index: i64 = 0;

        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }
            let first = self.expr()?;
            self.skip_trivia();
            let (key, value) = if self.rest().starts_with("=>") {
                self.pos += 2;
                (self.array_key(first)?, self.expr()?)
            } else {
                (ArrayKey::Index(next_index), first)
            };
            if let ArrayKey::Index(i) = key
                && i >= next_index
            {
                next_index = i.saturating_add(1);
            }
            entries.insert(key, value);

            self.skip_trivia();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error(&format!("expected `,` or `{close}`"))),
            }
        }

        if entries.is_empty() {
            return Ok(if long_form {
                Value::Map(Map::new())
            } else {
                Value::Seq(Vec::new())
            });
        }

        let is_list = entries
            .keys()
            .enumerate()
            .all(|(pos, key)| matches!(key, ArrayKey::Index(i) if usize::try_from(*i) == Ok(pos)));
        if is_list {
            return Ok(Value::Seq(entries.into_values().collect()));
        }

        Ok(Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| {
                    let key = match key {
                        ArrayKey::Index(i) => i.to_string(),
                        ArrayKey::Name(s) => s,
                    };
                    (key, value)
                })
                .collect(),
        ))
    }

    /// Apply PHP's key casts. Quoted keys stay names even when numeric, so
    /// a mapping with keys "0", "1" survives a round trip.
    fn array_key(&self, key: Value) -> Result<ArrayKey, StoreError> {
        match key {
            Value::Int(i) => Ok(ArrayKey::Index(i)),
            Value::String(s) => Ok(ArrayKey::Name(s)),
            Value::Bool(b) => Ok(ArrayKey::Index(i64::from(b))),
            Value::Float(f) => Ok(ArrayKey::Index(f.trunc() as i64)),
            Value::Null => Ok(ArrayKey::Name(String::new())),
            Value::Map(_) | Value::Seq(_) => Err(self.error("arrays cannot be used as keys")),
        }
    }

    fn single_quoted(&mut self) -> Result<String, StoreError> {
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\'' => {
                    self.pos += i + 1;
                    return Ok(out);
                }
                '\\' => match chars.clone().next() {
                    Some((_, next @ ('\\' | '\''))) => {
                        chars.next();
                        out.push(next);
                    }
                    _ => out.push('\\'),
                },
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn double_quoted(&mut self) -> Result<String, StoreError> {
        self.pos += 1;
        let start = self.pos;
        let mut out = String::new();
        let mut chars = self.rest().char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos = start + i + 1;
                    return Ok(out);
                }
                '$' if chars
                    .peek()
                    .is_some_and(|(_, n)| n.is_ascii_alphabetic() || matches!(n, '_' | '{')) =>
                {
                    self.pos = start + i;
                    return Err(self.error("string interpolation is not supported"));
                }
                '\\' => {
                    let Some((_, esc)) = chars.next() else {
                        break;
                    };
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'v' => out.push('\x0b'),
                        'e' => out.push('\x1b'),
                        'f' => out.push('\x0c'),
                        '0' => out.push('\0'),
                        '\\' | '$' | '"' => out.push(esc),
                        'u' if chars.peek().is_some_and(|(_, n)| *n == '{') => {
                            chars.next();
                            let mut hex = String::new();
                            for (_, h) in chars.by_ref() {
                                if h == '}' {
                                    break;
                                }
                                hex.push(h);
                            }
                            let ch = u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| {
                                    self.error(&format!("invalid unicode escape `\\u{{{hex}}}`"))
                                })?;
                            out.push(ch);
                        }
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn number(&mut self) -> Result<Value, StoreError> {
        let rest = self.rest();
        let mut end = 0;
        let mut is_float = false;
        let bytes = rest.as_bytes();

        if matches!(bytes.first(), Some(b'-' | b'+')) {
            end += 1;
        }
        let digits_start = end;
        if rest[end..].starts_with("0x") || rest[end..].starts_with("0X") {
            end = scan_digits(bytes, end + 2, u8::is_ascii_hexdigit);
            let digits: String = rest[digits_start + 2..end]
                .chars()
                .filter(|c| *c != '_')
                .collect();
            // Keep the sign on the digits so i64::MIN parses.
            let signed = format!("{}{digits}", &rest[..digits_start]);
            let value = i64::from_str_radix(&signed, 16)
                .map_err(|_| self.error(&format!("invalid hex literal `{}`", &rest[..end])))?;
            self.pos += end;
            return Ok(Value::Int(value));
        }

        end = scan_digits(bytes, end, u8::is_ascii_digit);
        if end < bytes.len() && bytes[end] == b'.' {
            is_float = true;
            end = scan_digits(bytes, end + 1, u8::is_ascii_digit);
        }
        if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
            let mut exp_end = end + 1;
            if exp_end < bytes.len() && matches!(bytes[exp_end], b'-' | b'+') {
                exp_end += 1;
            }
            if exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
                is_float = true;
                end = exp_end;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
            }
        }

        let literal: String = rest[..end].chars().filter(|c| *c != '_').collect();
        if end == digits_start || literal.trim_start_matches(['-', '+']) == "." {
            return Err(self.error("expected a number"));
        }
        self.pos += end;

        // Integer literals too large for i64 are floats in PHP as well.
        if !is_float && let Ok(i) = literal.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        literal
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| self.error(&format!("invalid number `{literal}`")))
    }

    fn identifier(&mut self) -> &'a str {
        let rest = &self.src[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.rest();
        let Some(head) = rest.get(..keyword.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(keyword) {
            return false;
        }
        let bounded = rest[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
        if bounded {
            self.pos += keyword.len();
        }
        bounded
    }

    fn expect(&mut self, c: char) -> Result<(), StoreError> {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected `{c}`")))
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("//") || (rest.starts_with('#') && !rest.starts_with("#[")) {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                self.pos += rest.find("*/").map_or(rest.len(), |i| i + 2);
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, reason: &str) -> StoreError {
        let consumed = &self.src[..self.pos];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rfind('\n')
            .map_or(consumed.len(), |i| consumed.len() - i - 1)
            + 1;
        StoreError::parse(
            Format::Php,
            format!("{reason} at line {line}, column {column}"),
        )
    }
}

/// Advance over a run of digits starting at `end`. An `_` is consumed only
/// between two digits.
fn scan_digits(bytes: &[u8], mut end: usize, is_digit: fn(&u8) -> bool) -> usize {
    while let Some(b) = bytes.get(end) {
        if is_digit(b) {
            end += 1;
        } else if *b == b'_'
            && end > 0
            && is_digit(&bytes[end - 1])
            && bytes.get(end + 1).is_some_and(is_digit)
        {
            end += 2;
        } else {
            break;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parse(text: &str) -> Result<Map, StoreError> {
        PhpCodec.deserialize(text)
    }

    #[test]
    fn writes_short_array_syntax() {
        let mut map = Map::new();
        map.insert("name".into(), Value::from("it's"));
        map.insert("list".into(), Value::from(vec![1, 2]));
        map.insert("none".into(), Value::Map(Map::new()));
        let text = PhpCodec.serialize(&map).unwrap();
        assert_eq!(
            text,
            "<?php\n\nreturn [\n    'name' => 'it\\'s',\n    'list' => [\n        1,\n        2,\n    ],\n    'none' => array(),\n];\n"
        );
    }

    #[test]
    fn empty_tree_is_an_empty_array() {
        let text = PhpCodec.serialize(&Map::new()).unwrap();
        assert_eq!(text, "<?php\n\nreturn array();\n");
        assert!(parse(&text).unwrap().is_empty());
    }

    #[test]
    fn reads_long_array_syntax_and_comments() {
        let text = r#"<?php
            // generated settings
            return array(
                'debug' => FALSE, # trailing comment
                "host" => "db\tlocal",
                /* block */ 'ports' => array(80, 443),
                'ratio' => 1.5e2,
                'hex' => 0x1F,
            );
        "#;
        let map = parse(text).unwrap();
        assert_eq!(map["debug"], Value::Bool(false));
        assert_eq!(map["host"], Value::from("db\tlocal"));
        assert_eq!(map["ports"], Value::from(vec![80, 443]));
        assert_eq!(map["ratio"], Value::Float(150.0));
        assert_eq!(map["hex"], Value::Int(31));
    }

    #[test]
    fn explicit_sequential_indices_are_a_list() {
        let map = parse("<?php return ['a' => [0 => 'x', 1 => 'y']];").unwrap();
        assert_eq!(map["a"], Value::from(vec!["x", "y"]));
    }

    #[test]
    fn sparse_indices_are_a_mapping() {
        let map = parse("<?php return ['a' => [1 => 'x', 5 => 'y']];").unwrap();
        let inner = map["a"].as_map().unwrap();
        assert_eq!(inner["1"], Value::from("x"));
        assert_eq!(inner["5"], Value::from("y"));
    }

    #[test]
    fn quoted_numeric_keys_stay_a_mapping() {
        let mut inner = Map::new();
        inner.insert("0".into(), Value::from("zero"));
        inner.insert("1".into(), Value::from("one"));
        let mut map = Map::new();
        map.insert("m".into(), Value::Map(inner));

        let text = PhpCodec.serialize(&map).unwrap();
        assert_eq!(parse(&text).unwrap(), map);
    }

    #[test]
    fn closing_tag_is_allowed() {
        let map = parse("<?php return ['a' => 1]; ?>\n").unwrap();
        assert_eq!(map["a"], Value::Int(1));
    }

    #[test]
    fn non_array_return_is_rejected() {
        let err = parse("<?php return 42;").unwrap_err();
        assert!(matches!(err, StoreError::NotAMappingDocument { .. }));
        assert_eq!(err.to_string(), "php content does not return a mapping");

        assert!(matches!(
            parse("<?php return null;").unwrap_err(),
            StoreError::NotAMappingDocument { .. }
        ));
    }

    #[test]
    fn code_is_not_evaluated() {
        let err = parse("<?php return ['a' => exec('rm -rf /')];").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("unsupported expression `exec`"));
    }

    #[test]
    fn interpolation_is_refused() {
        let err = parse(r#"<?php return ['a' => "hi $name"];"#).unwrap_err();
        assert!(err.to_string().contains("interpolation"));
    }

    #[test]
    fn missing_open_tag_is_an_error() {
        assert!(parse("return [];").is_err());
    }

    #[test]
    fn missing_semicolon_reports_position() {
        let err = parse("<?php\nreturn ['a' => 1]").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn integer_overflow_becomes_float() {
        let map = parse("<?php return ['n' => 99999999999999999999];").unwrap();
        assert!(matches!(map["n"], Value::Float(_)));
    }

    #[test]
    fn negative_numbers() {
        let map = parse("<?php return ['i' => -5, 'f' => -0.25];").unwrap();
        assert_eq!(map["i"], Value::Int(-5));
        assert_eq!(map["f"], Value::Float(-0.25));
    }

    #[test]
    fn whitespace_only_file_is_not_parsed() {
        assert!(parse("\n\n   \n").unwrap().is_empty());
    }

    #[test]
    fn hex_literals_cover_the_full_range() {
        let map = parse("<?php return ['min' => -0x8000000000000000, 'max' => 0x7FFF_FFFF_FFFF_FFFF];")
            .unwrap();
        assert_eq!(map["min"], Value::Int(i64::MIN));
        assert_eq!(map["max"], Value::Int(i64::MAX));
        assert!(parse("<?php return ['n' => 0x8000000000000000];").is_err());
    }

    #[test]
    fn digit_separators_must_sit_between_digits() {
        let map = parse("<?php return ['n' => 1_000, 'f' => 1_0.2_5];").unwrap();
        assert_eq!(map["n"], Value::Int(1000));
        assert_eq!(map["f"], Value::Float(10.25));

        for bad in ["1_", "1__0", "0x_1", "1_.5"] {
            let text = format!("<?php return ['n' => {bad}];");
            assert!(parse(&text).is_err(), "{bad}");
        }
    }

    #[test]
    fn deep_nesting_is_a_format_error() {
        let depth = 5000;
        let text = format!(
            "<?php return ['a' => {}{}];",
            "[".repeat(depth),
            "]".repeat(depth)
        );
        let err = parse(&text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("nesting too deep"));
    }

    #[test]
    fn nesting_up_to_the_limit_is_accepted() {
        // The returned array is the first level.
        let inner = MAX_DEPTH - 1;
        let text = format!(
            "<?php return ['a' => {}{}];",
            "[".repeat(inner),
            "]".repeat(inner)
        );
        assert!(parse(&text).is_ok());

        let text = format!(
            "<?php return ['a' => {}{}];",
            "[".repeat(inner + 1),
            "]".repeat(inner + 1)
        );
        assert!(parse(&text).is_err());
    }
}
