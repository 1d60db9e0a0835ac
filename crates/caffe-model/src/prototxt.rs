// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Protobuf text-format reader.
//!
//! Parses a `.prototxt` document into a [`serde_json::Value`] so the same
//! serde schema serves both the text and the JSON form of a description.
//!
//! Mapping rules:
//! - `field: value` and `field { ... }` become object members.
//! - A field that occurs more than once becomes an array, in order.
//! - `field: [a, b]` contributes each element, as if repeated.
//! - Bare identifiers are enum names (strings), except `true` / `false`.
//!
//! Since the schema is not known here, a repeated field that occurs only
//! once stays a scalar; the description types accept both.

use crate::ModelError;
use serde_json::{map::Entry, Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    Colon,
    Open(char),
    Close(char),
    OpenList,
    CloseList,
    Comma,
    Semi,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
    column: usize,
}

/// Parses a prototxt document into a JSON object.
pub fn parse(src: &str) -> Result<Value, ModelError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: end_position(src),
    };
    let root = parser.message(None)?;
    Ok(Value::Object(root))
}

fn end_position(src: &str) -> (usize, usize) {
    let line = src.lines().count().max(1);
    let column = src.lines().last().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}

fn syntax(line: usize, column: usize, detail: impl Into<String>) -> ModelError {
    ModelError::Syntax {
        line,
        column,
        detail: detail.into(),
    }
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl Cursor<'_> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if ch == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else if ch.is_some() {
            self.column += 1;
        }
        ch
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if !accept(c) {
                break;
            }
            s.push(c);
            self.bump();
        }
        s
    }
}

fn tokenize(src: &str) -> Result<Vec<Spanned>, ModelError> {
    let mut tokens = Vec::new();
    let mut cur = Cursor {
        chars: src.chars().peekable(),
        line: 1,
        column: 1,
    };

    while let Some(c) = cur.peek() {
        let (line, column) = (cur.line, cur.column);
        let token = match c {
            c if c.is_whitespace() => {
                cur.bump();
                continue;
            }
            '#' => {
                cur.take_while(|n| n != '\n');
                continue;
            }
            '"' | '\'' => {
                cur.bump();
                let mut s = String::new();
                loop {
                    match cur.bump() {
                        None | Some('\n') => return Err(syntax(line, column, "unterminated string")),
                        Some(q) if q == c => break,
                        Some('\\') => match cur.bump() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some('r') => s.push('\r'),
                            Some(other @ ('\\' | '"' | '\'')) => s.push(other),
                            other => {
                                return Err(syntax(
                                    cur.line,
                                    cur.column,
                                    format!("unsupported escape {other:?}"),
                                ))
                            }
                        },
                        Some(ch) => s.push(ch),
                    }
                }
                Token::Str(s)
            }
            c if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                Token::Number(cur.take_while(|n| n.is_ascii_alphanumeric() || matches!(n, '.' | '-' | '+')))
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                Token::Ident(cur.take_while(|n| n.is_ascii_alphanumeric() || matches!(n, '_' | '.')))
            }
            other => {
                cur.bump();
                match other {
                    ':' => Token::Colon,
                    '{' | '<' => Token::Open(other),
                    '}' | '>' => Token::Close(other),
                    '[' => Token::OpenList,
                    ']' => Token::CloseList,
                    ',' => Token::Comma,
                    ';' => Token::Semi,
                    _ => return Err(syntax(line, column, format!("unexpected character '{other}'"))),
                }
            }
        };
        tokens.push(Spanned { token, line, column });
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: (usize, usize),
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn next(&mut self) -> Option<Spanned> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn error_here(&self, detail: impl Into<String>) -> ModelError {
        let (line, column) = self
            .tokens
            .get(self.pos)
            .map_or(self.end, |s| (s.line, s.column));
        syntax(line, column, detail)
    }

    /// Parses fields until `close` (or end of input at top level).
    fn message(&mut self, close: Option<char>) -> Result<Map<String, Value>, ModelError> {
        let mut fields = Map::new();
        loop {
            match self.peek() {
                None => {
                    return match close {
                        None => Ok(fields),
                        Some(c) => Err(self.error_here(format!("expected '{c}' before end of input"))),
                    };
                }
                Some(Token::Close(c)) if Some(*c) == close => {
                    self.pos += 1;
                    return Ok(fields);
                }
                Some(Token::Ident(name)) => {
                    let name = name.clone();
                    self.pos += 1;
                    let value = self.field_value(&name)?;
                    insert_field(&mut fields, name, value);
                    if matches!(self.peek(), Some(Token::Semi | Token::Comma)) {
                        self.pos += 1;
                    }
                }
                Some(other) => {
                    let detail = format!("expected field name, found {other:?}");
                    return Err(self.error_here(detail));
                }
            }
        }
    }

    fn field_value(&mut self, name: &str) -> Result<Value, ModelError> {
        let had_colon = matches!(self.peek(), Some(Token::Colon));
        if had_colon {
            self.pos += 1;
        }
        match self.peek() {
            Some(Token::Open(_)) => self.nested(),
            Some(Token::OpenList) if had_colon => self.list(),
            Some(_) if had_colon => self.scalar(),
            _ => Err(self.error_here(format!("expected ':' or '{{' after field '{name}'"))),
        }
    }

    fn nested(&mut self) -> Result<Value, ModelError> {
        let close = match self.next().map(|s| s.token) {
            Some(Token::Open('<')) => '>',
            _ => '}',
        };
        Ok(Value::Object(self.message(Some(close))?))
    }

    fn list(&mut self) -> Result<Value, ModelError> {
        self.pos += 1;
        let mut items = Vec::new();
        if matches!(self.peek(), Some(Token::CloseList)) {
            self.pos += 1;
            return Ok(Value::Array(items));
        }
        loop {
            let item = match self.peek() {
                Some(Token::Open(_)) => self.nested()?,
                _ => self.scalar()?,
            };
            items.push(item);
            match self.peek() {
                Some(Token::Comma) => self.pos += 1,
                Some(Token::CloseList) => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                _ => return Err(self.error_here("expected ',' or ']' in list")),
            }
        }
    }

    fn scalar(&mut self) -> Result<Value, ModelError> {
        let Some(spanned) = self.next() else {
            return Err(self.error_here("expected a value"));
        };
        match spanned.token {
            Token::Str(s) => Ok(Value::String(s)),
            Token::Ident(s) => Ok(match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(s),
            }),
            Token::Number(raw) => parse_number(&raw)
                .ok_or_else(|| syntax(spanned.line, spanned.column, format!("invalid number '{raw}'"))),
            other => Err(syntax(
                spanned.line,
                spanned.column,
                format!("expected a value, found {other:?}"),
            )),
        }
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.strip_prefix('+').unwrap_or(raw);
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    let float = trimmed
        .strip_suffix(['f', 'F'])
        .unwrap_or(trimmed)
        .parse::<f64>()
        .ok()?;
    Number::from_f64(float).map(Value::Number)
}

fn insert_field(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.entry(name) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => {
            let existing = slot.get_mut();
            if !existing.is_array() {
                let first = existing.take();
                *existing = Value::Array(vec![first]);
            }
            if let Value::Array(items) = existing {
                match value {
                    Value::Array(more) => items.extend(more),
                    single => items.push(single),
                }
            }
        }
    }
}
