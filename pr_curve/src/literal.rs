//! Decoder for Python-literal containers as found in dataframe CSV exports.
//!
//! Accepts lists, tuples, dicts, quoted strings, numbers and the
//! `True`/`False`/`None` constants (JSON spellings too) and produces a
//! `serde_json::Value`. Tuples decode to arrays.

use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 64;

#[derive(Error, Debug, PartialEq)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character '{ch}' at offset {pos}")]
    Unexpected { ch: char, pos: usize },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),
    #[error("unsupported dict key at offset {0}")]
    InvalidKey(usize),
    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),
}

pub fn parse_literal(text: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
    };
    let value = parser.value(0)?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(value),
        Some(ch) => Err(LiteralError::Unexpected { ch, pos: parser.pos }),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Result<char, LiteralError> {
        let ch = self.peek().ok_or(LiteralError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(ch)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: char) -> Result<(), LiteralError> {
        self.skip_ws();
        let pos = self.pos;
        match self.bump()? {
            ch if ch == want => Ok(()),
            ch => Err(LiteralError::Unexpected { ch, pos }),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(LiteralError::TooDeep(MAX_DEPTH));
        }
        self.skip_ws();
        let ch = self.peek().ok_or(LiteralError::UnexpectedEnd)?;
        match ch {
            '[' => self.sequence(']', depth),
            '(' => self.sequence(')', depth),
            '{' => self.dict(depth),
            '\'' | '"' => self.string().map(Value::String),
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.word(),
            ch => Err(LiteralError::Unexpected { ch, pos: self.pos }),
        }
    }

    fn sequence(&mut self, close: char, depth: usize) -> Result<Value, LiteralError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }
            items.push(self.value(depth + 1)?);
            self.skip_ws();
            let pos = self.pos;
            match self.bump()? {
                ',' => continue,
                c if c == close => break,
                ch => return Err(LiteralError::Unexpected { ch, pos }),
            }
        }
        Ok(Value::Array(items))
    }

    fn dict(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.pos += 1;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                break;
            }
            let key_pos = self.pos;
            let key = match self.value(depth + 1)? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(true) => "True".to_string(),
                Value::Bool(false) => "False".to_string(),
                _ => return Err(LiteralError::InvalidKey(key_pos)),
            };
            self.expect(':')?;
            let value = self.value(depth + 1)?;
            map.insert(key, value);
            self.skip_ws();
            let pos = self.pos;
            match self.bump()? {
                ',' => continue,
                '}' => break,
                ch => return Err(LiteralError::Unexpected { ch, pos }),
            }
        }
        Ok(Value::Object(map))
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            let ch = self.bump()?;
            if ch == quote {
                return Ok(out);
            }
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            let esc_pos = self.pos - 1;
            match self.bump()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                'x' => out.push(self.hex_escape(2, esc_pos)?),
                'u' => out.push(self.hex_escape(4, esc_pos)?),
                // Unknown escapes keep their backslash.
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
    }

    fn hex_escape(&mut self, digits: usize, esc_pos: usize) -> Result<char, LiteralError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .bump()?
                .to_digit(16)
                .ok_or(LiteralError::InvalidEscape(esc_pos))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or(LiteralError::InvalidEscape(esc_pos))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_')
        ) {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        let cleaned = raw.replace('_', "");
        if let Ok(v) = cleaned.parse::<i64>() {
            return Ok(Value::from(v));
        }
        cleaned
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or(LiteralError::InvalidNumber(raw))
    }

    fn word(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            // String prefixes such as u'...' or r"...".
            "u" | "r" | "b" if matches!(self.peek(), Some('\'' | '"')) => {
                self.string().map(Value::String)
            }
            _ => Err(LiteralError::Unexpected {
                ch: self.chars[start],
                pos: start,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_python_reviewer_list() {
        let text = "[{'login': 'stearp', 'id': 101, 'site_admin': False, 'name': None}, \
                    {'login': \"o'brien\", 'score': -1.5e2}]";
        let value = parse_literal(text).unwrap();
        assert_eq!(
            value,
            json!([
                {"login": "stearp", "id": 101, "site_admin": false, "name": null},
                {"login": "o'brien", "score": -150.0}
            ])
        );
    }

    #[test]
    fn accepts_tuples_and_trailing_commas() {
        assert_eq!(parse_literal("({'a': 1},)").unwrap(), json!([{"a": 1}]));
        assert_eq!(parse_literal("[1, 2, ]").unwrap(), json!([1, 2]));
        assert_eq!(parse_literal("  []  ").unwrap(), json!([]));
    }

    #[test]
    fn decodes_escapes() {
        assert_eq!(
            parse_literal(r"'tab\there \x41é \q'").unwrap(),
            json!("tab\there A\u{e9} \\q")
        );
    }

    #[test]
    fn reports_malformed_input() {
        assert_eq!(parse_literal("[{'login': 'x'}"), Err(LiteralError::UnexpectedEnd));
        assert!(matches!(
            parse_literal("[{'login' 'x'}]"),
            Err(LiteralError::Unexpected { ch: '\'', .. })
        ));
        assert!(matches!(parse_literal("[1] trailing"), Err(LiteralError::Unexpected { .. })));
        assert!(matches!(parse_literal("{[1]: 2}"), Err(LiteralError::InvalidKey(1))));
        assert!(matches!(parse_literal("[1-2-3]"), Err(LiteralError::InvalidNumber(_))));
    }

    #[test]
    fn limits_nesting() {
        let deep = "[".repeat(MAX_DEPTH + 2);
        assert_eq!(parse_literal(&deep), Err(LiteralError::TooDeep(MAX_DEPTH)));
    }
}
