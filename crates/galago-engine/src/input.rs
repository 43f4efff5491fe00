//! The typed-input parser: turns a generated string into the argument tuple
//! a function under test is invoked with.

use crate::errors::InputParseError;
use crate::value::Value;

/// How generated strings are tokenized into argument tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserMode {
    /// Split on top-level commas, parse every token as a number (integer
    /// first, float second). The default.
    Numbers,
    /// Shape-aware: `[…]` list, `{…}` set, `(…)` tuple, scalar fallback
    /// with int → float → bool → string.
    Shaped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputParser {
    pub mode: ParserMode,
}

impl InputParser {
    pub fn numbers() -> Self {
        Self {
            mode: ParserMode::Numbers,
        }
    }

    pub fn shaped() -> Self {
        Self {
            mode: ParserMode::Shaped,
        }
    }

    /// Convert a generated string into an argument tuple.
    pub fn parse(&self, text: &str) -> Result<Vec<Value>, InputParseError> {
        match self.mode {
            ParserMode::Numbers => parse_numbers(text),
            ParserMode::Shaped => parse_shaped(text),
        }
    }
}

impl Default for InputParser {
    fn default() -> Self {
        Self::numbers()
    }
}

fn parse_numbers(text: &str) -> Result<Vec<Value>, InputParseError> {
    let mut values = Vec::new();
    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        values.push(parse_number(token).ok_or_else(|| InputParseError {
            text: text.to_owned(),
            reason: format!("'{token}' is not a number"),
        })?);
    }
    if values.is_empty() {
        return Err(InputParseError {
            text: text.to_owned(),
            reason: "no scalars found".into(),
        });
    }
    Ok(values)
}

fn parse_shaped(text: &str) -> Result<Vec<Value>, InputParseError> {
    let tokens = split_top_level(text);
    if tokens.is_empty() {
        return Err(InputParseError {
            text: text.to_owned(),
            reason: "empty input".into(),
        });
    }
    tokens
        .into_iter()
        .map(|token| parse_value(&token, text))
        .collect()
}

fn parse_value(token: &str, source: &str) -> Result<Value, InputParseError> {
    let trimmed = token.trim();
    if let Some(inner) = delimited(trimmed, '[', ']') {
        let items = parse_items(inner, source)?;
        return Ok(Value::List(items));
    }
    if let Some(inner) = delimited(trimmed, '{', '}') {
        let items = parse_items(inner, source)?;
        return Ok(Value::set(items));
    }
    if let Some(inner) = delimited(trimmed, '(', ')') {
        let items = parse_items(inner, source)?;
        return Ok(Value::Tuple(items));
    }
    Ok(parse_scalar(trimmed))
}

fn parse_items(inner: &str, source: &str) -> Result<Vec<Value>, InputParseError> {
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(inner)
        .into_iter()
        .map(|item| parse_value(&item, source))
        .collect()
}

fn parse_scalar(token: &str) -> Value {
    if let Some(value) = parse_number(token) {
        return value;
    }
    match token {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Str(token.to_owned()),
    }
}

fn parse_number(token: &str) -> Option<Value> {
    if let Ok(n) = token.parse::<i64>() {
        return Some(Value::Int(n));
    }
    if let Ok(n) = token.parse::<f64>() {
        if n.is_finite() {
            return Some(Value::Float(n));
        }
    }
    None
}

fn delimited<'a>(token: &'a str, open: char, close: char) -> Option<&'a str> {
    let token = token.trim();
    if token.starts_with(open) && token.ends_with(close) && token.len() >= 2 {
        Some(&token[open.len_utf8()..token.len() - close.len_utf8()])
    } else {
        None
    }
}

/// Split on commas that are not nested inside brackets.
fn split_top_level(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '[' | '{' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | '}' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                tokens.push(current.trim().to_owned());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        tokens.push(current.trim().to_owned());
    }
    tokens.retain(|t| !t.is_empty());
    tokens
}
