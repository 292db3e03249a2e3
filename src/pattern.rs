//! Command pattern micro-language.
//!
//! Instrument dialects here are simple enough that a full regex engine
//! would be overkill: every command is a literal, or a literal with a
//! signed number or a device name embedded at a fixed spot. Patterns are
//! written as literal text with two placeholder forms:
//!
//! - `{num}` matches an optional sign, digits, and an optional fractional
//!   part (`-123.4`, `+10`, `5`),
//! - `{name}` matches one or more ASCII alphanumerics (`DS1`, `AS3`, `0`).
//!
//! Matching is prefix-anchored: the whole pattern must match the start of
//! the trimmed line, and anything after the matched prefix is ignored (so
//! the pattern `BU` also accepts `BU  ; `). Patterns are compiled once at
//! instrument construction; a malformed pattern is a construction error,
//! never a runtime one.

use crate::error::{AppResult, EmulatorError};

/// One parameter captured while matching a line.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// A `{num}` placeholder, parsed.
    Number(f64),
    /// A `{name}` placeholder, verbatim.
    Name(String),
}

#[derive(Debug, Clone)]
enum Token {
    Literal(String),
    Number,
    Name,
}

/// A compiled command pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    tokens: Vec<Token>,
    source: String,
}

impl Pattern {
    /// Compile a pattern from its textual form.
    pub fn compile(spec: &str) -> AppResult<Self> {
        let mut tokens = Vec::new();
        let mut rest = spec;
        while let Some(start) = rest.find('{') {
            if start > 0 {
                tokens.push(Token::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 1..];
            let end = after.find('}').ok_or_else(|| {
                EmulatorError::Pattern(spec.to_string(), "unterminated placeholder".to_string())
            })?;
            match &after[..end] {
                "num" => tokens.push(Token::Number),
                "name" => tokens.push(Token::Name),
                other => {
                    return Err(EmulatorError::Pattern(
                        spec.to_string(),
                        format!("unknown placeholder '{{{other}}}'"),
                    ))
                }
            }
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            tokens.push(Token::Literal(rest.to_string()));
        }
        if tokens.is_empty() {
            return Err(EmulatorError::Pattern(
                spec.to_string(),
                "empty pattern".to_string(),
            ));
        }
        Ok(Self {
            tokens,
            source: spec.to_string(),
        })
    }

    /// A pattern that matches every line. Used for trailing default
    /// bindings (Empower's canned reply, BBA150's query echo).
    pub fn catch_all() -> Self {
        Self {
            tokens: Vec::new(),
            source: "<any>".to_string(),
        }
    }

    /// The textual form this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match against a prefix of `line`, returning the captures on success.
    ///
    /// `fold_case` makes literal tokens compare case-insensitively; the
    /// captures always come from the original text.
    pub fn match_prefix(&self, line: &str, fold_case: bool) -> Option<Vec<Capture>> {
        let mut captures = Vec::new();
        let mut pos = 0usize;
        for token in &self.tokens {
            match token {
                Token::Literal(lit) => {
                    let chunk = line.get(pos..pos + lit.len())?;
                    let hit = if fold_case {
                        chunk.eq_ignore_ascii_case(lit)
                    } else {
                        chunk == lit
                    };
                    if !hit {
                        return None;
                    }
                    pos += lit.len();
                }
                Token::Number => {
                    let (value, len) = scan_number(&line[pos..])?;
                    captures.push(Capture::Number(value));
                    pos += len;
                }
                Token::Name => {
                    let len = line[pos..]
                        .bytes()
                        .take_while(u8::is_ascii_alphanumeric)
                        .count();
                    if len == 0 {
                        return None;
                    }
                    captures.push(Capture::Name(line[pos..pos + len].to_string()));
                    pos += len;
                }
            }
        }
        Some(captures)
    }
}

/// Scan a signed decimal at the start of `input`; returns the value and
/// the matched byte length. A trailing dot without digits is not consumed.
fn scan_number(input: &str) -> Option<(f64, usize)> {
    let bytes = input.as_bytes();
    let mut len = 0usize;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        len += 1;
    }
    let digits = bytes[len..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    len += digits;
    if bytes.get(len) == Some(&b'.') {
        let frac = bytes[len + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if frac > 0 {
            len += 1 + frac;
        }
    }
    let value = input[..len].parse().ok()?;
    Some((value, len))
}
