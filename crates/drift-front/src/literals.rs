//! Literal parsing.
//!
//! Lowering must accept source literals bit-exactly, so the number parser
//! lives here rather than in the lexer. Integer literals support decimal,
//! hex (`0x`), octal (`0o`), and binary (`0b`) radixes, `_` separators
//! between digits, and an optional type suffix (`u8`..`u64`, `i8`..`i64`).
//! Without a suffix the literal is `u32` when the value fits and `u64`
//! otherwise. Every representation is range-checked against the chosen
//! type; a negative literal like `-12u8` never reaches this module because
//! the sign is a unary operator, not part of the token.
//!
//! Floats use platform conversion with an optional `f32`/`f64` suffix
//! (default `f64`). Char and string literals use C-style escapes.

use thiserror::Error;

use drift_context::{Diagnostics, SourceSpan};
use drift_mir::{FloatValue, IntValue};

use crate::ast::FloatSuffix;

/// A bad escape sequence, reported with its character offset so the
/// diagnostic can point inside the literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown escape sequence at character offset {offset}")]
pub struct EscapeError {
    pub offset: usize,
}

/// Parses one integer literal token. Returns `None` after recording a
/// diagnostic.
pub fn parse_int(text: &str, span: SourceSpan, diagnostics: &mut Diagnostics) -> Option<IntValue> {
    let (radix, digits_and_suffix) = if let Some(rest) = text.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = text.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = text.strip_prefix("0b") {
        (2, rest)
    } else {
        (10, text)
    };

    let (digits, suffix) = split_suffix(digits_and_suffix, radix);

    let mut value: u128 = 0;
    let mut saw_digit = false;
    for c in digits.chars() {
        if c == '_' {
            continue;
        }
        let digit = match c.to_digit(radix) {
            Some(d) => d as u128,
            None => {
                diagnostics.add_simple(
                    span,
                    "Invalid integer literal",
                    format!("Character '{}' is not a valid digit in this radix.", c),
                );
                return None;
            }
        };
        saw_digit = true;
        value = value * radix as u128 + digit;
        if value > u64::MAX as u128 {
            diagnostics.add_simple(
                span,
                "Invalid integer literal",
                "Integer literal does not fit in any supported integer type.",
            );
            return None;
        }
    }
    if !saw_digit {
        diagnostics.add_simple(
            span,
            "Invalid integer literal",
            "Integer literal contains no digits.",
        );
        return None;
    }
    let value = value as u64;

    let parsed = match suffix {
        Some("u8") => u8::try_from(value).ok().map(IntValue::U8),
        Some("u16") => u16::try_from(value).ok().map(IntValue::U16),
        Some("u32") => u32::try_from(value).ok().map(IntValue::U32),
        Some("u64") => Some(IntValue::U64(value)),
        Some("i8") => i8::try_from(value).ok().map(IntValue::I8),
        Some("i16") => i16::try_from(value).ok().map(IntValue::I16),
        Some("i32") => i32::try_from(value).ok().map(IntValue::I32),
        Some("i64") => i64::try_from(value).ok().map(IntValue::I64),
        Some(other) => {
            diagnostics.add_simple(
                span,
                "Invalid integer literal",
                format!("Unknown integer literal suffix '{}'.", other),
            );
            return None;
        }
        None => {
            // Default typing: u32 when the value fits, u64 otherwise.
            if let Ok(narrow) = u32::try_from(value) {
                Some(IntValue::U32(narrow))
            } else {
                Some(IntValue::U64(value))
            }
        }
    };

    match parsed {
        Some(result) => Some(result),
        None => {
            diagnostics.add_simple(
                span,
                "Invalid integer literal",
                format!(
                    "Integer literal does not fit in the range of a {}.",
                    suffix.unwrap_or("u32")
                ),
            );
            None
        }
    }
}

/// Splits a trailing type suffix off the digit run.
///
/// Hex digits include `b`, so a suffix is only recognized when what remains
/// before it is a non-empty digit run -- `0xfeed` stays all-digits while
/// `0xfe_u8` splits at `u8`.
fn split_suffix<'t>(text: &'t str, radix: u32) -> (&'t str, Option<&'t str>) {
    for suffix in ["u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64"] {
        if let Some(digits) = text.strip_suffix(suffix) {
            let digits = digits.strip_suffix('_').unwrap_or(digits);
            if !digits.is_empty() && digits.chars().all(|c| c == '_' || c.to_digit(radix).is_some())
            {
                return (digits, Some(suffix));
            }
        }
    }
    (text, None)
}

/// Parses one float literal. `text` carries the digits without the suffix.
pub fn parse_float(
    text: &str,
    suffix: Option<FloatSuffix>,
    span: SourceSpan,
    diagnostics: &mut Diagnostics,
) -> Option<FloatValue> {
    match suffix.unwrap_or(FloatSuffix::F64) {
        FloatSuffix::F32 => match text.parse::<f32>() {
            Ok(value) if value.is_finite() => Some(FloatValue::F32(value)),
            Ok(_) => {
                diagnostics.add_simple(
                    span,
                    "Invalid floating-point literal",
                    "Floating-point literal does not fit in the range of an f32.",
                );
                None
            }
            Err(_) => {
                diagnostics.add_simple(
                    span,
                    "Invalid floating-point literal",
                    "Could not correctly parse the literal value.",
                );
                None
            }
        },
        FloatSuffix::F64 => match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(FloatValue::F64(value)),
            Ok(_) => {
                diagnostics.add_simple(
                    span,
                    "Invalid floating-point literal",
                    "Floating-point literal does not fit in the range of an f64.",
                );
                None
            }
            Err(_) => {
                diagnostics.add_simple(
                    span,
                    "Invalid floating-point literal",
                    "Could not correctly parse the literal value.",
                );
                None
            }
        },
    }
}

/// C-style unescape. Returns the unescaped text or the position of the
/// bad escape sequence.
pub fn unescape(text: &str) -> Result<String, EscapeError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some((_, 'n')) => out.push('\n'),
            Some((_, 'r')) => out.push('\r'),
            Some((_, 't')) => out.push('\t'),
            Some((_, '0')) => out.push('\0'),
            Some((_, '\\')) => out.push('\\'),
            Some((_, '\'')) => out.push('\''),
            Some((_, '"')) => out.push('"'),
            Some((_, 'x')) => {
                let high = chars.next().and_then(|(_, c)| c.to_digit(16));
                let low = chars.next().and_then(|(_, c)| c.to_digit(16));
                match (high, low) {
                    (Some(h), Some(l)) => out.push(char::from((h * 16 + l) as u8)),
                    _ => return Err(EscapeError { offset }),
                }
            }
            _ => return Err(EscapeError { offset }),
        }
    }
    Ok(out)
}
