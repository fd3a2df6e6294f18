//! Literal decoding and initializer flattening.
//!
//! A variable's initializer is stored as one flat word sequence:
//!
//! ```text
//! [count, num_1, len_1, v_1 .. v_len_1, num_2, len_2, ...]
//! ```
//!
//! where each record writes `num` copies of its `len` values. The machine's
//! `INIT` instruction expands exactly this shape.

use pins_types::ast::{Atom, AtomKind, Init};
use pins_types::mem::WORD;

use crate::error::{LayoutError, LayoutResult};

// ══════════════════════════════════════════════════════════════════════════════
// Literals
// ══════════════════════════════════════════════════════════════════════════════

/// Decode an integer lexeme: optional sign followed by decimal digits.
pub fn decode_int(lexeme: &str) -> LayoutResult<i32> {
    let digits = lexeme.strip_prefix(['+', '-']).unwrap_or(lexeme);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LayoutError::IllegalInteger(lexeme.to_string()));
    }
    lexeme
        .parse::<i32>()
        .map_err(|_| LayoutError::IllegalInteger(lexeme.to_string()))
}

/// Decode a character lexeme such as `'a'`, `'\n'` or `'\41'`.
pub fn decode_char(lexeme: &str) -> LayoutResult<i32> {
    let illegal = || LayoutError::IllegalChar(lexeme.to_string());
    let body = lexeme
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .ok_or_else(illegal)?;
    let codes = decode_body(body, '\'').ok_or_else(illegal)?;
    match codes.as_slice() {
        [code] => Ok(*code),
        _ => Err(illegal()),
    }
}

/// Decode a string lexeme into its character codes (no terminator).
pub fn decode_str(lexeme: &str) -> LayoutResult<Vec<i32>> {
    let illegal = || LayoutError::IllegalString(lexeme.to_string());
    let body = lexeme
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(illegal)?;
    decode_body(body, '"').ok_or_else(illegal)
}

/// Decode the characters between the quotes. `None` on a bad escape or an
/// unescaped quote.
fn decode_body(body: &str, quote: char) -> Option<Vec<i32>> {
    let mut codes = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        let code = match c {
            '\\' => match chars.next()? {
                'n' => '\n' as i32,
                '\\' => '\\' as i32,
                c if c == quote => c as i32,
                hi => {
                    let lo = chars.next()?;
                    (hi.to_digit(16)? * 16 + lo.to_digit(16)?) as i32
                }
            },
            c if c == quote => return None,
            c => c as i32,
        };
        codes.push(code);
    }
    Some(codes)
}

// ══════════════════════════════════════════════════════════════════════════════
// Initializers
// ══════════════════════════════════════════════════════════════════════════════

/// The words one initializer value contributes.
fn value_words(atom: &Atom) -> LayoutResult<Vec<i32>> {
    match atom.kind {
        AtomKind::Int => Ok(vec![decode_int(&atom.lexeme)?]),
        AtomKind::Char => Ok(vec![decode_char(&atom.lexeme)?]),
        AtomKind::Str => {
            let mut words = decode_str(&atom.lexeme)?;
            words.push(0);
            Ok(words)
        }
    }
}

/// Flatten a variable's initializer list. An empty list means `1 * 0`.
pub fn flatten(inits: &[Init]) -> LayoutResult<Vec<i32>> {
    if inits.is_empty() {
        return Ok(vec![1, 1, 1, 0]);
    }
    let count = i32::try_from(inits.len())
        .map_err(|_| LayoutError::IllegalInitializer("too many elements".into()))?;
    let mut flat = vec![count];
    for init in inits {
        let num = decode_int(&init.num.lexeme)?;
        if num < 0 {
            return Err(LayoutError::IllegalInitializer(format!(
                "negative repetition count {num}"
            )));
        }
        let words = value_words(&init.value)?;
        flat.push(num);
        flat.push(words.len() as i32);
        flat.extend(words);
    }
    Ok(flat)
}

/// Bytes a flattened initializer fills: `4 * Σ num * len`.
pub fn size_of(flat: &[i32]) -> LayoutResult<i32> {
    let overflow = || LayoutError::IllegalInitializer("initializer exceeds address space".into());
    let mut words: i32 = 0;
    let mut pos = 1;
    for _ in 0..flat.first().copied().unwrap_or(0) {
        let (num, len) = match (flat.get(pos), flat.get(pos + 1)) {
            (Some(num), Some(len)) => (*num, *len),
            _ => return Err(LayoutError::IllegalInitializer("truncated record".into())),
        };
        words = num
            .checked_mul(len)
            .and_then(|n| words.checked_add(n))
            .ok_or_else(overflow)?;
        pos += 2 + len as usize;
    }
    words.checked_mul(WORD).ok_or_else(overflow)
}
