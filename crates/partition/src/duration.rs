//! Chord duration suffixes (`/n`, `*n`) relative to a quarter-note tempo.
//!
//! The grammar only knows a single trailing digit after the operator.
//! `A/12` is not "A divided by twelve"; it is rejected as malformed so that a
//! typo never plays at a silently wrong length.

use serde::{Deserialize, Serialize};

use crate::error::ChordError;

/// Trailing duration operator of a chord token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationOp {
    /// `/n`: a fraction of a beat.
    Divide(u8),
    /// `*n`: several beats.
    Multiply(u8),
}

impl DurationOp {
    fn from_parts(op: char, digit: u32) -> Option<DurationOp> {
        let n = u8::try_from(digit).ok().filter(|n| (1..=9).contains(n))?;
        match op {
            '/' => Some(DurationOp::Divide(n)),
            '*' => Some(DurationOp::Multiply(n)),
            _ => None,
        }
    }

    /// Apply the operator to a base duration in seconds.
    pub fn apply(self, base: f64) -> f64 {
        match self {
            DurationOp::Divide(n) => base / f64::from(n),
            DurationOp::Multiply(n) => base * f64::from(n),
        }
    }
}

fn is_operator(c: char) -> bool {
    c == '/' || c == '*'
}

/// Split a chord token into its body and optional duration operator.
///
/// Digits that are not preceded by an operator belong to the body (they are
/// an octave number), so `"A5"` has no duration suffix.
pub fn split_duration(token: &str) -> Result<(&str, Option<DurationOp>), ChordError> {
    let malformed = || ChordError::MalformedDuration(token.to_string());

    if token.ends_with(is_operator) {
        return Err(malformed());
    }

    let digits_start = token
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);

    let Some(digits_start) = digits_start else {
        return Ok((token, None));
    };

    let body = &token[..digits_start];
    let Some(op) = body.chars().last().filter(|c| is_operator(*c)) else {
        return Ok((token, None));
    };

    let digits = &token[digits_start..];
    let mut chars = digits.chars();
    let digit = match (chars.next(), chars.next()) {
        (Some(d), None) => d.to_digit(10),
        _ => None,
    };

    let op = digit
        .and_then(|d| DurationOp::from_parts(op, d))
        .ok_or_else(malformed)?;

    // both operators are single-byte
    Ok((&body[..body.len() - 1], Some(op)))
}

/// Length of one beat in seconds.
pub fn beat_seconds(tempo: f64) -> f64 {
    60.0 / tempo
}

/// Resolve an operator against a tempo.
pub fn resolve_duration(op: Option<DurationOp>, tempo: f64) -> f64 {
    let base = beat_seconds(tempo);
    match op {
        Some(op) => op.apply(base),
        None => base,
    }
}

/// Duration in seconds of a whole chord token.
pub fn chord_duration(token: &str, tempo: f64) -> Result<f64, ChordError> {
    let (_, op) = split_duration(token)?;
    Ok(resolve_duration(op, tempo))
}
