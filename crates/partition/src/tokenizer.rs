//! Partition tokenizer.
//!
//! A small scanner: whitespace is dropped, runs of the delimiter collapse to
//! one, and the text is split on the delimiter only at parenthesis depth zero
//! so that `(A,B),C` is two chords, not three.

use crate::error::NotationError;

/// Separates chords, and notes within a parenthesized stage.
pub const DELIMITER: char = ',';

/// Split a partition into chord tokens, preserving source order.
///
/// Error positions are byte offsets into `text`.
pub fn tokenize(text: &str) -> Result<Vec<String>, NotationError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut open_groups: Vec<usize> = Vec::new();
    let mut previous: Option<char> = None;

    for (position, c) in text.char_indices().filter(|(_, c)| !c.is_whitespace()) {
        if c == DELIMITER && previous == Some(DELIMITER) {
            continue;
        }
        previous = Some(c);

        match c {
            '(' => {
                open_groups.push(position);
                current.push(c);
            }
            ')' => {
                if open_groups.pop().is_none() {
                    return Err(NotationError::UnbalancedGroup { position });
                }
                current.push(c);
            }
            DELIMITER if open_groups.is_empty() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if let Some(&position) = open_groups.last() {
        return Err(NotationError::UnbalancedGroup { position });
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}
