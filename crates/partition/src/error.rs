//! Error types for partition parsing.
//!
//! Errors raised while resolving a single chord are [`ChordError`]s. When they
//! surface through [`crate::parse`] they are wrapped in
//! [`NotationError::Chord`] together with the chord's index and source text,
//! so callers can point at the offending slot.

use thiserror::Error;

/// Failure while resolving one chord token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordError {
    /// The note text is not a letter/accidental/octave combination (or a rest).
    #[error("unknown note {0:?}")]
    UnknownNote(String),

    /// A duration operator with no usable digit after it.
    ///
    /// Only a single digit 1-9 is accepted after `/` or `*`.
    #[error("malformed duration {0:?}: expected `/n` or `*n` with a single digit 1-9")]
    MalformedDuration(String),

    /// A glide stage with a different number of notes than the first stage.
    #[error("glide stage {stage} has {found} notes, expected {expected}")]
    GlideArityMismatch {
        stage: usize,
        expected: usize,
        found: usize,
    },
}

/// Failure while parsing a whole partition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotationError {
    /// A parenthesis group that never closes, or a closing paren with no group.
    #[error("unbalanced parenthesis group at position {position}")]
    UnbalancedGroup { position: usize },

    /// Nothing left to play after tokenizing.
    #[error("partition contains no chords")]
    EmptyPartition,

    /// Tempo must be a positive, finite number of beats per minute.
    #[error("invalid tempo {0}: expected a positive number of beats per minute")]
    InvalidTempo(f64),

    /// A chord failed to resolve.
    #[error("chord {index} ({token:?}): {source}")]
    Chord {
        index: usize,
        token: String,
        source: ChordError,
    },
}

impl NotationError {
    /// The underlying chord error, if this failure is tied to one chord.
    pub fn chord_error(&self) -> Option<&ChordError> {
        match self {
            NotationError::Chord { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chord_error_display() {
        let err = NotationError::Chord {
            index: 3,
            token: "(A,B)->(A,C,D)".to_string(),
            source: ChordError::GlideArityMismatch {
                stage: 1,
                expected: 2,
                found: 3,
            },
        };
        assert_eq!(
            err.to_string(),
            "chord 3 (\"(A,B)->(A,C,D)\"): glide stage 1 has 3 notes, expected 2"
        );
    }

    #[test]
    fn test_chord_error_accessor() {
        let err = NotationError::Chord {
            index: 0,
            token: "H".to_string(),
            source: ChordError::UnknownNote("H".to_string()),
        };
        assert_eq!(
            err.chord_error(),
            Some(&ChordError::UnknownNote("H".to_string()))
        );
        assert_eq!(NotationError::EmptyPartition.chord_error(), None);
    }
}
