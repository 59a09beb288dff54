//! Compact chord notation parser.
//!
//! A partition is a comma-separated list of chords. Each chord is a note, a
//! parenthesized group of notes, or a glide between such groups, optionally
//! followed by a single-digit duration operator:
//!
//! ```text
//! c,d,e            three quarter notes
//! (A,C,E)*2        a triad held for two beats
//! -/2              an eighth rest
//! (A,B)->(A5,E)*4  two notes gliding over four beats
//! ```
//!
//! # Example
//!
//! ```
//! let partition = partition::parse("C,D,E", 120.0).unwrap();
//! assert_eq!(partition.len(), 3);
//! assert_eq!(partition.total_duration(), 1.5);
//! assert_eq!(partition.chords[1].frequency_stages, vec![vec![293.66]]);
//! ```

pub mod chord;
pub mod duration;
pub mod error;
pub mod note;
pub mod tokenizer;

use serde::{Deserialize, Serialize};

pub use chord::{resolve_chord, ResolvedChord, GLIDE_SEPARATOR};
pub use duration::{beat_seconds, chord_duration, split_duration, DurationOp};
pub use error::{ChordError, NotationError};
pub use note::{
    resolve, resolve_name, Accidental, Letter, NoteToken, PitchClass, ResolvedNote,
    REFERENCE_OCTAVE,
};
pub use tokenizer::{tokenize, DELIMITER};

/// One full pass of resolved chords at a fixed tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Quarter-note beats per minute.
    pub tempo: f64,
    pub chords: Vec<ResolvedChord>,
}

impl Partition {
    /// Length of one pass in seconds.
    pub fn total_duration(&self) -> f64 {
        self.chords.iter().map(|c| c.duration_seconds).sum()
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedChord> {
        self.chords.iter()
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a ResolvedChord;
    type IntoIter = std::slice::Iter<'a, ResolvedChord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Parse a partition at the given tempo.
///
/// The first failing chord aborts the whole parse; nothing is dropped or
/// guessed.
pub fn parse(text: &str, tempo: f64) -> Result<Partition, NotationError> {
    if !tempo.is_finite() || tempo <= 0.0 {
        return Err(NotationError::InvalidTempo(tempo));
    }

    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(NotationError::EmptyPartition);
    }

    let chords = tokens
        .into_iter()
        .enumerate()
        .map(|(index, token)| {
            resolve_chord(&token, tempo).map_err(|source| NotationError::Chord {
                index,
                token,
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Partition { tempo, chords })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_scale() {
        let p = parse("C,D,E", 120.0).unwrap();
        let durations: Vec<f64> = p.iter().map(|c| c.duration_seconds).collect();
        let freqs: Vec<f64> = p.iter().map(|c| c.frequency_stages[0][0]).collect();
        assert_eq!(durations, vec![0.5, 0.5, 0.5]);
        assert_eq!(freqs, vec![261.63, 293.66, 329.63]);
        assert_eq!(p.total_duration(), 1.5);
    }

    #[test]
    fn test_parse_tags_failing_chord() {
        let err = parse("c,d,(A,B)->(A,C,D),e", 120.0).unwrap_err();
        assert_eq!(
            err,
            NotationError::Chord {
                index: 2,
                token: "(A,B)->(A,C,D)".to_string(),
                source: ChordError::GlideArityMismatch {
                    stage: 1,
                    expected: 2,
                    found: 3,
                },
            }
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse(" , ", 120.0), Err(NotationError::EmptyPartition));
        assert_eq!(parse("", 120.0), Err(NotationError::EmptyPartition));
    }

    #[test]
    fn test_parse_invalid_tempo() {
        assert_eq!(parse("c", 0.0), Err(NotationError::InvalidTempo(0.0)));
        assert_eq!(parse("c", -60.0), Err(NotationError::InvalidTempo(-60.0)));
        assert!(matches!(
            parse("c", f64::NAN),
            Err(NotationError::InvalidTempo(_))
        ));
    }

    #[test]
    fn test_parse_unbalanced() {
        assert_eq!(
            parse("c,(d,e", 120.0),
            Err(NotationError::UnbalancedGroup { position: 2 })
        );
    }

    #[test]
    fn test_rest_keeps_its_slot() {
        let p = parse("c,-,e", 120.0).unwrap();
        assert_eq!(p.len(), 3);
        assert!(p.chords[1].is_rest());
        assert_eq!(p.total_duration(), 1.5);
    }
}
