//! Chord resolution: one chord token -> glide stages of note frequencies.

use serde::{Deserialize, Serialize};

use crate::duration::{resolve_duration, split_duration};
use crate::error::ChordError;
use crate::note::NoteToken;
use crate::tokenizer::DELIMITER;

/// Separates the stages of a glide.
pub const GLIDE_SEPARATOR: &str = "->";

/// A chord ready for scheduling.
///
/// `frequency_stages[stage][note]`: the outer index walks the glide in order,
/// the inner index is the note position, aligned across stages. A rest chord
/// has no stages at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedChord {
    /// Token text as it appeared in the partition (whitespace stripped).
    pub source: String,
    pub duration_seconds: f64,
    pub frequency_stages: Vec<Vec<f64>>,
}

impl ResolvedChord {
    /// A silent slot of the given length.
    pub fn rest(source: impl Into<String>, duration_seconds: f64) -> Self {
        ResolvedChord {
            source: source.into(),
            duration_seconds,
            frequency_stages: Vec::new(),
        }
    }

    pub fn is_rest(&self) -> bool {
        self.frequency_stages.is_empty()
    }

    /// Number of simultaneously sounding notes.
    pub fn note_count(&self) -> usize {
        self.frequency_stages.first().map_or(0, Vec::len)
    }

    pub fn stage_count(&self) -> usize {
        self.frequency_stages.len()
    }

    /// Whether any note changes frequency over the chord.
    pub fn is_glide(&self) -> bool {
        self.stage_count() > 1
    }

    /// Frequencies of note `index` across all stages.
    pub fn note_path(&self, index: usize) -> Vec<f64> {
        self.frequency_stages
            .iter()
            .filter_map(|stage| stage.get(index).copied())
            .collect()
    }
}

/// Resolve a chord token against a tempo.
pub fn resolve_chord(token: &str, tempo: f64) -> Result<ResolvedChord, ChordError> {
    let (body, op) = split_duration(token)?;
    let duration_seconds = resolve_duration(op, tempo);

    let stages = parse_stages(body)?;

    let expected = stages.first().map_or(0, Vec::len);
    for (stage, notes) in stages.iter().enumerate().skip(1) {
        if notes.len() != expected {
            return Err(ChordError::GlideArityMismatch {
                stage,
                expected,
                found: notes.len(),
            });
        }
    }

    if stages.iter().flatten().any(NoteToken::is_rest) {
        return Ok(ResolvedChord::rest(token, duration_seconds));
    }

    let frequency_stages = stages
        .iter()
        .map(|notes| {
            notes
                .iter()
                .map(|note| note.frequency().map(|f| f.unwrap_or_default()))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedChord {
        source: token.to_string(),
        duration_seconds,
        frequency_stages,
    })
}

/// Split a chord body into its glide stages, each a list of note tokens.
pub fn parse_stages(body: &str) -> Result<Vec<Vec<NoteToken>>, ChordError> {
    unwrap_glide_group(body)
        .split(GLIDE_SEPARATOR)
        .map(parse_stage)
        .collect()
}

/// A stage is a bare note or a parenthesized, delimited note list.
pub fn parse_stage(stage: &str) -> Result<Vec<NoteToken>, ChordError> {
    let inner = match stage.strip_prefix('(') {
        Some(rest) => rest
            .strip_suffix(')')
            .ok_or_else(|| ChordError::UnknownNote(stage.to_string()))?,
        None => stage,
    };

    inner.split(DELIMITER).map(NoteToken::parse).collect()
}

/// `((a,b)->(a,d))` groups a whole glide; drop the outer parentheses.
fn unwrap_glide_group(body: &str) -> &str {
    let mut body = body;
    while let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        if !inner.contains(GLIDE_SEPARATOR) || !is_balanced(inner) {
            break;
        }
        body = inner;
    }
    body
}

fn is_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}
