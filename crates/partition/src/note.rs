//! Note names, enharmonic normalization and note-token parsing.
//!
//! Only the twelve equal-temperament pitch classes have reference
//! frequencies (octave 4, A4 = 440 Hz). Flats and the two sharps that have no
//! black key (`E#`, `B#`) are folded onto those twelve names, shifting the
//! octave where the fold crosses C.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use winnow::ascii::digit1;
use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::{any, one_of};

use crate::error::ChordError;

type PResult<T> = winnow::ModalResult<T>;

/// Octave that carries the reference frequencies.
pub const REFERENCE_OCTAVE: i32 = 4;

/// Natural note letter, in scale order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    /// Parse a letter, ignoring case.
    pub fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    /// The natural letter immediately below this one (C wraps to B).
    pub fn previous(self) -> Letter {
        match self {
            Letter::C => Letter::B,
            Letter::D => Letter::C,
            Letter::E => Letter::D,
            Letter::F => Letter::E,
            Letter::G => Letter::F,
            Letter::A => Letter::G,
            Letter::B => Letter::A,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accidental {
    Sharp,
    Flat,
}

/// One of the twelve equal-temperament pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes, lowest first.
    pub fn all() -> [PitchClass; 12] {
        [
            PitchClass::C,
            PitchClass::CSharp,
            PitchClass::D,
            PitchClass::DSharp,
            PitchClass::E,
            PitchClass::F,
            PitchClass::FSharp,
            PitchClass::G,
            PitchClass::GSharp,
            PitchClass::A,
            PitchClass::ASharp,
            PitchClass::B,
        ]
    }

    /// Canonical name, sharps only.
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Look up a canonical name (`"C"`, `"F#"`, ...). Flats are not canonical.
    pub fn from_name(name: &str) -> Option<PitchClass> {
        PitchClass::all().into_iter().find(|p| p.name() == name)
    }

    /// Frequency in Hz at octave 4.
    pub fn reference_frequency(self) -> f64 {
        match self {
            PitchClass::C => 261.63,
            PitchClass::CSharp => 277.18,
            PitchClass::D => 293.66,
            PitchClass::DSharp => 311.13,
            PitchClass::E => 329.63,
            PitchClass::F => 349.23,
            PitchClass::FSharp => 369.99,
            PitchClass::G => 392.00,
            PitchClass::GSharp => 415.30,
            PitchClass::A => 440.00,
            PitchClass::ASharp => 466.16,
            PitchClass::B => 493.88,
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A letter + accidental folded onto the twelve-name table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedNote {
    pub name: PitchClass,
    /// Reference frequency, already shifted when the fold crossed C.
    pub frequency: f64,
}

/// Resolve a letter and optional accidental to a canonical pitch class.
///
/// - flat of L -> sharp of the letter below L (`Db` -> `C#`)
/// - `Cb` -> `B` an octave down, `B#` -> `C` an octave up
/// - `Fb` -> `E`, `E#` -> `F`
pub fn resolve(letter: Letter, accidental: Option<Accidental>) -> Result<ResolvedNote, ChordError> {
    let (canonical, octave_shift) = match (letter, accidental) {
        (Letter::C, Some(Accidental::Flat)) => (Letter::B.to_string(), -1),
        (Letter::F, Some(Accidental::Flat)) => (Letter::E.to_string(), 0),
        (letter, Some(Accidental::Flat)) => (format!("{}#", letter.previous()), 0),
        (Letter::B, Some(Accidental::Sharp)) => (Letter::C.to_string(), 1),
        (Letter::E, Some(Accidental::Sharp)) => (Letter::F.to_string(), 0),
        (letter, Some(Accidental::Sharp)) => (format!("{}#", letter), 0),
        (letter, None) => (letter.to_string(), 0),
    };

    let name = PitchClass::from_name(&canonical).ok_or(ChordError::UnknownNote(canonical))?;

    Ok(ResolvedNote {
        name,
        frequency: name.reference_frequency() * 2f64.powi(octave_shift),
    })
}

/// Resolve a bare note name such as `"c#"`, `"Db"` or `"E"`.
pub fn resolve_name(text: &str) -> Result<ResolvedNote, ChordError> {
    let (letter, accidental) = (parse_letter, opt(parse_accidental))
        .parse(text)
        .map_err(|_| ChordError::UnknownNote(text.to_string()))?;
    resolve(letter, accidental)
}

/// A textual pitch reference inside a chord stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteToken {
    /// `-`: occupies time, makes no sound.
    Rest,
    Pitched {
        letter: Letter,
        accidental: Option<Accidental>,
        /// `None` means the reference octave.
        octave: Option<i32>,
    },
}

impl NoteToken {
    /// Parse one complete note token (no surrounding text allowed).
    pub fn parse(text: &str) -> Result<NoteToken, ChordError> {
        parse_note_token
            .parse(text)
            .map_err(|_| ChordError::UnknownNote(text.to_string()))
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, NoteToken::Rest)
    }

    /// Frequency in Hz, or `None` for a rest.
    pub fn frequency(&self) -> Result<Option<f64>, ChordError> {
        match *self {
            NoteToken::Rest => Ok(None),
            NoteToken::Pitched {
                letter,
                accidental,
                octave,
            } => {
                let resolved = resolve(letter, accidental)?;
                let octave = octave.unwrap_or(REFERENCE_OCTAVE);
                let frequency = resolved.frequency * 2f64.powi(octave - REFERENCE_OCTAVE);
                // extreme octaves overflow to inf or underflow to zero
                if !frequency.is_finite() || frequency <= 0.0 {
                    return Err(ChordError::UnknownNote(format!("{}{}", resolved.name, octave)));
                }
                Ok(Some(frequency))
            }
        }
    }
}

impl FromStr for NoteToken {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteToken::parse(s)
    }
}

fn parse_letter(input: &mut &str) -> PResult<Letter> {
    any.verify_map(Letter::from_char).parse_next(input)
}

/// `#` is sharp; `b` is flat in either case, since notes are matched upper-cased.
fn parse_accidental(input: &mut &str) -> PResult<Accidental> {
    one_of(['#', 'b', 'B'])
        .map(|c| {
            if c == '#' {
                Accidental::Sharp
            } else {
                Accidental::Flat
            }
        })
        .parse_next(input)
}

fn parse_octave(input: &mut &str) -> PResult<i32> {
    digit1.try_map(str::parse::<i32>).parse_next(input)
}

fn parse_pitched(input: &mut &str) -> PResult<NoteToken> {
    let letter = parse_letter(input)?;
    let accidental = opt(parse_accidental).parse_next(input)?;
    let octave = opt(parse_octave).parse_next(input)?;

    Ok(NoteToken::Pitched {
        letter,
        accidental,
        octave,
    })
}

/// Parse a note token: `-` or letter, accidental, octave.
pub fn parse_note_token(input: &mut &str) -> PResult<NoteToken> {
    alt(('-'.value(NoteToken::Rest), parse_pitched)).parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn freq(text: &str) -> f64 {
        NoteToken::parse(text).unwrap().frequency().unwrap().unwrap()
    }

    #[test]
    fn test_resolve_is_case_stable() {
        for name in ["c#", "db", "e", "fb", "b#", "cb", "g", "ab"] {
            let upper = name.to_uppercase();
            assert_eq!(resolve_name(name).unwrap(), resolve_name(&upper).unwrap());
        }
    }

    #[test]
    fn test_flats_fold_to_previous_sharp() {
        assert_eq!(resolve_name("Db").unwrap().name, PitchClass::CSharp);
        assert_eq!(resolve_name("Eb").unwrap().name, PitchClass::DSharp);
        assert_eq!(resolve_name("Gb").unwrap().name, PitchClass::FSharp);
        assert_eq!(resolve_name("Ab").unwrap().name, PitchClass::GSharp);
        assert_eq!(resolve_name("Bb").unwrap().name, PitchClass::ASharp);
    }

    #[test]
    fn test_sharps_look_up_directly() {
        assert_eq!(resolve_name("C#").unwrap().name, PitchClass::CSharp);
        assert_eq!(resolve_name("D#").unwrap().name, PitchClass::DSharp);
        assert_eq!(resolve_name("F#").unwrap().name, PitchClass::FSharp);
        assert_eq!(resolve_name("G#").unwrap().name, PitchClass::GSharp);
        assert_eq!(resolve_name("A#").unwrap().name, PitchClass::ASharp);
    }

    #[test]
    fn test_enharmonic_identities() {
        let b = resolve_name("B").unwrap().frequency;
        let c = resolve_name("C").unwrap().frequency;
        let e = resolve_name("E").unwrap().frequency;
        let f = resolve_name("F").unwrap().frequency;

        let c_flat = resolve_name("Cb").unwrap();
        assert_eq!(c_flat.name, PitchClass::B);
        assert_eq!(c_flat.frequency, b / 2.0);

        let b_sharp = resolve_name("B#").unwrap();
        assert_eq!(b_sharp.name, PitchClass::C);
        assert_eq!(b_sharp.frequency, c * 2.0);

        assert_eq!(resolve_name("Fb").unwrap().frequency, e);
        assert_eq!(resolve_name("E#").unwrap().frequency, f);
    }

    #[test]
    fn test_resolve_name_rejects_garbage() {
        assert_eq!(
            resolve_name("H"),
            Err(ChordError::UnknownNote("H".to_string()))
        );
        assert!(resolve_name("").is_err());
        assert!(resolve_name("C##").is_err());
    }

    #[test]
    fn test_parse_note_token() {
        assert_eq!(NoteToken::parse("-").unwrap(), NoteToken::Rest);
        assert_eq!(
            NoteToken::parse("c#5").unwrap(),
            NoteToken::Pitched {
                letter: Letter::C,
                accidental: Some(Accidental::Sharp),
                octave: Some(5),
            }
        );
        assert_eq!(
            NoteToken::parse("Bb").unwrap(),
            NoteToken::Pitched {
                letter: Letter::B,
                accidental: Some(Accidental::Flat),
                octave: None,
            }
        );
        assert_eq!(
            "e3".parse::<NoteToken>().unwrap(),
            NoteToken::Pitched {
                letter: Letter::E,
                accidental: None,
                octave: Some(3),
            }
        );
    }

    #[test]
    fn test_parse_note_token_rejects_trailing_text() {
        assert!(NoteToken::parse("A/2").is_err());
        assert!(NoteToken::parse("-3").is_err());
        assert!(NoteToken::parse("(A)").is_err());
        assert!(NoteToken::parse("A99999999999").is_err());
    }

    #[test]
    fn test_octave_scaling() {
        let a4 = freq("A");
        assert_eq!(a4, 440.0);
        assert_eq!(freq("A4"), a4);
        assert_eq!(freq("A5"), 880.0);
        assert_eq!(freq("A3"), 220.0);
        for k in 0..9 {
            let expected = resolve_name("G#").unwrap().frequency * 2f64.powi(k - 4);
            assert_eq!(freq(&format!("G#{}", k)), expected);
        }
    }

    #[test]
    fn test_out_of_range_octave_is_rejected() {
        let huge = NoteToken::parse("A2000").unwrap();
        assert_eq!(
            huge.frequency(),
            Err(ChordError::UnknownNote("A2000".to_string()))
        );
        let tiny = NoteToken::parse("c0").unwrap();
        assert!(tiny.frequency().unwrap().unwrap() > 0.0);
    }

    #[test]
    fn test_octave_applies_after_enharmonic_shift() {
        // Cb5 is B4
        assert_eq!(freq("Cb5"), freq("B4"));
        // B#3 is C4
        assert_eq!(freq("B#3"), freq("C"));
    }

    #[test]
    fn test_rest_has_no_frequency() {
        assert_eq!(NoteToken::Rest.frequency().unwrap(), None);
        assert!(NoteToken::Rest.is_rest());
    }

    #[test]
    fn test_reference_table() {
        assert_eq!(PitchClass::all().len(), 12);
        assert_eq!(PitchClass::A.reference_frequency(), 440.0);
        assert_eq!(PitchClass::from_name("Db"), None);
        for pitch in PitchClass::all() {
            assert_eq!(PitchClass::from_name(pitch.name()), Some(pitch));
        }
    }
}
