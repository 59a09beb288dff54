//! Fixture-based tests for partition parsing.
//!
//! Each .partition file in tests/fixtures/ is parsed at 120 bpm, where one
//! beat lasts half a second.

use partition::{parse, ChordError, NotationError, Partition};
use std::fs;
use std::path::Path;

const TEMPO: f64 = 120.0;

fn load_fixture(name: &str) -> String {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.partition", name));

    fs::read_to_string(&fixture_path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", name, e))
}

fn parse_fixture(name: &str) -> Partition {
    let text = load_fixture(name);
    parse(&text, TEMPO).unwrap_or_else(|e| panic!("Fixture {} failed to parse: {}", name, e))
}

fn assert_fixture(name: &str, chords: usize, seconds: f64, rests: usize) {
    let partition = parse_fixture(name);

    assert_eq!(partition.len(), chords, "Fixture {} chord count", name);
    assert!(
        (partition.total_duration() - seconds).abs() < 1e-9,
        "Fixture {} lasts {}s, expected {}s",
        name,
        partition.total_duration(),
        seconds
    );
    assert_eq!(
        partition.iter().filter(|c| c.is_rest()).count(),
        rests,
        "Fixture {} rest count",
        name
    );

    for chord in &partition {
        assert!(chord.duration_seconds > 0.0, "{} has no length", chord.source);
        for stage in &chord.frequency_stages {
            assert_eq!(stage.len(), chord.note_count(), "{} stage arity", chord.source);
            assert!(stage.iter().all(|f| *f > 0.0), "{} has a silent note", chord.source);
        }
    }
}

#[test]
fn test_fixture_scale() {
    assert_fixture("scale", 8, 4.0, 0);
}

#[test]
fn test_fixture_triads() {
    assert_fixture("triads", 4, 5.0, 0);
}

#[test]
fn test_fixture_glides() {
    assert_fixture("glides", 4, 10.0, 0);

    let partition = parse_fixture("glides");
    let stages: Vec<usize> = partition.iter().map(|c| c.stage_count()).collect();
    assert_eq!(stages, vec![2, 2, 2, 3]);
}

#[test]
fn test_fixture_rests() {
    assert_fixture("rests", 6, 3.5, 3);
}

#[test]
fn test_fixture_enharmonics() {
    assert_fixture("enharmonics", 14, 7.0, 0);

    let partition = parse_fixture("enharmonics");
    let freqs: Vec<f64> = partition
        .iter()
        .map(|c| c.frequency_stages[0][0])
        .collect();

    // written in enharmonic pairs
    for pair in freqs[..12].chunks(2) {
        assert!(
            (pair[0] - pair[1]).abs() < 1e-9,
            "enharmonic pair differs: {:?}",
            pair
        );
    }
    assert_eq!(freqs[12], 369.99);
    assert_eq!(freqs[13], 415.3);
}

#[test]
fn test_fixture_demo() {
    assert_fixture("demo", 88, 36.0, 3);
}

#[test]
fn test_fixture_tour() {
    assert_fixture("tour", 24, 21.5, 2);
}

#[test]
fn test_fixture_bad_glide() {
    let err = parse(&load_fixture("bad_glide"), TEMPO).unwrap_err();
    assert_eq!(
        err,
        NotationError::Chord {
            index: 2,
            token: "(A,B)->(A,C,D)*2".to_string(),
            source: ChordError::GlideArityMismatch {
                stage: 1,
                expected: 2,
                found: 3,
            },
        }
    );
}

#[test]
fn test_fixture_unclosed() {
    let err = parse(&load_fixture("unclosed"), TEMPO).unwrap_err();
    assert!(
        matches!(err, NotationError::UnbalancedGroup { .. }),
        "unexpected error: {}",
        err
    );
}
