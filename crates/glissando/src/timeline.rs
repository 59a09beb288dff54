//! Timeline construction: resolved chords laid end to end as tone events.

use partition::{NotationError, Partition};
use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, EnvelopeShape};

/// Frequency reached at `time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub time: f64,
    pub frequency: f64,
}

/// Piecewise-linear frequency curve of one note.
///
/// Before the first point the first frequency holds; after the last point the
/// last frequency holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyPath {
    pub points: Vec<ControlPoint>,
}

impl FrequencyPath {
    /// Spread `stages` evenly over `[start, start + duration)`: stage `k` of
    /// `S` lands at `start + k * duration / S`.
    pub fn spread(stages: &[f64], start: f64, duration: f64) -> Self {
        let step = duration / stages.len().max(1) as f64;
        let points = stages
            .iter()
            .enumerate()
            .map(|(k, &frequency)| ControlPoint {
                time: start + k as f64 * step,
                frequency,
            })
            .collect();
        Self { points }
    }

    pub fn hold(frequency: f64, start: f64) -> Self {
        Self::spread(&[frequency], start, 0.0)
    }

    pub fn is_glide(&self) -> bool {
        self.points.len() > 1
    }

    pub fn initial_frequency(&self) -> f64 {
        self.points.first().map_or(0.0, |p| p.frequency)
    }

    pub fn final_frequency(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.frequency)
    }

    /// Frequency at absolute time `t`.
    pub fn frequency_at(&self, t: f64) -> f64 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        if t <= first.time {
            return first.frequency;
        }

        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t < b.time {
                let span = b.time - a.time;
                if span <= 0.0 {
                    return b.frequency;
                }
                return a.frequency + (b.frequency - a.frequency) * (t - a.time) / span;
            }
        }

        self.final_frequency()
    }

    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| ControlPoint {
                    time: p.time + offset,
                    frequency: p.frequency,
                })
                .collect(),
        }
    }
}

/// One sounding note of one chord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Index of the chord in its partition.
    pub chord_index: usize,
    pub frequency_path: FrequencyPath,
    pub start_time: f64,
    pub end_time: f64,
    /// Peak amplitude, `1 / notes in the chord`.
    pub amplitude: f64,
    pub envelope: Envelope,
}

impl ScheduledEvent {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            chord_index: self.chord_index,
            frequency_path: self.frequency_path.shifted(offset),
            start_time: self.start_time + offset,
            end_time: self.end_time + offset,
            amplitude: self.amplitude,
            envelope: self.envelope.shifted(offset),
        }
    }
}

/// Time span claimed by one chord, sounding or not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChordSlot {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub rest: bool,
}

impl ChordSlot {
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// One pass of a partition on an absolute timeline.
///
/// `start` is the lead-in offset and `end` is where the last chord finishes;
/// slots tile `[start, end)` without gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub start: f64,
    pub end: f64,
    pub slots: Vec<ChordSlot>,
    pub events: Vec<ScheduledEvent>,
}

impl Timeline {
    /// Length of the chords, excluding the lead-in.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn events_for(&self, chord_index: usize) -> impl Iterator<Item = &ScheduledEvent> {
        self.events
            .iter()
            .filter(move |e| e.chord_index == chord_index)
    }

    /// The slot playing at time `t`, if any.
    pub fn slot_at(&self, t: f64) -> Option<&ChordSlot> {
        self.slots.iter().find(|slot| slot.contains(t))
    }

    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
            slots: self
                .slots
                .iter()
                .map(|s| ChordSlot {
                    start: s.start + offset,
                    end: s.end + offset,
                    ..*s
                })
                .collect(),
            events: self.events.iter().map(|e| e.shifted(offset)).collect(),
        }
    }
}

/// Lays partitions onto timelines.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    envelope: EnvelopeShape,
}

impl Scheduler {
    pub fn new(envelope: EnvelopeShape) -> Self {
        Self { envelope }
    }

    pub fn envelope(&self) -> EnvelopeShape {
        self.envelope
    }

    /// Build the timeline of one pass, starting at `offset`.
    ///
    /// All events of chord N are produced before chord N+1 is looked at; rests
    /// advance the cursor without producing events.
    pub fn timeline(&self, partition: &Partition, offset: f64) -> Timeline {
        let mut cursor = offset;
        let mut slots = Vec::with_capacity(partition.len());
        let mut events = Vec::new();

        for (index, chord) in partition.iter().enumerate() {
            let start = cursor;
            let end = start + chord.duration_seconds;

            slots.push(ChordSlot {
                index,
                start,
                end,
                rest: chord.is_rest(),
            });

            let notes = chord.note_count();
            if !chord.is_rest() && notes > 0 {
                let amplitude = 1.0 / notes as f64;
                for position in 0..notes {
                    events.push(ScheduledEvent {
                        chord_index: index,
                        frequency_path: FrequencyPath::spread(
                            &chord.note_path(position),
                            start,
                            chord.duration_seconds,
                        ),
                        start_time: start,
                        end_time: end,
                        amplitude,
                        envelope: self.envelope.fit(amplitude, start, end),
                    });
                }
            }

            cursor = end;
        }

        Timeline {
            start: offset,
            end: cursor,
            slots,
            events,
        }
    }

    /// Parse `text` and build its timeline.
    pub fn schedule_text(
        &self,
        text: &str,
        tempo: f64,
        offset: f64,
    ) -> Result<Timeline, NotationError> {
        let partition = partition::parse(text, tempo)?;
        Ok(self.timeline(&partition, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schedule(text: &str, offset: f64) -> Timeline {
        Scheduler::default()
            .schedule_text(text, 120.0, offset)
            .unwrap()
    }

    #[test]
    fn test_scale_end_to_end() {
        let timeline = schedule("C,D,E", 0.0);
        let starts: Vec<f64> = timeline.events.iter().map(|e| e.start_time).collect();
        let freqs: Vec<f64> = timeline
            .events
            .iter()
            .map(|e| e.frequency_path.initial_frequency())
            .collect();

        assert_eq!(starts, vec![0.0, 0.5, 1.0]);
        assert_eq!(freqs, vec![261.63, 293.66, 329.63]);
        assert!(timeline.events.iter().all(|e| e.duration() == 0.5));
        assert_eq!(timeline.end, 1.5);
    }

    #[test]
    fn test_triad_amplitudes() {
        let timeline = schedule("(A,C,E)*2", 0.0);
        assert_eq!(timeline.events.len(), 3);

        let freqs: Vec<f64> = timeline
            .events
            .iter()
            .map(|e| e.frequency_path.initial_frequency())
            .collect();
        assert_eq!(freqs, vec![440.0, 261.63, 329.63]);

        for event in &timeline.events {
            assert_eq!(event.amplitude, 1.0 / 3.0);
            assert_eq!(event.duration(), 1.0);
            assert_eq!(event.envelope.amplitude, event.amplitude);
        }
        let total: f64 = timeline.events.iter().map(|e| e.amplitude).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rest_advances_cursor() {
        let timeline = schedule("c,-,e", 0.0);
        assert_eq!(timeline.events.len(), 2);
        assert_eq!(timeline.events[1].start_time, 1.0);
        assert_eq!(timeline.events[1].chord_index, 2);
        assert!(timeline.slots[1].rest);
        assert_eq!(timeline.events_for(1).count(), 0);
    }

    #[test]
    fn test_lead_in_offsets_everything() {
        let timeline = schedule("c,d/2", 0.25);
        assert_eq!(timeline.start, 0.25);
        assert_eq!(timeline.events[0].start_time, 0.25);
        assert_eq!(timeline.end, 1.0);
        assert_eq!(timeline.duration(), 0.75);
    }

    #[test]
    fn test_contiguous_non_overlapping() {
        let offset = 0.5;
        let timeline = schedule("(c,e)/2,-,d*3,(A,B)->(A5,E)*4,-/4,g", offset);

        let partition = partition::parse("(c,e)/2,-,d*3,(A,B)->(A5,E)*4,-/4,g", 120.0).unwrap();
        let last_end = timeline
            .events
            .iter()
            .map(|e| e.end_time)
            .fold(f64::MIN, f64::max);
        assert!((partition.total_duration() - (last_end - offset)).abs() < 1e-9);

        for pair in timeline.slots.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for a in &timeline.events {
            for b in &timeline.events {
                if a.chord_index != b.chord_index {
                    assert!(a.end_time <= b.start_time || b.end_time <= a.start_time);
                }
            }
            assert!(a.envelope.start >= a.start_time && a.envelope.end <= a.end_time);
        }
    }

    #[test]
    fn test_glide_control_points() {
        let timeline = schedule("c->e->g*3", 0.0);
        let path = &timeline.events[0].frequency_path;

        let times: Vec<f64> = path.points.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        assert_eq!(path.frequency_at(0.0), 261.63);
        assert!((path.frequency_at(0.25) - (261.63 + 329.63) / 2.0).abs() < 1e-9);
        assert_eq!(path.frequency_at(0.5), 329.63);
        // last stage holds to the end
        assert_eq!(path.frequency_at(1.2), 392.0);
        assert!(path.is_glide());
    }

    #[test]
    fn test_single_stage_is_flat() {
        let path = FrequencyPath::hold(440.0, 1.0);
        assert_eq!(path.frequency_at(0.0), 440.0);
        assert_eq!(path.frequency_at(5.0), 440.0);
        assert!(!path.is_glide());
    }

    #[test]
    fn test_slot_at() {
        let timeline = schedule("c,-,e", 0.0);
        assert_eq!(timeline.slot_at(0.7).map(|s| s.index), Some(1));
        assert_eq!(timeline.slot_at(1.5), None);
    }

    #[test]
    fn test_shifted_moves_events_and_envelopes() {
        let timeline = schedule("c->a", 0.0).shifted(10.0);
        let event = &timeline.events[0];
        assert_eq!(event.start_time, 10.0);
        assert_eq!(event.envelope.start, 10.0);
        assert_eq!(event.frequency_path.points[1].time, 10.25);
        assert_eq!(timeline.start, 10.0);
    }

    #[test]
    fn test_notation_error_propagates() {
        let err = Scheduler::default()
            .schedule_text("c,(A,B)->(A,C,D)", 120.0, 0.0)
            .unwrap_err();
        assert!(matches!(err, NotationError::Chord { index: 1, .. }));
    }
}
