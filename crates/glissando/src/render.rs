//! Offline sine synthesis and WAV export.

use std::f64::consts::TAU;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{OfflineContext, OfflineRenderer, Tone};
use crate::error::BackendError;

/// Mono samples at a fixed rate.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBuffer {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl RenderedBuffer {
    pub fn silent(frames: usize, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: vec![0.0; frames],
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// This buffer played `passes` times back to back.
    pub fn repeated(&self, passes: usize) -> Self {
        Self {
            sample_rate: self.sample_rate,
            samples: self.samples.repeat(passes),
        }
    }

    /// Write 16-bit mono PCM.
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            let int_sample = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(int_sample)?;
        }
        writer.finalize()?;

        Ok(())
    }
}

/// Number of frames covering `seconds` at `sample_rate`.
pub fn frames_for(seconds: f64, sample_rate: u32) -> usize {
    (seconds.max(0.0) * f64::from(sample_rate)).round() as usize
}

/// Reference renderer: one phase-continuous sine oscillator per tone.
#[derive(Debug, Clone, Copy)]
pub struct SineRenderer {
    sample_rate: u32,
}

impl SineRenderer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Render synchronously on the calling thread.
    pub fn render_blocking(&self, context: &OfflineContext) -> RenderedBuffer {
        let frames = frames_for(context.duration_seconds, self.sample_rate);
        let mut buffer = RenderedBuffer::silent(frames, self.sample_rate);

        for tone in context.tones.tones() {
            mix_tone(&mut buffer.samples, tone, self.sample_rate);
        }

        buffer
    }
}

fn mix_tone(samples: &mut [f32], tone: &Tone, sample_rate: u32) {
    let rate = f64::from(sample_rate);
    let first = ((tone.start * rate).ceil().max(0.0) as usize).min(samples.len());
    let last = ((tone.end * rate).ceil().max(0.0) as usize).min(samples.len());

    let mut phase = 0.0f64;
    for (frame, sample) in samples.iter_mut().enumerate().take(last).skip(first) {
        let t = frame as f64 / rate;
        *sample += (phase.sin() * tone.gain_at(t)) as f32;
        phase = (phase + TAU * tone.path.frequency_at(t) / rate) % TAU;
    }
}

#[async_trait]
impl OfflineRenderer for SineRenderer {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn render_offline(&self, context: OfflineContext) -> Result<RenderedBuffer, BackendError> {
        if self.sample_rate == 0 {
            return Err(BackendError::Render("sample rate must be non-zero".to_string()));
        }

        let renderer = *self;
        let tones = context.tones.len();
        let buffer = tokio::task::spawn_blocking(move || renderer.render_blocking(&context)).await?;

        debug!(
            "Rendered {} tones into {} frames ({:.3}s at {} Hz)",
            tones,
            buffer.frames(),
            buffer.duration_seconds(),
            buffer.sample_rate
        );

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::emit_timeline;
    use crate::timeline::Scheduler;

    fn context_for(text: &str) -> OfflineContext {
        let partition = partition::parse(text, 120.0).unwrap();
        let timeline = Scheduler::default().timeline(&partition, 0.0);
        let mut context = OfflineContext::new(partition.total_duration());
        emit_timeline(&timeline, &mut context).unwrap();
        context
    }

    #[test]
    fn test_buffer_length_matches_one_pass() {
        for rate in [8_000, 22_050, 44_100, 48_000] {
            let context = context_for("c/2,(e,g)*3,-/4,c->a*2");
            let buffer = SineRenderer::new(rate).render_blocking(&context);
            let period = 1.0 / f64::from(rate);
            assert!(
                (buffer.duration_seconds() - context.duration_seconds).abs() <= period,
                "{} Hz: {} vs {}",
                rate,
                buffer.duration_seconds(),
                context.duration_seconds
            );
        }
    }

    #[test]
    fn test_rest_is_silent() {
        let context = context_for("-,a");
        let buffer = SineRenderer::new(8_000).render_blocking(&context);
        assert!(buffer.samples[..4_000].iter().all(|s| *s == 0.0));
        assert!(buffer.samples[4_000..].iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_chord_stays_within_unit_range() {
        let context = context_for("(c,e,g,c5)*2");
        let buffer = SineRenderer::new(22_050).render_blocking(&context);
        assert!(buffer.peak() <= 1.0 + 1e-6);
        assert!(buffer.peak() > 0.1);
    }

    #[test]
    fn test_envelope_starts_and_ends_at_zero() {
        let context = context_for("a");
        let buffer = SineRenderer::new(44_100).render_blocking(&context);
        assert_eq!(buffer.samples[0], 0.0);
        assert!(buffer.samples.last().unwrap().abs() < 0.01);
    }

    #[test]
    fn test_repeated() {
        let buffer = RenderedBuffer {
            sample_rate: 4,
            samples: vec![0.0, 0.5, 1.0, 0.5],
        };
        let twice = buffer.repeated(2);
        assert_eq!(twice.frames(), 8);
        assert_eq!(twice.duration_seconds(), 2.0);
    }

    #[test]
    fn test_write_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pass.wav");
        let buffer = SineRenderer::new(8_000).render_blocking(&context_for("c,e"));
        buffer.write_wav(&path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len() as usize, buffer.frames());
    }

    #[tokio::test]
    async fn test_render_offline_on_blocking_pool() {
        let renderer = SineRenderer::new(8_000);
        let buffer = renderer.render_offline(context_for("c,d,e")).await.unwrap();
        assert_eq!(buffer.frames(), 12_000);
    }

    #[tokio::test]
    async fn test_zero_sample_rate_is_an_error() {
        let err = SineRenderer::new(0)
            .render_offline(OfflineContext::new(1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Render(_)));
    }
}
