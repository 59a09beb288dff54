//! Software output device that records what it is asked to play.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{OutputDevice, Tone, ToneId, ToneList, ToneSink};
use crate::clock::OutputClock;
use crate::envelope::Envelope;
use crate::error::BackendError;
use crate::render::{RenderedBuffer, SineRenderer};
use crate::timeline::FrequencyPath;

/// A buffer handed to [`OutputDevice::play_buffer`].
#[derive(Debug, Clone)]
pub struct BufferPlayback {
    pub buffer: Arc<RenderedBuffer>,
    pub start: f64,
    pub looping: bool,
}

impl BufferPlayback {
    /// Offset into the buffer at device time `t`, or None when not sounding.
    pub fn position_at(&self, t: f64) -> Option<f64> {
        let length = self.buffer.duration_seconds();
        let elapsed = t - self.start;
        if elapsed < 0.0 || length <= 0.0 {
            return None;
        }
        if self.looping {
            Some(elapsed % length)
        } else if elapsed < length {
            Some(elapsed)
        } else {
            None
        }
    }

    /// Completed passes at device time `t`.
    pub fn passes_at(&self, t: f64) -> usize {
        let length = self.buffer.duration_seconds();
        if t <= self.start || length <= 0.0 {
            return 0;
        }
        let passes = ((t - self.start) / length) as usize;
        if self.looping {
            passes
        } else {
            passes.min(1)
        }
    }
}

/// Output device driven by an [`OutputClock`] with no audio hardware
/// behind it.
#[derive(Debug)]
pub struct VirtualOutput {
    clock: OutputClock,
    sample_rate: u32,
    tones: ToneList,
    buffer: Option<BufferPlayback>,
    cancelled: usize,
}

impl VirtualOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            clock: OutputClock::new(),
            sample_rate,
            tones: ToneList::new(),
            buffer: None,
            cancelled: 0,
        }
    }

    pub fn clock(&self) -> &OutputClock {
        &self.clock
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Every tone scheduled and not cancelled, in creation order.
    pub fn tones(&self) -> &[Tone] {
        self.tones.tones()
    }

    /// Tones whose start falls in `[from, to)`.
    pub fn tones_starting_between(&self, from: f64, to: f64) -> impl Iterator<Item = &Tone> {
        self.tones()
            .iter()
            .filter(move |t| t.start >= from && t.start < to)
    }

    pub fn sounding_at(&self, t: f64) -> impl Iterator<Item = &Tone> {
        self.tones().iter().filter(move |tone| tone.is_sounding_at(t))
    }

    /// Tones scheduled for the future.
    pub fn pending(&self) -> usize {
        let now = self.now();
        self.tones().iter().filter(|t| t.start > now).count()
    }

    /// Tones dropped by [`OutputDevice::cancel_scheduled`] so far.
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    pub fn buffer(&self) -> Option<&BufferPlayback> {
        self.buffer.as_ref()
    }
}

impl ToneSink for VirtualOutput {
    fn create_tone(
        &mut self,
        path: &FrequencyPath,
        start: f64,
        end: f64,
    ) -> Result<ToneId, BackendError> {
        self.tones.create_tone(path, start, end)
    }

    fn create_envelope(&mut self, tone: ToneId, envelope: &Envelope) -> Result<(), BackendError> {
        self.tones.create_envelope(tone, envelope)
    }
}

impl OutputDevice for VirtualOutput {
    type Renderer = SineRenderer;

    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn suspend_clock(&mut self) {
        self.clock.suspend();
    }

    fn resume_clock(&mut self) {
        self.clock.resume();
    }

    fn play_buffer(
        &mut self,
        buffer: Arc<RenderedBuffer>,
        at: f64,
        looping: bool,
    ) -> Result<(), BackendError> {
        if buffer.sample_rate != self.sample_rate {
            return Err(BackendError::DeviceUnavailable(format!(
                "buffer is {} Hz, device runs at {} Hz",
                buffer.sample_rate, self.sample_rate
            )));
        }
        self.buffer = Some(BufferPlayback {
            buffer,
            start: at,
            looping,
        });
        Ok(())
    }

    fn stop_buffer(&mut self) {
        self.buffer = None;
    }

    fn cancel_scheduled(&mut self) {
        let now = self.now();
        let tones = self.tones.tones_mut();
        let before = tones.len();

        tones.retain(|t| t.start <= now);
        for tone in tones.iter_mut().filter(|t| t.end > now) {
            tone.end = now;
            if let Some(envelope) = tone.envelope.as_mut() {
                envelope.end = envelope.end.min(now);
            }
        }

        let dropped = before - tones.len();
        self.cancelled += dropped;
        debug!("Cancelled {} scheduled tones at {:.3}s", dropped, now);
    }

    fn offline_renderer(&self) -> SineRenderer {
        SineRenderer::new(self.sample_rate)
    }
}
