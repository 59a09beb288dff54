//! Audio backend seam.
//!
//! The scheduler never synthesizes anything itself. It issues tone and
//! envelope requests against a [`ToneSink`], asks an [`OfflineRenderer`] to
//! turn a recorded [`OfflineContext`] into samples, and drives an
//! [`OutputDevice`] for playback. Devices are acquired lazily through a
//! [`DeviceProvider`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::BackendError;
use crate::render::RenderedBuffer;
use crate::timeline::{FrequencyPath, Timeline};

/// Handle to a tone created on a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToneId(pub u64);

/// A tone as a sink recorded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub id: ToneId,
    pub path: FrequencyPath,
    pub start: f64,
    pub end: f64,
    /// Gain curve; a tone without one plays at unit gain.
    pub envelope: Option<Envelope>,
}

impl Tone {
    pub fn gain_at(&self, t: f64) -> f64 {
        match &self.envelope {
            Some(envelope) => envelope.gain_at(t),
            None if t >= self.start && t < self.end => 1.0,
            None => 0.0,
        }
    }

    pub fn is_sounding_at(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Accepts tone and envelope requests.
pub trait ToneSink {
    /// Schedule a tone following `path` over `[start, end)`.
    fn create_tone(
        &mut self,
        path: &FrequencyPath,
        start: f64,
        end: f64,
    ) -> Result<ToneId, BackendError>;

    /// Attach a gain envelope to a tone.
    fn create_envelope(&mut self, tone: ToneId, envelope: &Envelope) -> Result<(), BackendError>;
}

/// Issue every event of `timeline` to `sink`, chord by chord.
///
/// Returns the number of tones created.
pub fn emit_timeline<S>(timeline: &Timeline, sink: &mut S) -> Result<usize, BackendError>
where
    S: ToneSink + ?Sized,
{
    for event in &timeline.events {
        let tone = sink.create_tone(&event.frequency_path, event.start_time, event.end_time)?;
        sink.create_envelope(tone, &event.envelope)?;
    }
    Ok(timeline.events.len())
}

/// Records tones and their envelopes in creation order.
#[derive(Debug, Clone, Default)]
pub struct ToneList {
    tones: Vec<Tone>,
    next_id: u64,
}

impl ToneList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tones(&self) -> &[Tone] {
        &self.tones
    }

    pub fn tones_mut(&mut self) -> &mut Vec<Tone> {
        &mut self.tones
    }

    pub fn len(&self) -> usize {
        self.tones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }
}

impl ToneSink for ToneList {
    fn create_tone(
        &mut self,
        path: &FrequencyPath,
        start: f64,
        end: f64,
    ) -> Result<ToneId, BackendError> {
        let id = ToneId(self.next_id);
        self.next_id += 1;
        self.tones.push(Tone {
            id,
            path: path.clone(),
            start,
            end,
            envelope: None,
        });
        Ok(id)
    }

    fn create_envelope(&mut self, tone: ToneId, envelope: &Envelope) -> Result<(), BackendError> {
        let target = self
            .tones
            .iter_mut()
            .rev()
            .find(|t| t.id == tone)
            .ok_or(BackendError::UnknownTone(tone))?;
        target.envelope = Some(*envelope);
        Ok(())
    }
}

/// Tones to render into a buffer of `duration_seconds`.
#[derive(Debug, Clone)]
pub struct OfflineContext {
    pub duration_seconds: f64,
    pub tones: ToneList,
}

impl OfflineContext {
    pub fn new(duration_seconds: f64) -> Self {
        Self {
            duration_seconds,
            tones: ToneList::new(),
        }
    }
}

impl ToneSink for OfflineContext {
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

/// Turns an offline context into samples.
#[async_trait]
pub trait OfflineRenderer: Send + Sync {
    fn sample_rate(&self) -> u32;

    async fn render_offline(&self, context: OfflineContext) -> Result<RenderedBuffer, BackendError>;
}

/// A real-time output with its own clock.
///
/// Times are seconds on the device clock. The clock only advances while
/// resumed.
pub trait OutputDevice: ToneSink + Send + 'static {
    type Renderer: OfflineRenderer + 'static;

    fn now(&self) -> f64;

    fn suspend_clock(&mut self);

    fn resume_clock(&mut self);

    /// Start `buffer` at device time `at`, repeating it when `looping`.
    fn play_buffer(
        &mut self,
        buffer: Arc<RenderedBuffer>,
        at: f64,
        looping: bool,
    ) -> Result<(), BackendError>;

    fn stop_buffer(&mut self);

    /// Drop tones that have not started and cut sounding ones off now.
    fn cancel_scheduled(&mut self);

    fn offline_renderer(&self) -> Self::Renderer;
}

/// Lazily produces the output device on first use.
pub trait DeviceProvider: Send {
    type Device: OutputDevice;

    fn acquire(&mut self) -> Result<Self::Device, BackendError>;
}

impl<F, D> DeviceProvider for F
where
    F: FnMut() -> Result<D, BackendError> + Send,
    D: OutputDevice,
{
    type Device = D;

    fn acquire(&mut self) -> Result<D, BackendError> {
        self()
    }
}
