//! Transport controller: start, pause, resume and stop over one session.
//!
//! Invalid transitions are no-ops. `start` while playing restarts from the
//! top; `start` while paused resumes.

use std::sync::{Arc, Mutex};

use glissconf::{GlissConfig, PlaybackMode};
use partition::{NotationError, Partition};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::{emit_timeline, DeviceProvider, OfflineContext, OfflineRenderer, OutputDevice};
use crate::envelope::EnvelopeShape;
use crate::error::{BackendError, Result};
use crate::live::{lock_device, spawn_live_loop, LiveLoop, LiveReport};
use crate::render::RenderedBuffer;
use crate::session::{PlaybackHandle, PlaybackSession, TransportState};
use crate::timeline::{Scheduler, Timeline};

/// Parsed partition and its rendered pass, valid for one (text, tempo).
#[derive(Debug)]
struct ScheduleCache {
    text: String,
    tempo: f64,
    partition: Arc<Partition>,
    rendered: Option<Arc<RenderedBuffer>>,
}

/// Owns the current partition text, the output device and the playback
/// session.
pub struct TransportController<P: DeviceProvider> {
    provider: P,
    device: Option<Arc<Mutex<P::Device>>>,
    config: GlissConfig,
    scheduler: Scheduler,
    text: String,
    cache: Option<ScheduleCache>,
    session: Option<PlaybackSession>,
}

impl<P: DeviceProvider> TransportController<P> {
    pub fn new(provider: P, config: GlissConfig, text: impl Into<String>) -> Self {
        let scheduler = Scheduler::new(EnvelopeShape::from(&config.envelope));
        Self {
            provider,
            device: None,
            config,
            scheduler,
            text: text.into(),
            cache: None,
            session: None,
        }
    }

    /// A session whose live loop has already returned counts as idle.
    pub fn state(&self) -> TransportState {
        match &self.session {
            Some(session) if !session.handle.is_finished() => session.state,
            _ => TransportState::Idle,
        }
    }

    /// Current partition text.
    pub fn partition(&self) -> &str {
        &self.text
    }

    /// Replace the partition text. A running session keeps playing the old
    /// one until it is stopped and started again.
    pub fn set_partition(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Change the tempo used by the next `start`.
    pub fn set_tempo(&mut self, tempo: f64) {
        self.config.playback.tempo = tempo;
    }

    pub fn config(&self) -> &GlissConfig {
        &self.config
    }

    /// The output device, once a `start` has acquired it.
    pub fn device(&self) -> Option<Arc<Mutex<P::Device>>> {
        self.device.clone()
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Device clock time, or zero before a device exists.
    pub fn now(&self) -> f64 {
        self.device
            .as_ref()
            .map_or(0.0, |device| lock_device(device).now())
    }

    /// Parse the current text at the configured tempo, reusing the last
    /// result when neither changed.
    pub fn resolve_partition(&mut self) -> std::result::Result<Arc<Partition>, NotationError> {
        let tempo = self.config.playback.tempo;
        if let Some(cache) = &self.cache {
            if cache.text == self.text && cache.tempo == tempo {
                return Ok(cache.partition.clone());
            }
        }

        let partition = Arc::new(partition::parse(&self.text, tempo)?);
        self.cache = Some(ScheduleCache {
            text: self.text.clone(),
            tempo,
            partition: partition.clone(),
            rendered: None,
        });
        Ok(partition)
    }

    /// One pass on the device timeline, lead-in included.
    pub fn timeline(&mut self) -> std::result::Result<Timeline, NotationError> {
        let partition = self.resolve_partition()?;
        Ok(self
            .scheduler
            .timeline(&partition, self.config.playback.lead_in_seconds))
    }

    pub async fn start(&mut self) -> Result<()> {
        match self.state() {
            TransportState::Paused => {
                self.resume();
                return Ok(());
            }
            TransportState::Playing => {
                debug!("Restarting playback");
                self.teardown();
            }
            // drops a session whose live loop already returned
            TransportState::Idle => {
                self.teardown();
            }
        }

        let device = self.acquire_device()?;
        let partition = self.resolve_partition()?;
        let playback = self.config.playback.clone();

        let handle = match playback.mode {
            PlaybackMode::Rendered => {
                let buffer = self.rendered_pass(&device, &partition).await?;
                let mut dev = lock_device(&device);
                dev.resume_clock();
                let started_at = dev.now() + playback.lead_in_seconds;
                dev.play_buffer(buffer.clone(), started_at, playback.looping)?;
                PlaybackHandle::Rendered { buffer, started_at }
            }
            PlaybackMode::Live => {
                lock_device(&device).resume_clock();
                let cancel = CancellationToken::new();
                let live = LiveLoop {
                    pass: self.scheduler.timeline(&partition, 0.0),
                    lead_in: playback.lead_in_seconds,
                    looping: playback.looping,
                    schedule_ahead: playback.schedule_ahead_seconds,
                };
                let task = spawn_live_loop(device.clone(), live, cancel.clone());
                PlaybackHandle::Live { cancel, task }
            }
        };

        self.session = Some(PlaybackSession::new(handle, playback.looping));
        info!(
            "Playback started: {} chords, {:.3}s per pass, {} mode, loop={}",
            partition.len(),
            partition.total_duration(),
            playback.mode,
            playback.looping
        );
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state() != TransportState::Playing {
            debug!("Ignoring pause while {}", self.state());
            return;
        }

        if let Some(device) = &self.device {
            lock_device(device).suspend_clock();
        }
        if let Some(session) = self.session.as_mut() {
            session.state = TransportState::Paused;
        }
        info!("Playback paused at {:.3}s", self.now());
    }

    pub fn resume(&mut self) {
        if self.state() != TransportState::Paused {
            debug!("Ignoring resume while {}", self.state());
            return;
        }

        if let Some(device) = &self.device {
            lock_device(device).resume_clock();
        }
        if let Some(session) = self.session.as_mut() {
            session.state = TransportState::Playing;
        }
        info!("Playback resumed at {:.3}s", self.now());
    }

    pub fn stop(&mut self) {
        if self.session.is_none() {
            debug!("Ignoring stop while idle");
            return;
        }

        if self.session.as_ref().is_some_and(|s| s.handle.is_finished()) {
            warn!("Live loop returned before stop; use poll_live to collect its result");
        }
        self.teardown();
        info!("Playback stopped");
    }

    /// Collect the result of a live loop that has returned on its own.
    ///
    /// Returns `Ok(None)` while the loop is still running, or when there is
    /// no live session. A finished loop's session is torn down, and a
    /// failure inside the loop is returned here.
    pub async fn poll_live(&mut self) -> Result<Option<LiveReport>> {
        let finished = self
            .session
            .as_ref()
            .is_some_and(|session| session.handle.is_live() && session.handle.is_finished());
        if !finished {
            return Ok(None);
        }

        let Some(PlaybackHandle::Live { task, .. }) = self.teardown() else {
            return Ok(None);
        };
        match task.await {
            Ok(Ok(report)) => {
                info!("Live playback finished after {} passes", report.passes);
                Ok(Some(report))
            }
            Ok(Err(e)) => {
                error!("Live playback failed: {}", e);
                Err(e.into())
            }
            Err(e) => {
                error!("Live playback task panicked: {}", e);
                Err(BackendError::from(e).into())
            }
        }
    }

    /// Drop the session and silence the device, handing back its handle.
    fn teardown(&mut self) -> Option<PlaybackHandle> {
        let session = self.session.take()?;

        if let PlaybackHandle::Live { cancel, .. } = &session.handle {
            cancel.cancel();
        }
        // cancel first: a pass emitted after this lock is never started
        if let Some(device) = &self.device {
            let mut dev = lock_device(device);
            dev.stop_buffer();
            dev.cancel_scheduled();
        }
        Some(session.handle)
    }

    fn acquire_device(&mut self) -> Result<Arc<Mutex<P::Device>>> {
        if let Some(device) = &self.device {
            return Ok(device.clone());
        }

        let device = Arc::new(Mutex::new(self.provider.acquire()?));
        debug!("Acquired output device");
        self.device = Some(device.clone());
        Ok(device)
    }

    async fn rendered_pass(
        &mut self,
        device: &Arc<Mutex<P::Device>>,
        partition: &Partition,
    ) -> Result<Arc<RenderedBuffer>> {
        if let Some(buffer) = self.cache.as_ref().and_then(|c| c.rendered.clone()) {
            debug!("Reusing rendered pass");
            return Ok(buffer);
        }

        let timeline = self.scheduler.timeline(partition, 0.0);
        let mut context = OfflineContext::new(partition.total_duration());
        emit_timeline(&timeline, &mut context)?;

        let renderer = lock_device(device).offline_renderer();
        let buffer = Arc::new(renderer.render_offline(context).await?);

        if let Some(cache) = self.cache.as_mut() {
            cache.rendered = Some(buffer.clone());
        }
        Ok(buffer)
    }
}
