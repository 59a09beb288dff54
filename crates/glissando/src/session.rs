//! The playback session owned by a transport.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;
use crate::live::LiveReport;
use crate::render::RenderedBuffer;

/// Transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportState::Idle => "idle",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// What is currently producing sound.
#[derive(Debug)]
pub enum PlaybackHandle {
    /// A rendered pass handed to the device, starting at device time
    /// `started_at`.
    Rendered {
        buffer: Arc<RenderedBuffer>,
        started_at: f64,
    },
    /// A running live loop.
    Live {
        cancel: CancellationToken,
        task: JoinHandle<Result<LiveReport, BackendError>>,
    },
}

impl PlaybackHandle {
    pub fn is_live(&self) -> bool {
        matches!(self, PlaybackHandle::Live { .. })
    }

    /// True once a live loop task has returned, by finishing its last pass,
    /// failing or panicking. A rendered buffer never finishes on its own.
    pub fn is_finished(&self) -> bool {
        match self {
            PlaybackHandle::Rendered { .. } => false,
            PlaybackHandle::Live { task, .. } => task.is_finished(),
        }
    }
}

/// Active playback: created by `start`, dropped by `stop`.
#[derive(Debug)]
pub struct PlaybackSession {
    pub handle: PlaybackHandle,
    pub looping: bool,
    /// `Playing` or `Paused`; an idle transport has no session.
    pub state: TransportState,
}

impl PlaybackSession {
    pub fn new(handle: PlaybackHandle, looping: bool) -> Self {
        Self {
            handle,
            looping,
            state: TransportState::Playing,
        }
    }
}
