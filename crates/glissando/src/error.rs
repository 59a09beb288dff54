//! Error types for scheduling, rendering and playback.

use partition::NotationError;
use thiserror::Error;

use crate::backend::ToneId;

/// Failure reported by an audio backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("output device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("no tone with id {0:?}")]
    UnknownTone(ToneId),

    #[error("offline render failed: {0}")]
    Render(String),

    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Top-level error for the glissando crate.
#[derive(Debug, Error)]
pub enum GlissandoError {
    #[error(transparent)]
    Notation(#[from] NotationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GlissandoError>;
