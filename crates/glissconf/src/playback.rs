//! Playback and envelope settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a partition is turned into sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Render one pass offline and loop the buffer.
    #[default]
    Rendered,
    /// Schedule pass after pass against the output clock.
    Live,
}

impl PlaybackMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackMode::Rendered => "rendered",
            PlaybackMode::Live => "live",
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rendered" | "offline" => Ok(PlaybackMode::Rendered),
            "live" => Ok(PlaybackMode::Live),
            other => Err(format!("unknown playback mode {other:?}")),
        }
    }
}

/// Tempo, lead-in, looping and output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Quarter-note beats per minute.
    /// Default: 120
    #[serde(default = "PlaybackConfig::default_tempo")]
    pub tempo: f64,

    /// Silence before the first chord, in seconds.
    /// Default: 0
    #[serde(default)]
    pub lead_in_seconds: f64,

    /// Repeat the partition until stopped.
    /// Default: true
    #[serde(rename = "loop", default = "PlaybackConfig::default_loop")]
    pub looping: bool,

    /// Default: rendered
    #[serde(default)]
    pub mode: PlaybackMode,

    /// Offline render sample rate in Hz.
    /// Default: 44100
    #[serde(default = "PlaybackConfig::default_sample_rate")]
    pub sample_rate: u32,

    /// How far ahead of a pass boundary the live loop lays down the next pass.
    /// Default: 0.1
    #[serde(default = "PlaybackConfig::default_schedule_ahead")]
    pub schedule_ahead_seconds: f64,
}

impl PlaybackConfig {
    fn default_tempo() -> f64 {
        120.0
    }

    fn default_loop() -> bool {
        true
    }

    fn default_sample_rate() -> u32 {
        44_100
    }

    fn default_schedule_ahead() -> f64 {
        0.1
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tempo: Self::default_tempo(),
            lead_in_seconds: 0.0,
            looping: Self::default_loop(),
            mode: PlaybackMode::default(),
            sample_rate: Self::default_sample_rate(),
            schedule_ahead_seconds: Self::default_schedule_ahead(),
        }
    }
}

/// Attack and release ramps applied to every tone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Default: 5
    #[serde(default = "EnvelopeConfig::default_ramp_ms")]
    pub attack_ms: f64,

    /// Default: 5
    #[serde(default = "EnvelopeConfig::default_ramp_ms")]
    pub release_ms: f64,
}

impl EnvelopeConfig {
    fn default_ramp_ms() -> f64 {
        5.0
    }

    pub fn attack_seconds(&self) -> f64 {
        self.attack_ms / 1000.0
    }

    pub fn release_seconds(&self) -> f64 {
        self.release_ms / 1000.0
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack_ms: Self::default_ramp_ms(),
            release_ms: Self::default_ramp_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
