//! Configuration loading for glissando.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/glissando/config.toml` (system)
//! 2. `~/.config/glissando/config.toml` (user)
//! 3. `./glissando.toml` (local override), or a path given on the command line
//! 4. Environment variables (`GLISSANDO_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [playback]
//! tempo = 120
//! lead_in_seconds = 0.5
//! loop = true
//! mode = "rendered"
//! sample_rate = 44100
//! schedule_ahead_seconds = 0.1
//!
//! [envelope]
//! attack_ms = 5
//! release_ms = 5
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod playback;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use playback::{EnvelopeConfig, PlaybackConfig, PlaybackMode, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Complete glissando configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GlissConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub envelope: EnvelopeConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl GlissConfig {
    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let files = loader::discover_config_files_with_override(config_path);
        let (mut config, mut sources) = Self::load_files(&files)?;

        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Layer the given files over compiled defaults, without env overrides
    /// or validation.
    pub fn load_files(files: &[PathBuf]) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in files {
            let table = loader::load_table(path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path.clone());
        }

        let origin = sources
            .files
            .last()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("<defaults>"));
        let config = loader::from_table(merged, &origin)?;

        Ok((config, sources))
    }

    /// Check ranges that the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, message: String| Err(ConfigError::Invalid { field, message });
        let playback = &self.playback;

        if !playback.tempo.is_finite() || playback.tempo <= 0.0 {
            return invalid(
                "playback.tempo",
                format!("{} is not a positive number of beats per minute", playback.tempo),
            );
        }
        if !playback.lead_in_seconds.is_finite() || playback.lead_in_seconds < 0.0 {
            return invalid(
                "playback.lead_in_seconds",
                format!("{} is negative", playback.lead_in_seconds),
            );
        }
        if playback.sample_rate == 0 {
            return invalid("playback.sample_rate", "must be non-zero".to_string());
        }
        if !playback.schedule_ahead_seconds.is_finite() || playback.schedule_ahead_seconds < 0.0 {
            return invalid(
                "playback.schedule_ahead_seconds",
                format!("{} is negative", playback.schedule_ahead_seconds),
            );
        }
        for (field, value) in [
            ("envelope.attack_ms", self.envelope.attack_ms),
            ("envelope.release_ms", self.envelope.release_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(field, format!("{value} is negative"));
            }
        }

        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# glissando configuration\n\n");

        output.push_str("[playback]\n");
        output.push_str(&format!("tempo = {:?}\n", self.playback.tempo));
        output.push_str(&format!(
            "lead_in_seconds = {:?}\n",
            self.playback.lead_in_seconds
        ));
        output.push_str(&format!("loop = {}\n", self.playback.looping));
        output.push_str(&format!("mode = \"{}\"\n", self.playback.mode));
        output.push_str(&format!("sample_rate = {}\n", self.playback.sample_rate));
        output.push_str(&format!(
            "schedule_ahead_seconds = {:?}\n",
            self.playback.schedule_ahead_seconds
        ));

        output.push_str("\n[envelope]\n");
        output.push_str(&format!("attack_ms = {:?}\n", self.envelope.attack_ms));
        output.push_str(&format!("release_ms = {:?}\n", self.envelope.release_ms));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = {:?}\n", self.telemetry.log_level));

        output
    }
}
