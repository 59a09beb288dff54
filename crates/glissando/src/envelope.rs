//! Attack/release amplitude envelopes.

use glissconf::EnvelopeConfig;
use serde::{Deserialize, Serialize};

/// Ramp lengths in seconds, before fitting to a particular note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeShape {
    pub attack: f64,
    pub release: f64,
}

impl EnvelopeShape {
    pub const DEFAULT_RAMP: f64 = 0.005;

    pub fn new(attack: f64, release: f64) -> Self {
        Self {
            attack: attack.max(0.0),
            release: release.max(0.0),
        }
    }

    /// Fit this shape to `[start, end)` at the given peak amplitude.
    pub fn fit(&self, amplitude: f64, start: f64, end: f64) -> Envelope {
        let length = (end - start).max(0.0);
        let ramps = self.attack + self.release;
        let scale = if ramps > length && ramps > 0.0 {
            length / ramps
        } else {
            1.0
        };

        Envelope {
            amplitude,
            start,
            end,
            attack: self.attack * scale,
            release: self.release * scale,
        }
    }
}

impl Default for EnvelopeShape {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RAMP, Self::DEFAULT_RAMP)
    }
}

impl From<&EnvelopeConfig> for EnvelopeShape {
    fn from(config: &EnvelopeConfig) -> Self {
        Self::new(config.attack_seconds(), config.release_seconds())
    }
}

/// Trapezoid gain curve: 0 at `start`, `amplitude` after the attack, back to
/// 0 at `end`. Both ramps lie inside `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub amplitude: f64,
    pub start: f64,
    pub end: f64,
    pub attack: f64,
    pub release: f64,
}

impl Envelope {
    pub fn attack_end(&self) -> f64 {
        self.start + self.attack
    }

    pub fn release_start(&self) -> f64 {
        self.end - self.release
    }

    /// Gain at absolute time `t`.
    pub fn gain_at(&self, t: f64) -> f64 {
        if t < self.start || t >= self.end {
            0.0
        } else if t < self.attack_end() {
            self.amplitude * (t - self.start) / self.attack
        } else if t > self.release_start() {
            self.amplitude * (self.end - t) / self.release
        } else {
            self.amplitude
        }
    }

    /// The same curve moved by `offset` seconds.
    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
            ..*self
        }
    }
}
