//! Engine configuration.

use crate::transport::{BEATS_PER_BAR, DEFAULT_BPM, MAX_BPM, MIN_BPM};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the looper engine.
///
/// Fixed at construction: every buffer in the engine is sized from these
/// values once and never reallocated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Samples per audio block.
    pub block_size: usize,
    /// Subtracted from the distance to a quantized onset so that the effect
    /// is already engaged when the downbeat transient arrives.
    pub lookahead_samples: u32,
    /// Choke gain ramp length.
    pub fade_ms: f32,
    /// Freeze loop length.
    pub freeze_ms: u32,
    /// Stutter capture holds one bar at this tempo.
    pub min_capture_bpm: u32,
    /// Samples past a beat/bar boundary that still count as "on" it.
    pub boundary_tolerance: u32,
    /// Bound on queued UI events before new ones are dropped.
    pub ui_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 128,
            lookahead_samples: 128,
            fade_ms: 3.0,
            freeze_ms: 3,
            min_capture_bpm: 70,
            boundary_tolerance: 16,
            ui_channel_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(8_000..=192_000).contains(&self.sample_rate) {
            return Err(Error::InvalidSampleRate(self.sample_rate));
        }
        if self.block_size == 0 {
            return Err(Error::InvalidBlockSize(self.block_size));
        }
        if !(self.fade_ms > 0.0 && self.fade_ms.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "fade_ms {} must be positive",
                self.fade_ms
            )));
        }
        if self.freeze_ms == 0 {
            return Err(Error::InvalidConfig(
                "freeze_ms must be non-zero".into(),
            ));
        }
        if !(MIN_BPM..=MAX_BPM).contains(&self.min_capture_bpm) {
            return Err(Error::InvalidConfig(format!(
                "min_capture_bpm {} out of range ({}-{} BPM)",
                self.min_capture_bpm, MIN_BPM, MAX_BPM
            )));
        }
        if self.ui_channel_capacity == 0 {
            return Err(Error::InvalidConfig(
                "ui_channel_capacity must be non-zero".into(),
            ));
        }
        if self.boundary_tolerance as usize >= self.block_size {
            return Err(Error::InvalidConfig(format!(
                "boundary_tolerance {} must be shorter than one block ({} samples)",
                self.boundary_tolerance, self.block_size
            )));
        }
        let shortest_beat = self.samples_per_beat_at(MAX_BPM);
        if self.lookahead_samples >= shortest_beat {
            return Err(Error::InvalidConfig(format!(
                "lookahead_samples {} must be shorter than one beat at {} BPM ({} samples)",
                self.lookahead_samples, MAX_BPM, shortest_beat
            )));
        }
        Ok(())
    }

    /// Length of the choke fade in samples (at least one).
    pub fn fade_samples(&self) -> u32 {
        ((self.fade_ms / 1000.0) * self.sample_rate as f32).max(1.0) as u32
    }

    pub fn freeze_buffer_samples(&self) -> usize {
        ((self.freeze_ms as u64 * self.sample_rate as u64) / 1000).max(1) as usize
    }

    /// One 4/4 bar at `min_capture_bpm`.
    pub fn capture_buffer_samples(&self) -> usize {
        self.samples_per_beat_at(self.min_capture_bpm) as usize * BEATS_PER_BAR as usize
    }

    pub fn default_samples_per_beat(&self) -> u32 {
        self.samples_per_beat_at(DEFAULT_BPM)
    }

    pub fn samples_per_beat_at(&self, bpm: u32) -> u32 {
        if bpm == 0 {
            return 0;
        }
        self.sample_rate * 60 / bpm
    }
}
