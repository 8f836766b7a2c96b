//! Musical grid quantization on top of the [`TimeKeeper`].

use super::TimeKeeper;
use crate::compat::{AtomicU32, AtomicU8};
use crate::{Error, Ordering, Result};
use serde::{Deserialize, Serialize};

/// Grid resolution shared by every effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Quantization {
    /// Thirty-second note (beat / 8).
    Q32 = 0,
    /// Sixteenth note (beat / 4).
    #[default]
    Q16 = 1,
    /// Eighth note (beat / 2).
    Q8 = 2,
    /// Quarter note (one beat).
    Q4 = 3,
}

impl Quantization {
    fn from_u8(val: u8) -> Self {
        match val {
            0 => Quantization::Q32,
            2 => Quantization::Q8,
            3 => Quantization::Q4,
            _ => Quantization::Q16,
        }
    }

    /// Length of one grid unit.
    #[inline]
    pub fn duration_samples(self, samples_per_beat: u32) -> u32 {
        match self {
            Quantization::Q32 => samples_per_beat / 8,
            Quantization::Q16 => samples_per_beat / 4,
            Quantization::Q8 => samples_per_beat / 2,
            Quantization::Q4 => samples_per_beat,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Quantization::Q32 => "1/32",
            Quantization::Q16 => "1/16",
            Quantization::Q8 => "1/8",
            Quantization::Q4 => "1/4",
        }
    }
}

impl TryFrom<u8> for Quantization {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0..=3 => Ok(Self::from_u8(value)),
            other => Err(Error::InvalidQuantization(other)),
        }
    }
}

/// Process-wide grid setting plus the onset lookahead.
#[derive(Debug)]
pub struct Quantizer {
    grid: AtomicU8,
    lookahead: AtomicU32,
}

impl Quantizer {
    pub fn new(grid: Quantization, lookahead_samples: u32) -> Self {
        Self {
            grid: AtomicU8::new(grid as u8),
            lookahead: AtomicU32::new(lookahead_samples),
        }
    }

    #[inline]
    pub fn grid(&self) -> Quantization {
        Quantization::from_u8(self.grid.load(Ordering::Acquire))
    }

    pub fn set_grid(&self, grid: Quantization) {
        self.grid.store(grid as u8, Ordering::Release);
        tracing::debug!(grid = grid.name(), "quantization changed");
    }

    #[inline]
    pub fn lookahead(&self) -> u32 {
        self.lookahead.load(Ordering::Relaxed)
    }

    pub fn set_lookahead(&self, samples: u32) {
        self.lookahead.store(samples, Ordering::Relaxed);
    }

    /// One grid unit at the current tempo.
    #[inline]
    pub fn duration(&self, timekeeper: &TimeKeeper) -> u32 {
        self.grid().duration_samples(timekeeper.samples_per_beat())
    }

    /// Distance to the next grid boundary on the tick grid.
    #[inline]
    pub fn samples_to_next_boundary(&self, timekeeper: &TimeKeeper) -> u32 {
        timekeeper.samples_to_next_subdivision(self.duration(timekeeper))
    }

    /// Absolute deadline for a quantized onset: the next boundary minus the
    /// lookahead, never earlier than now.
    pub fn onset_deadline(&self, timekeeper: &TimeKeeper) -> u64 {
        let wait = self
            .samples_to_next_boundary(timekeeper)
            .saturating_sub(self.lookahead());
        timekeeper.sample_position() + wait as u64
    }

    /// Absolute deadline of the next grid boundary, without lookahead.
    pub fn boundary_deadline(&self, timekeeper: &TimeKeeper) -> u64 {
        timekeeper.sample_position() + self.samples_to_next_boundary(timekeeper) as u64
    }
}
