//! Mute with a short linear fade.

use super::{Latch, Mode};
use crate::command::EffectId;
use crate::compat::Arc;
use crate::{AtomicFloat, SmoothedValue};

/// Shared half of the choke.
#[derive(Debug)]
pub struct Choke {
    latch: Latch,
    /// Gain at the end of the last processed block.
    gain: AtomicFloat,
}

impl Choke {
    pub fn new() -> Self {
        Self {
            latch: Latch::new(EffectId::Choke),
            gain: AtomicFloat::new(1.0),
        }
    }

    #[inline]
    pub fn latch(&self) -> &Latch {
        &self.latch
    }

    /// Muted (or fading to mute).
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.latch.is_enabled()
    }

    pub fn enable(&self) {
        self.latch.enable();
    }

    pub fn disable(&self) {
        self.latch.disable();
    }

    pub fn toggle(&self) {
        self.latch.toggle();
    }

    pub fn schedule_onset(&self, sample: u64) {
        self.latch.schedule_onset(sample);
    }

    pub fn cancel_scheduled_onset(&self) {
        self.latch.cancel_scheduled_onset();
    }

    pub fn schedule_release(&self, sample: u64) {
        self.latch.schedule_release(sample);
    }

    pub fn cancel_scheduled_release(&self) {
        self.latch.cancel_scheduled_release();
    }

    pub fn onset_mode(&self) -> Mode {
        self.latch.onset_mode()
    }

    pub fn length_mode(&self) -> Mode {
        self.latch.length_mode()
    }

    pub fn set_param(&self, index: u8, value: u32) -> bool {
        self.latch.set_param(index, value)
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain.get()
    }
}

impl Default for Choke {
    fn default() -> Self {
        Self::new()
    }
}

/// Audio-side half of the choke: owns the gain ramp.
#[derive(Debug)]
pub struct ChokeUnit {
    shared: Arc<Choke>,
    gain: SmoothedValue,
}

impl ChokeUnit {
    pub fn new(shared: Arc<Choke>, fade_samples: u32) -> Self {
        Self {
            shared,
            gain: SmoothedValue::new(1.0, fade_samples),
        }
    }

    pub fn shared(&self) -> &Arc<Choke> {
        &self.shared
    }

    pub fn process(&mut self, left: &mut [i16], right: &mut [i16], block_start: u64) {
        let len = left.len().min(right.len());
        self.shared.latch.fire_due(block_start, len as u64);

        let target = if self.shared.is_enabled() { 0.0 } else { 1.0 };
        self.gain.set_target(target);
        self.gain.apply_gain_i16(&mut left[..len], &mut right[..len]);
        self.shared.gain.set(self.gain.current());
    }
}
