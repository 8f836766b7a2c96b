//! Short fixed-length buffer loop.

use super::{Latch, Mode};
use crate::command::EffectId;
use crate::compat::{Arc, Vec};

/// Shared half of the freeze.
#[derive(Debug)]
pub struct Freeze {
    latch: Latch,
}

impl Freeze {
    pub fn new() -> Self {
        Self {
            latch: Latch::new(EffectId::Freeze),
        }
    }

    #[inline]
    pub fn latch(&self) -> &Latch {
        &self.latch
    }

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
}

impl Default for Freeze {
    fn default() -> Self {
        Self::new()
    }
}

/// Audio-side half: a circular stereo buffer, recorded while passing audio
/// through and looped while frozen.
#[derive(Debug)]
pub struct FreezeUnit {
    shared: Arc<Freeze>,
    left: Vec<i16>,
    right: Vec<i16>,
    write: usize,
    read: usize,
    frozen: bool,
}

impl FreezeUnit {
    pub fn new(shared: Arc<Freeze>, buffer_samples: usize) -> Self {
        let len = buffer_samples.max(1);
        Self {
            shared,
            left: vec![0; len],
            right: vec![0; len],
            write: 0,
            read: 0,
            frozen: false,
        }
    }

    pub fn shared(&self) -> &Arc<Freeze> {
        &self.shared
    }

    pub fn buffer_len(&self) -> usize {
        self.left.len()
    }

    pub fn process(&mut self, left: &mut [i16], right: &mut [i16], block_start: u64) {
        let len = left.len().min(right.len());
        self.shared.latch.fire_due(block_start, len as u64);

        let enabled = self.shared.is_enabled();
        if enabled && !self.frozen {
            // Oldest sample in the ring sits at the write cursor.
            self.read = self.write;
        }
        self.frozen = enabled;

        let size = self.left.len();
        if enabled {
            for (l, r) in left[..len].iter_mut().zip(right[..len].iter_mut()) {
                *l = self.left[self.read];
                *r = self.right[self.read];
                self.read = (self.read + 1) % size;
            }
        } else {
            for (l, r) in left[..len].iter().zip(right[..len].iter()) {
                self.left[self.write] = *l;
                self.right[self.write] = *r;
                self.write = (self.write + 1) % size;
            }
        }
    }
}
