//! Lock-free primitives shared between the audio interrupt and application tasks.

use crate::compat::{AtomicBool as StdAtomicBool, AtomicU64};
use crate::Ordering;
use atomic_float::AtomicF32;

/// Cache-line aligned atomic f32.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat {
    value: AtomicF32,
}

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicF32::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for AtomicFloat {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic bool.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: StdAtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: StdAtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    /// Test-and-set; returns the previous value.
    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// A one-shot sample deadline. `0` means nothing is scheduled.
///
/// Written by application tasks (schedule / cancel), consumed by the audio
/// block handler. Consumption is a compare-exchange back to `0`, so a
/// deadline fires at most once even when a cancel races with the block that
/// would have fired it: whichever write lands first wins.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct AtomicDeadline {
    at: AtomicU64,
}

impl AtomicDeadline {
    pub const fn new() -> Self {
        Self {
            at: AtomicU64::new(0),
        }
    }

    /// Arm the deadline. Sample 0 is reserved for "none" and is stored as 1.
    #[inline]
    pub fn schedule(&self, sample: u64) {
        self.at.store(sample.max(1), Ordering::Release);
    }

    #[inline]
    pub fn cancel(&self) {
        self.at.store(0, Ordering::Release);
    }

    #[inline]
    pub fn get(&self) -> Option<u64> {
        match self.at.load(Ordering::Acquire) {
            0 => None,
            at => Some(at),
        }
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.get().is_some()
    }

    /// Disarm and return `true` if the deadline falls before the end of the
    /// block `[block_start, block_start + block_len)`.
    ///
    /// A deadline that is already behind `block_start` (armed after its
    /// block had been processed) fires on the first block that sees it.
    #[inline]
    pub fn take_due(&self, block_start: u64, block_len: u64) -> bool {
        let at = self.at.load(Ordering::Acquire);
        if at == 0 || at >= block_start.saturating_add(block_len) {
            return false;
        }
        self.at
            .compare_exchange(at, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
