//! The three effect state machines.
//!
//! Every effect is split in two:
//! - a shared control struct ([`Choke`], [`Freeze`], [`Stutter`]) made of
//!   atomics, held in an `Arc` by both the application side and the audio side
//! - an audio-side unit ([`ChokeUnit`], [`FreezeUnit`], [`StutterUnit`]) that
//!   owns the sample buffers and is only touched by the block handler
//!
//! Units are driven through [`EffectUnit`], a closed enum with `match`
//! dispatch. The application side reaches the shared halves through
//! [`EffectRef`].

mod choke;
mod freeze;
mod stutter;

pub use choke::{Choke, ChokeUnit};
pub use freeze::{Freeze, FreezeUnit};
pub use stutter::{Stutter, StutterState, StutterUnit};

use crate::command::EffectId;
use crate::compat::AtomicU8;
use crate::lockfree::{AtomicDeadline, AtomicFlag};
use crate::Ordering;
use serde::{Deserialize, Serialize};

/// Parameter index carried in `Command::param1` for `SetParam`.
pub mod param {
    pub const LENGTH: u8 = 0;
    pub const ONSET: u8 = 1;
    /// Stutter only.
    pub const CAPTURE_START: u8 = 2;
    /// Stutter only.
    pub const CAPTURE_END: u8 = 3;
}

/// Whether a transition happens on the user action or on the next grid
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mode {
    #[default]
    Free = 0,
    Quantized = 1,
}

impl Mode {
    /// `SetParam` value decoding: 0 is free, anything else quantized.
    #[inline]
    pub fn from_value(value: u32) -> Self {
        if value == 0 {
            Mode::Free
        } else {
            Mode::Quantized
        }
    }

    #[inline]
    pub fn is_quantized(self) -> bool {
        self == Mode::Quantized
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Free => "Free",
            Mode::Quantized => "Quantized",
        }
    }
}

/// A [`Mode`] readable from any context.
#[derive(Debug)]
pub struct AtomicMode(AtomicU8);

impl AtomicMode {
    pub const fn new(mode: Mode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    #[inline]
    pub fn get(&self) -> Mode {
        match self.0.load(Ordering::Acquire) {
            0 => Mode::Free,
            _ => Mode::Quantized,
        }
    }

    #[inline]
    pub fn set(&self, mode: Mode) {
        self.0.store(mode as u8, Ordering::Release);
    }
}

impl Default for AtomicMode {
    fn default() -> Self {
        Self::new(Mode::Free)
    }
}

/// On/off state with one scheduled onset and one scheduled release.
///
/// Shared by [`Choke`] and [`Freeze`], which differ only in what the audio
/// unit does while "on".
#[derive(Debug)]
pub struct Latch {
    id: EffectId,
    enabled: AtomicFlag,
    onset: AtomicDeadline,
    release: AtomicDeadline,
    onset_mode: AtomicMode,
    length_mode: AtomicMode,
}

impl Latch {
    pub fn new(id: EffectId) -> Self {
        Self {
            id,
            enabled: AtomicFlag::new(false),
            onset: AtomicDeadline::new(),
            release: AtomicDeadline::new(),
            onset_mode: AtomicMode::default(),
            length_mode: AtomicMode::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> EffectId {
        self.id
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn enable(&self) {
        if !self.enabled.swap(true) {
            tracing::info!(effect = self.id.name(), "engaged");
        }
    }

    pub fn disable(&self) {
        if self.enabled.swap(false) {
            tracing::info!(effect = self.id.name(), "released");
        }
    }

    pub fn toggle(&self) {
        if self.is_enabled() {
            self.disable();
        } else {
            self.enable();
        }
    }

    pub fn schedule_onset(&self, sample: u64) {
        self.onset.schedule(sample);
    }

    pub fn cancel_scheduled_onset(&self) {
        self.onset.cancel();
    }

    pub fn scheduled_onset(&self) -> Option<u64> {
        self.onset.get()
    }

    pub fn schedule_release(&self, sample: u64) {
        self.release.schedule(sample);
    }

    pub fn cancel_scheduled_release(&self) {
        self.release.cancel();
    }

    pub fn scheduled_release(&self) -> Option<u64> {
        self.release.get()
    }

    #[inline]
    pub fn onset_mode(&self) -> Mode {
        self.onset_mode.get()
    }

    pub fn set_onset_mode(&self, mode: Mode) {
        self.onset_mode.set(mode);
    }

    #[inline]
    pub fn length_mode(&self) -> Mode {
        self.length_mode.get()
    }

    pub fn set_length_mode(&self, mode: Mode) {
        self.length_mode.set(mode);
    }

    /// Apply `SetParam`. Only length and onset exist here.
    pub fn set_param(&self, index: u8, value: u32) -> bool {
        let mode = Mode::from_value(value);
        match index {
            param::LENGTH => self.set_length_mode(mode),
            param::ONSET => self.set_onset_mode(mode),
            other => {
                tracing::warn!(effect = self.id.name(), param = other, "unknown parameter");
                return false;
            }
        }
        tracing::debug!(effect = self.id.name(), param = index, mode = mode.name(), "parameter set");
        true
    }

    /// Fire any deadline inside the block. Onset is checked before release
    /// so an onset and release in the same block leave the effect off.
    #[inline]
    pub(crate) fn fire_due(&self, block_start: u64, block_len: u64) {
        if self.onset.take_due(block_start, block_len) {
            self.enabled.set(true);
            tracing::trace!(effect = self.id.name(), block_start, "scheduled onset fired");
        }
        if self.release.take_due(block_start, block_len) {
            self.enabled.set(false);
            tracing::trace!(effect = self.id.name(), block_start, "scheduled release fired");
        }
    }
}

/// Borrowed handle to one of the shared effect halves.
#[derive(Debug, Clone, Copy)]
pub enum EffectRef<'a> {
    Stutter(&'a Stutter),
    Freeze(&'a Freeze),
    Choke(&'a Choke),
}

impl EffectRef<'_> {
    pub fn id(&self) -> EffectId {
        match self {
            EffectRef::Stutter(_) => EffectId::Stutter,
            EffectRef::Freeze(_) => EffectId::Freeze,
            EffectRef::Choke(_) => EffectId::Choke,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            EffectRef::Stutter(e) => e.is_enabled(),
            EffectRef::Freeze(e) => e.is_enabled(),
            EffectRef::Choke(e) => e.is_enabled(),
        }
    }

    pub fn enable(&self) {
        match self {
            EffectRef::Stutter(e) => e.enable(),
            EffectRef::Freeze(e) => e.enable(),
            EffectRef::Choke(e) => e.enable(),
        }
    }

    pub fn disable(&self) {
        match self {
            EffectRef::Stutter(e) => e.disable(),
            EffectRef::Freeze(e) => e.disable(),
            EffectRef::Choke(e) => e.disable(),
        }
    }

    pub fn toggle(&self) {
        match self {
            EffectRef::Stutter(e) => e.toggle(),
            EffectRef::Freeze(e) => e.toggle(),
            EffectRef::Choke(e) => e.toggle(),
        }
    }

    pub fn set_param(&self, index: u8, value: u32) -> bool {
        match self {
            EffectRef::Stutter(e) => e.set_param(index, value),
            EffectRef::Freeze(e) => e.set_param(index, value),
            EffectRef::Choke(e) => e.set_param(index, value),
        }
    }
}

/// Audio-side half of an effect, run once per block.
#[derive(Debug)]
pub enum EffectUnit {
    Stutter(StutterUnit),
    Freeze(FreezeUnit),
    Choke(ChokeUnit),
}

impl EffectUnit {
    pub fn id(&self) -> EffectId {
        match self {
            EffectUnit::Stutter(_) => EffectId::Stutter,
            EffectUnit::Freeze(_) => EffectId::Freeze,
            EffectUnit::Choke(_) => EffectId::Choke,
        }
    }

    /// Process one stereo block in place. `block_start` is the sample
    /// position of the first frame.
    #[inline]
    pub fn process(&mut self, left: &mut [i16], right: &mut [i16], block_start: u64) {
        match self {
            EffectUnit::Stutter(unit) => unit.process(left, right, block_start),
            EffectUnit::Freeze(unit) => unit.process(left, right, block_start),
            EffectUnit::Choke(unit) => unit.process(left, right, block_start),
        }
    }
}
