//! Timing: sample clock, MIDI clock ingestion, quantization grid.

mod clock;
mod quantize;
mod timekeeper;

pub use clock::{TickTracker, TransportEvent};
pub use quantize::{Quantization, Quantizer};
pub use timekeeper::{TimeKeeper, TimeSnapshot, TransportState};

/// MIDI clock pulses per quarter note.
pub const PPQN: u32 = 24;

/// Fixed 4/4.
pub const BEATS_PER_BAR: u32 = 4;

pub const DEFAULT_BPM: u32 = 120;

/// Tempo updates outside `MIN_BPM..=MAX_BPM` are rejected.
pub const MIN_BPM: u32 = 30;
pub const MAX_BPM: u32 = 300;
