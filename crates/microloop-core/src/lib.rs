//! Real-time looper core: one sample clock, MIDI-clock quantization and
//! block-synchronous choke/freeze/stutter effects.
//!
//! # Primary API
//!
//! - [`LooperContext`]: the shared state (clock, grid, effects), built once
//! - [`TimeKeeper`]: sample position, beat/tick position, tempo
//! - [`Quantizer`]: grid resolution and quantized deadlines
//! - [`EffectRack`] / [`EffectUnit`]: effect controls and their audio halves
//! - [`ControlSurface`]: press/release scheduling policy
//! - [`spsc_queue`]: the lock-free queue between contexts
//!
//! Nothing reachable from [`EffectUnit::process`] or
//! [`TimeKeeper::advance`] allocates, locks or blocks.
//!
//! # Targets
//!
//! The crate builds without `std`. On targets with no 64-bit atomics
//! (`thumbv7m-none-eabi`, `thumbv7em-none-eabi`) enable `critical-section` and link a
//! critical-section implementation:
//!
//! ```text
//! cargo build -p microloop-core --target thumbv7m-none-eabi \
//!     --no-default-features --features critical-section
//! ```
//!
//! # Example
//!
//! ```
//! use microloop_core::{Command, EffectId, EngineConfig, LooperContext};
//!
//! let ctx = LooperContext::new(EngineConfig::default())?;
//! let mut units = ctx.rack.units(&ctx.config);
//!
//! ctx.rack.execute(&Command::press(EffectId::Freeze))?;
//!
//! let mut left = [0i16; 128];
//! let mut right = [0i16; 128];
//! let start = ctx.timekeeper.advance(128);
//! for unit in units.iter_mut() {
//!     unit.process(&mut left, &mut right, start);
//! }
//! # Ok::<(), microloop_core::Error>(())
//! ```

#![no_std]

#[cfg(any(feature = "std", test))]
extern crate std;

#[macro_use]
extern crate alloc;

pub(crate) mod compat;

pub mod error;
pub use error::{Error, Result};

mod config;
pub use config::EngineConfig;

pub(crate) mod lockfree;
pub use compat::{Arc, Ordering};
pub use lockfree::{AtomicDeadline, AtomicFlag, AtomicFloat};

pub mod queue;
pub use queue::{spsc_queue, Consumer, Producer, SpscQueue};

mod smooth;
pub use smooth::SmoothedValue;

pub mod command;
pub use command::{Command, CommandType, EffectId};

pub mod transport;
pub use transport::{
    Quantization, Quantizer, TickTracker, TimeKeeper, TimeSnapshot, TransportEvent,
    TransportState,
};

pub mod effects;
pub use effects::{
    Choke, ChokeUnit, EffectRef, EffectUnit, Freeze, FreezeUnit, Mode, Stutter, StutterState,
    StutterUnit,
};

mod rack;
pub use rack::EffectRack;

mod context;
pub use context::LooperContext;

pub mod control;
pub use control::{ControlSurface, Handling};

pub mod display;
pub use display::{BeatLed, Bitmap, Feedback, LedState, UiEvent, UiSink};
