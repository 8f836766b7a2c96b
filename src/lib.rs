//! # Microloop - Beat-synchronized Performance Looper
//!
//! Stereo effects engine that locks to an external MIDI clock.
//!
//! ## Architecture
//!
//! Microloop is an umbrella crate around:
//! - **microloop-core** - Sample clock, quantization, effects, control policy
//!   (`no_std` + `alloc`)
//! - **engine** - The split between the audio callback, the application
//!   loop and the MIDI/button/display collaborators
//!
//! Effects run in a fixed chain: stutter, freeze, choke. Button presses
//! arrive as 8-byte commands and either act immediately or become sample
//! deadlines that the audio side fires inside the block containing them.
//!
//! ## Quick Start
//!
//! ```
//! use microloop::prelude::*;
//!
//! let mut parts = Looper::builder().sample_rate(44_100).build()?.split();
//!
//! // Button collaborator
//! parts.input.send(Command::press(EffectId::Choke));
//!
//! // Application loop (or `parts.app.spawn(..)`)
//! parts.app.step();
//!
//! // Audio callback
//! let mut left = [1000i16; 128];
//! let mut right = [1000i16; 128];
//! parts.audio.process(&mut left, &mut right);
//! assert!(left[127].abs() < 1000);
//! # Ok::<(), microloop::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default) - Enables the threaded engine and std support in core

/// Re-export of microloop-core for direct access
pub use microloop_core as core;

pub use microloop_core::{
    // Lock-free primitives
    AtomicDeadline,
    AtomicFlag,
    AtomicFloat,

    // Effects
    Choke,
    // Commands
    Command,
    CommandType,
    ControlSurface,
    EffectId,
    EffectRack,
    EffectUnit,
    EngineConfig,
    Freeze,
    LooperContext,
    Mode,

    // Transport
    Quantization,
    Quantizer,
    Stutter,
    StutterState,
    TickTracker,
    TimeKeeper,
    TimeSnapshot,
    TransportEvent,
    TransportState,

    // Display
    Bitmap,
    LedState,
    UiEvent,
};

mod builder;
mod engine;
pub mod error;

pub use builder::LooperBuilder;
pub use engine::{
    AppTask, AudioHandler, CommandInput, Looper, LooperParts, LooperStatus, MidiInput, UiSender,
    CLOCK_QUEUE_SIZE, COMMAND_QUEUE_SIZE, TRANSPORT_QUEUE_SIZE,
};
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    // Engine
    pub use crate::{
        AppTask, AudioHandler, CommandInput, Looper, LooperBuilder, LooperParts, MidiInput,
    };

    // Commands and configuration
    pub use crate::core::{Command, CommandType, EffectId, EngineConfig, Mode};

    // Transport
    pub use crate::core::{Quantization, TransportEvent};

    // Feedback
    pub use crate::core::{Bitmap, LedState, UiEvent};

    pub use crate::core::{Arc, AtomicFlag};
}
