//! Error types for microloop-core.
//!
//! Nothing on the audio path returns these. They surface from configuration,
//! wire decoding and command dispatch on the application side.

use crate::command::EffectId;
use crate::compat::String;
use thiserror::Error;

/// Error type for microloop-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid sample rate: {0}. Must be between 8000 and 192000 Hz")]
    InvalidSampleRate(u32),

    #[error("Invalid block size: {0}. Must be non-zero")]
    InvalidBlockSize(usize),

    #[error("Unknown effect id: {0}")]
    UnknownEffect(u8),

    #[error("Unknown command type: {0}")]
    UnknownCommand(u8),

    #[error("Invalid quantization index: {0}. Must be 0..=3")]
    InvalidQuantization(u8),

    #[error("Effect not registered: {0:?}")]
    EffectNotRegistered(EffectId),
}

/// Result type for microloop-core operations.
pub type Result<T> = core::result::Result<T, Error>;
