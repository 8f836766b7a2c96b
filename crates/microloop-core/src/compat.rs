//! Compatibility layer for no_std + alloc.
//!
//! `AtomicU64` comes from `portable-atomic`: Cortex-M3/M4 only have 32-bit
//! atomics. With the `critical-section` feature the 64-bit sample clock and
//! deadlines are guarded by the firmware's critical section.

pub use alloc::{string::String, sync::Arc, vec::Vec};

pub use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering},
};

pub use portable_atomic::AtomicU64;
