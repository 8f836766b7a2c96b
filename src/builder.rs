//! Builder for configuring and constructing a [`Looper`].

use crate::{Looper, Result};
use microloop_core::EngineConfig;
use std::time::Duration;

/// Every buffer in the engine is allocated in [`build`](Self::build) and
/// never again.
///
/// # Example
///
/// ```
/// use microloop::prelude::*;
///
/// let looper = Looper::builder()
///     .sample_rate(48_000)
///     .lookahead_samples(64)
///     .build()?;
///
/// let parts = looper.split();
/// assert_eq!(parts.context.config.sample_rate, 48_000);
/// # Ok::<(), microloop::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct LooperBuilder {
    config: EngineConfig,
    app_yield: Duration,
}

impl Default for LooperBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            app_yield: Duration::from_millis(2),
        }
    }
}

impl LooperBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 44100
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 128
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Default: 128
    pub fn lookahead_samples(mut self, samples: u32) -> Self {
        self.config.lookahead_samples = samples;
        self
    }

    /// Default: 70 (one bar at 70 BPM)
    pub fn min_capture_bpm(mut self, bpm: u32) -> Self {
        self.config.min_capture_bpm = bpm;
        self
    }

    /// Sleep between application loop iterations. Default: 2 ms
    pub fn app_yield(mut self, interval: Duration) -> Self {
        self.app_yield = interval;
        self
    }

    pub fn build(self) -> Result<Looper> {
        Looper::new(self.config, self.app_yield)
    }
}
