//! The shared state injected into the audio handler and the application loop.

use crate::rack::EffectRack;
use crate::transport::{Quantization, Quantizer, TimeKeeper};
use crate::{EngineConfig, Result};

/// Everything both execution contexts read: the clock, the grid and the
/// effect controls. Built once, shared behind an `Arc`.
#[derive(Debug)]
pub struct LooperContext {
    pub config: EngineConfig,
    pub timekeeper: TimeKeeper,
    pub quantizer: Quantizer,
    pub rack: EffectRack,
}

impl LooperContext {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            timekeeper: TimeKeeper::new(&config),
            quantizer: Quantizer::new(Quantization::default(), config.lookahead_samples),
            rack: EffectRack::new(&config),
            config,
        })
    }
}
