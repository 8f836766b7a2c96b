//! Effect registry and default command dispatch.

use crate::command::{Command, CommandType, EffectId};
use crate::compat::Arc;
use crate::effects::{Choke, ChokeUnit, EffectRef, EffectUnit, Freeze, FreezeUnit, Stutter, StutterUnit};
use crate::{EngineConfig, Error, Result};

/// The three shared effect halves, looked up by [`EffectId`].
#[derive(Debug)]
pub struct EffectRack {
    stutter: Arc<Stutter>,
    freeze: Arc<Freeze>,
    choke: Arc<Choke>,
}

impl EffectRack {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            stutter: Arc::new(Stutter::new(config.capture_buffer_samples())),
            freeze: Arc::new(Freeze::new()),
            choke: Arc::new(Choke::new()),
        }
    }

    pub fn stutter(&self) -> &Stutter {
        &self.stutter
    }

    pub fn freeze(&self) -> &Freeze {
        &self.freeze
    }

    pub fn choke(&self) -> &Choke {
        &self.choke
    }

    /// `None` for ids with no effect behind them (`None`, `Func`).
    pub fn get(&self, id: EffectId) -> Option<EffectRef<'_>> {
        match id {
            EffectId::Stutter => Some(EffectRef::Stutter(&self.stutter)),
            EffectId::Freeze => Some(EffectRef::Freeze(&self.freeze)),
            EffectId::Choke => Some(EffectRef::Choke(&self.choke)),
            EffectId::None | EffectId::Func => None,
        }
    }

    pub fn is_enabled(&self, id: EffectId) -> bool {
        self.get(id).is_some_and(|effect| effect.is_enabled())
    }

    /// Build the audio-side units in chain order: stutter, freeze, choke.
    ///
    /// Allocates the sample buffers; call once at startup.
    pub fn units(&self, config: &EngineConfig) -> [EffectUnit; 3] {
        [
            EffectUnit::Stutter(StutterUnit::new(Arc::clone(&self.stutter))),
            EffectUnit::Freeze(FreezeUnit::new(
                Arc::clone(&self.freeze),
                config.freeze_buffer_samples(),
            )),
            EffectUnit::Choke(ChokeUnit::new(
                Arc::clone(&self.choke),
                config.fade_samples(),
            )),
        ]
    }

    /// Default command handling: the effect's immediate API.
    pub fn execute(&self, cmd: &Command) -> Result<()> {
        if cmd.kind == CommandType::None {
            return Ok(());
        }

        let Some(effect) = self.get(cmd.target) else {
            tracing::warn!(target_effect = cmd.target.name(), "effect not registered");
            return Err(Error::EffectNotRegistered(cmd.target));
        };

        match cmd.kind {
            CommandType::Toggle => effect.toggle(),
            CommandType::Enable => effect.enable(),
            CommandType::Disable => effect.disable(),
            CommandType::SetParam => {
                effect.set_param(cmd.param1, cmd.value);
            }
            CommandType::None => {}
        }
        Ok(())
    }
}
