//! Scheduling policy: turns button commands into immediate effect changes
//! or sample deadlines.

mod momentary;
mod stutter;

pub use momentary::{Momentary, MomentaryController};
pub use stutter::StutterController;

use crate::command::{Command, CommandType, EffectId};
use crate::context::LooperContext;
use crate::display::{Bitmap, Feedback, UiSink};
use crate::effects::{param, Choke, Freeze, Mode};
use crate::transport::Quantization;
use crate::Result;

/// What a controller did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    /// Fully handled.
    Consumed,
    /// Run the rack's default dispatch.
    Default,
}

/// All three controllers plus the routing between them.
#[derive(Debug, Default)]
pub struct ControlSurface {
    choke: MomentaryController<Choke>,
    freeze: MomentaryController<Freeze>,
    stutter: StutterController,
}

impl ControlSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one command. Errors only come from the rack's default dispatch
    /// (unknown targets); the command is then a no-op.
    pub fn dispatch<S: UiSink>(
        &mut self,
        ctx: &LooperContext,
        cmd: &Command,
        fb: &mut Feedback<S>,
    ) -> Result<()> {
        let handling = match (cmd.kind, cmd.target) {
            (CommandType::SetParam | CommandType::None, _) => Handling::Default,
            (kind, EffectId::Choke) if kind.is_press() => self.choke.handle_press(ctx, fb),
            (kind, EffectId::Choke) if kind.is_release() => self.choke.handle_release(ctx),
            (kind, EffectId::Freeze) if kind.is_press() => self.freeze.handle_press(ctx, fb),
            (kind, EffectId::Freeze) if kind.is_release() => self.freeze.handle_release(ctx),
            (kind, EffectId::Stutter | EffectId::Func) if kind.is_press() => {
                self.stutter.handle_press(ctx, cmd, fb)
            }
            (kind, EffectId::Stutter | EffectId::Func) if kind.is_release() => {
                self.stutter.handle_release(ctx, cmd, fb)
            }
            _ => Handling::Default,
        };

        if handling == Handling::Consumed {
            return Ok(());
        }

        ctx.rack.execute(cmd)?;
        self.after_default(ctx, cmd, fb);
        Ok(())
    }

    fn after_default<S: UiSink>(&mut self, ctx: &LooperContext, cmd: &Command, fb: &mut Feedback<S>) {
        let Some(effect) = ctx.rack.get(cmd.target) else {
            return;
        };

        match cmd.kind {
            CommandType::SetParam => {
                let mode = Mode::from_value(cmd.value);
                let bitmap = match cmd.param1 {
                    param::LENGTH => Bitmap::length(cmd.target, mode),
                    param::ONSET => Bitmap::onset(cmd.target, mode),
                    param::CAPTURE_START if cmd.target == EffectId::Stutter => {
                        Bitmap::capture_start(mode)
                    }
                    param::CAPTURE_END if cmd.target == EffectId::Stutter => {
                        Bitmap::capture_end(mode)
                    }
                    _ => return,
                };
                fb.show(bitmap);
            }
            CommandType::None => {}
            _ => {
                let enabled = effect.is_enabled();
                fb.set_led(cmd.target, enabled.into());
                fb.set_last_activated(if enabled { cmd.target } else { EffectId::None });
                fb.update_display(&ctx.rack);
                tracing::info!(
                    effect = cmd.target.name(),
                    enabled,
                    "effect switched"
                );
            }
        }
    }

    /// Change the shared grid and show it.
    pub fn set_quantization<S: UiSink>(
        &mut self,
        ctx: &LooperContext,
        grid: Quantization,
        fb: &mut Feedback<S>,
    ) {
        ctx.quantizer.set_grid(grid);
        fb.show(grid.bitmap());
    }

    /// Pick up transitions that happened on the audio side.
    pub fn refresh<S: UiSink>(&mut self, ctx: &LooperContext, fb: &mut Feedback<S>) {
        self.choke.refresh(ctx, fb);
        self.freeze.refresh(ctx, fb);
        self.stutter.refresh(ctx, fb);
    }

    pub fn func_held(&self) -> bool {
        self.stutter.func_held()
    }
}
