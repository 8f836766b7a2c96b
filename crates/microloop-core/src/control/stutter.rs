//! Press/release policy for the stutter looper.
//!
//! The stutter button alone plays the captured loop. Held together with the
//! FUNC modifier it records a new one. Stutter deadlines land on the grid
//! boundary itself, without the onset lookahead.

use super::Handling;
use crate::command::{Command, EffectId};
use crate::context::LooperContext;
use crate::display::{Feedback, UiSink};
use crate::effects::{Mode, StutterState};

#[derive(Debug, Default)]
pub struct StutterController {
    func_held: bool,
    stutter_held: bool,
    last_state: StutterState,
}

impl StutterController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn func_held(&self) -> bool {
        self.func_held
    }

    pub fn handle_press<S: UiSink>(
        &mut self,
        ctx: &LooperContext,
        cmd: &Command,
        fb: &mut Feedback<S>,
    ) -> Handling {
        if cmd.target == EffectId::Func {
            self.func_held = true;
            return Handling::Consumed;
        }

        let stutter = ctx.rack.stutter();
        self.stutter_held = true;
        stutter.set_trigger_held(true);
        let boundary = || ctx.quantizer.boundary_deadline(&ctx.timekeeper);

        if self.func_held {
            if stutter.state() == StutterState::IdleWithLoop {
                tracing::debug!("discarding loop for new capture");
            }
            match stutter.capture_start_mode() {
                Mode::Free => stutter.start_capture(),
                Mode::Quantized => stutter.schedule_capture_start(boundary()),
            }
            fb.set_last_activated(EffectId::Stutter);
            fb.update_display(&ctx.rack);
            return Handling::Consumed;
        }

        match stutter.state() {
            StutterState::IdleWithLoop => {
                match stutter.onset_mode() {
                    Mode::Free => {
                        stutter.start_playback();
                    }
                    Mode::Quantized => {
                        stutter.schedule_playback_onset(boundary());
                    }
                }
                fb.set_last_activated(EffectId::Stutter);
                fb.update_display(&ctx.rack);
            }
            StutterState::IdleNoLoop => {
                tracing::debug!("stutter pressed with no loop, hold FUNC to capture");
            }
            _ => {}
        }
        Handling::Consumed
    }

    pub fn handle_release<S: UiSink>(
        &mut self,
        ctx: &LooperContext,
        cmd: &Command,
        fb: &mut Feedback<S>,
    ) -> Handling {
        let stutter = ctx.rack.stutter();
        let boundary = || ctx.quantizer.boundary_deadline(&ctx.timekeeper);

        if cmd.target == EffectId::Func {
            self.func_held = false;
            // Letting go of FUNC first ends the capture into playback.
            if stutter.state().is_capturing() && self.stutter_held {
                self.end_capture(ctx, true);
                fb.update_display(&ctx.rack);
            }
            return Handling::Consumed;
        }

        self.stutter_held = false;
        stutter.set_trigger_held(false);

        match stutter.state() {
            StutterState::WaitCaptureStart => {
                stutter.cancel_capture_start();
                if fb.last_activated() == EffectId::Stutter {
                    fb.set_last_activated(EffectId::None);
                }
            }
            StutterState::Capturing | StutterState::WaitCaptureEnd => {
                self.end_capture(ctx, false);
            }
            StutterState::WaitPlaybackOnset => stutter.stop_playback(),
            StutterState::Playing => match stutter.length_mode() {
                Mode::Free => stutter.stop_playback(),
                Mode::Quantized => stutter.schedule_playback_length(boundary()),
            },
            _ => return Handling::Consumed,
        }
        fb.update_display(&ctx.rack);
        Handling::Consumed
    }

    fn end_capture(&self, ctx: &LooperContext, trigger_held: bool) {
        let stutter = ctx.rack.stutter();
        match stutter.capture_end_mode() {
            Mode::Free => stutter.end_capture(trigger_held),
            Mode::Quantized => stutter.schedule_capture_end(
                ctx.quantizer.boundary_deadline(&ctx.timekeeper),
                trigger_held,
            ),
        }
    }

    /// LED follows the state every call; the display only on a state change.
    pub fn refresh<S: UiSink>(&mut self, ctx: &LooperContext, fb: &mut Feedback<S>) {
        let state = ctx.rack.stutter().state();
        fb.set_led(EffectId::Stutter, state.led());

        if state == self.last_state {
            return;
        }
        tracing::debug!(from = self.last_state.name(), to = state.name(), "stutter state");

        if !state.is_idle() {
            fb.set_last_activated(EffectId::Stutter);
        } else if fb.last_activated() == EffectId::Stutter {
            fb.set_last_activated(EffectId::None);
        }
        fb.update_display(&ctx.rack);
        self.last_state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::Vec;
    use crate::display::{Bitmap, LedState, UiEvent};
    use crate::effects::{param, EffectUnit, StutterUnit};
    use crate::EngineConfig;

    struct Rig {
        ctx: LooperContext,
        unit: StutterUnit,
        fb: Feedback<Vec<UiEvent>>,
        ctl: StutterController,
    }

    impl Rig {
        fn new() -> Self {
            let ctx = LooperContext::new(EngineConfig::default()).unwrap();
            let [first, _, _] = ctx.rack.units(&ctx.config);
            let EffectUnit::Stutter(unit) = first else {
                panic!("chain must start with the stutter");
            };
            Self {
                ctx,
                unit,
                fb: Feedback::new(Vec::new()),
                ctl: StutterController::new(),
            }
        }

        fn press(&mut self, target: EffectId) -> Handling {
            self.ctl.handle_press(&self.ctx, &Command::press(target), &mut self.fb)
        }

        fn release(&mut self, target: EffectId) -> Handling {
            self.ctl.handle_release(&self.ctx, &Command::release(target), &mut self.fb)
        }

        fn blocks(&mut self, n: usize) {
            for _ in 0..n {
                let mut l = [1000i16; 128];
                let mut r = [1000i16; 128];
                let start = self.ctx.timekeeper.advance(128);
                self.unit.process(&mut l, &mut r, start);
            }
        }

        fn state(&self) -> StutterState {
            self.ctx.rack.stutter().state()
        }
    }

    #[test]
    fn test_press_without_loop_is_ignored() {
        let mut rig = Rig::new();
        assert_eq!(rig.press(EffectId::Stutter), Handling::Consumed);
        assert_eq!(rig.state(), StutterState::IdleNoLoop);
        assert_eq!(rig.release(EffectId::Stutter), Handling::Consumed);
    }

    #[test]
    fn test_func_combo_captures_and_release_stores_loop() {
        let mut rig = Rig::new();
        rig.press(EffectId::Func);
        rig.press(EffectId::Stutter);
        assert_eq!(rig.state(), StutterState::Capturing);
        assert_eq!(rig.fb.current_bitmap(), Some(Bitmap::StutterCapturing));

        rig.blocks(4);
        rig.release(EffectId::Stutter);
        assert_eq!(rig.state(), StutterState::IdleWithLoop);
        assert_eq!(rig.ctx.rack.stutter().capture_length(), 512);
        rig.release(EffectId::Func);
        assert_eq!(rig.state(), StutterState::IdleWithLoop);
    }

    #[test]
    fn test_func_release_first_goes_straight_to_playback() {
        let mut rig = Rig::new();
        rig.press(EffectId::Func);
        rig.press(EffectId::Stutter);
        rig.blocks(2);
        rig.release(EffectId::Func);
        assert_eq!(rig.state(), StutterState::Playing);

        rig.release(EffectId::Stutter);
        assert_eq!(rig.state(), StutterState::IdleWithLoop);
    }

    #[test]
    fn test_quantized_capture_start_cancelled_by_early_release() {
        let mut rig = Rig::new();
        rig.ctx.rack.stutter().set_param(param::CAPTURE_START, 1);
        rig.blocks(1);
        rig.press(EffectId::Func);
        rig.press(EffectId::Stutter);
        assert_eq!(rig.state(), StutterState::WaitCaptureStart);

        rig.release(EffectId::Stutter);
        assert_eq!(rig.state(), StutterState::IdleNoLoop);
        assert_eq!(rig.fb.last_activated(), EffectId::None);
        assert_eq!(rig.fb.current_bitmap(), Some(Bitmap::Default));
    }

    #[test]
    fn test_quantized_capture_start_has_no_lookahead() {
        let mut rig = Rig::new();
        rig.ctx.rack.stutter().set_param(param::CAPTURE_START, 1);
        rig.ctx.timekeeper.increment_samples(100);
        rig.press(EffectId::Func);
        rig.press(EffectId::Stutter);

        // Tick 0 of the beat: the next 1/16 boundary is 5512 away, at 5612.
        // Blocks start at 100 + 128k; 5612 falls in block 43. With the
        // 128-sample lookahead it would have fired one block earlier.
        rig.blocks(43);
        assert_eq!(rig.state(), StutterState::WaitCaptureStart);
        rig.blocks(1);
        assert_eq!(rig.state(), StutterState::Capturing);
    }

    #[test]
    fn test_playback_quantized_onset_and_length() {
        let mut rig = Rig::new();
        rig.press(EffectId::Func);
        rig.press(EffectId::Stutter);
        rig.blocks(2);
        rig.release(EffectId::Stutter);
        rig.release(EffectId::Func);

        let stutter = rig.ctx.rack.stutter();
        stutter.set_param(param::ONSET, 1);
        stutter.set_param(param::LENGTH, 1);

        rig.press(EffectId::Stutter);
        assert_eq!(rig.state(), StutterState::WaitPlaybackOnset);
        rig.ctl.refresh(&rig.ctx, &mut rig.fb);
        assert!(rig.fb.sink().contains(&UiEvent::Led {
            effect: EffectId::Stutter,
            state: LedState::Blink
        }));

        // Run past the boundary
        rig.blocks(50);
        assert_eq!(rig.state(), StutterState::Playing);

        rig.release(EffectId::Stutter);
        assert_eq!(rig.state(), StutterState::WaitPlaybackLength);
        rig.blocks(50);
        assert_eq!(rig.state(), StutterState::IdleWithLoop);

        rig.ctl.refresh(&rig.ctx, &mut rig.fb);
        assert_eq!(rig.fb.current_bitmap(), Some(Bitmap::Default));
    }

    #[test]
    fn test_release_during_wait_playback_onset_cancels() {
        let mut rig = Rig::new();
        rig.press(EffectId::Func);
        rig.press(EffectId::Stutter);
        rig.blocks(1);
        rig.release(EffectId::Stutter);
        rig.release(EffectId::Func);
        rig.ctx.rack.stutter().set_param(param::ONSET, 1);

        rig.press(EffectId::Stutter);
        assert_eq!(rig.state(), StutterState::WaitPlaybackOnset);
        rig.release(EffectId::Stutter);
        assert_eq!(rig.state(), StutterState::IdleWithLoop);
        rig.blocks(50);
        assert_eq!(rig.state(), StutterState::IdleWithLoop);
    }
}
