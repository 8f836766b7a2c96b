//! Press/release policy for hold-to-engage effects (choke, freeze).

use super::Handling;
use crate::command::EffectId;
use crate::context::LooperContext;
use crate::display::{Bitmap, Feedback, LedState, UiSink};
use crate::effects::{Choke, Freeze, Latch};
use crate::rack::EffectRack;
use core::marker::PhantomData;

/// An effect driven by a [`Latch`].
pub trait Momentary {
    const ID: EffectId;

    fn from_rack(rack: &EffectRack) -> &Self;

    fn latch(&self) -> &Latch;
}

impl Momentary for Choke {
    const ID: EffectId = EffectId::Choke;

    fn from_rack(rack: &EffectRack) -> &Self {
        rack.choke()
    }

    fn latch(&self) -> &Latch {
        Choke::latch(self)
    }
}

impl Momentary for Freeze {
    const ID: EffectId = EffectId::Freeze;

    fn from_rack(rack: &EffectRack) -> &Self {
        rack.freeze()
    }

    fn latch(&self) -> &Latch {
        Freeze::latch(self)
    }
}

/// Turns button edges into immediate or scheduled transitions.
///
/// | onset     | length    | press                      | release               |
/// |-----------|-----------|----------------------------|-----------------------|
/// | free      | free      | enable                     | disable               |
/// | free      | quantized | enable, release in 1 grid  | ignored               |
/// | quantized | free      | onset at next boundary     | cancel onset, disable |
/// | quantized | quantized | onset, release 1 grid later| ignored               |
///
/// Quantized onsets fire `lookahead` samples early. A quantized release is
/// measured from the onset deadline, not from the press.
#[derive(Debug)]
pub struct MomentaryController<E> {
    was_enabled: bool,
    _effect: PhantomData<fn() -> E>,
}

impl<E: Momentary> MomentaryController<E> {
    pub fn new() -> Self {
        Self {
            was_enabled: false,
            _effect: PhantomData,
        }
    }

    pub fn handle_press<S: UiSink>(&mut self, ctx: &LooperContext, fb: &mut Feedback<S>) -> Handling {
        let latch = E::from_rack(&ctx.rack).latch();
        let tk = &ctx.timekeeper;
        let quantizer = &ctx.quantizer;
        let quantized_length = latch.length_mode().is_quantized();

        if !latch.onset_mode().is_quantized() {
            latch.enable();
            if quantized_length {
                let release = tk.sample_position() + quantizer.duration(tk) as u64;
                latch.schedule_release(release);
                tracing::debug!(
                    effect = E::ID.name(),
                    release,
                    grid = quantizer.grid().name(),
                    "release scheduled"
                );
            }
            fb.set_led(E::ID, LedState::On);
            fb.set_last_activated(E::ID);
            fb.show(Bitmap::active(E::ID));
            return Handling::Consumed;
        }

        let onset = quantizer.onset_deadline(tk);
        latch.schedule_onset(onset);
        if quantized_length {
            latch.schedule_release(onset + quantizer.duration(tk) as u64);
        }
        tracing::debug!(
            effect = E::ID.name(),
            onset,
            release = latch.scheduled_release(),
            grid = quantizer.grid().name(),
            lookahead = quantizer.lookahead(),
            "onset scheduled"
        );
        Handling::Consumed
    }

    pub fn handle_release(&mut self, ctx: &LooperContext) -> Handling {
        let latch = E::from_rack(&ctx.rack).latch();
        if latch.length_mode().is_quantized() {
            tracing::debug!(effect = E::ID.name(), "release ignored, quantized length");
            return Handling::Consumed;
        }
        latch.cancel_scheduled_onset();
        Handling::Default
    }

    /// Catch up with transitions the audio side made on its own: scheduled
    /// onsets firing and automatic releases.
    pub fn refresh<S: UiSink>(&mut self, ctx: &LooperContext, fb: &mut Feedback<S>) {
        let latch = E::from_rack(&ctx.rack).latch();
        let enabled = latch.is_enabled();
        if enabled == self.was_enabled {
            return;
        }
        self.was_enabled = enabled;

        if enabled {
            fb.set_led(E::ID, LedState::On);
            fb.set_last_activated(E::ID);
            fb.show(Bitmap::active(E::ID));
            if latch.onset_mode().is_quantized() {
                tracing::info!(effect = E::ID.name(), "engaged at scheduled onset");
            }
        } else {
            fb.set_led(E::ID, LedState::Off);
            if fb.last_activated() == E::ID {
                fb.set_last_activated(EffectId::None);
            }
            fb.update_display(&ctx.rack);
            if latch.length_mode().is_quantized() {
                tracing::info!(effect = E::ID.name(), "auto-released");
            }
        }
    }
}

impl<E: Momentary> Default for MomentaryController<E> {
    fn default() -> Self {
        Self::new()
    }
}
