//! What the display and LED collaborators are told.
//!
//! The core never draws anything. It decides which bitmap and which LED
//! states should be showing and pushes [`UiEvent`]s into a [`UiSink`];
//! [`Feedback`] drops repeats so a sink only sees changes.

use crate::command::EffectId;
use crate::compat::Vec;
use crate::effects::{Mode, StutterState};
use crate::rack::EffectRack;
use crate::transport::Quantization;
use serde::{Deserialize, Serialize};

/// Display bitmap selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Bitmap {
    #[default]
    Default = 0,
    FreezeActive = 1,
    ChokeActive = 2,
    Quant32 = 3,
    Quant16 = 4,
    Quant8 = 5,
    Quant4 = 6,
    ChokeLengthFree = 7,
    ChokeLengthQuant = 8,
    ChokeOnsetFree = 9,
    ChokeOnsetQuant = 10,
    FreezeLengthFree = 11,
    FreezeLengthQuant = 12,
    FreezeOnsetFree = 13,
    FreezeOnsetQuant = 14,
    StutterIdleWithLoop = 15,
    StutterCapturing = 16,
    StutterPlaying = 17,
    StutterOnsetFree = 18,
    StutterOnsetQuant = 19,
    StutterLengthFree = 20,
    StutterLengthQuant = 21,
    StutterCaptureStartFree = 22,
    StutterCaptureStartQuant = 23,
    StutterCaptureEndFree = 24,
    StutterCaptureEndQuant = 25,
}

impl Bitmap {
    /// Bitmap for an effect's length mode. `Default` for targets without one.
    pub fn length(effect: EffectId, mode: Mode) -> Self {
        match (effect, mode) {
            (EffectId::Choke, Mode::Free) => Bitmap::ChokeLengthFree,
            (EffectId::Choke, Mode::Quantized) => Bitmap::ChokeLengthQuant,
            (EffectId::Freeze, Mode::Free) => Bitmap::FreezeLengthFree,
            (EffectId::Freeze, Mode::Quantized) => Bitmap::FreezeLengthQuant,
            (EffectId::Stutter, Mode::Free) => Bitmap::StutterLengthFree,
            (EffectId::Stutter, Mode::Quantized) => Bitmap::StutterLengthQuant,
            _ => Bitmap::Default,
        }
    }

    pub fn onset(effect: EffectId, mode: Mode) -> Self {
        match (effect, mode) {
            (EffectId::Choke, Mode::Free) => Bitmap::ChokeOnsetFree,
            (EffectId::Choke, Mode::Quantized) => Bitmap::ChokeOnsetQuant,
            (EffectId::Freeze, Mode::Free) => Bitmap::FreezeOnsetFree,
            (EffectId::Freeze, Mode::Quantized) => Bitmap::FreezeOnsetQuant,
            (EffectId::Stutter, Mode::Free) => Bitmap::StutterOnsetFree,
            (EffectId::Stutter, Mode::Quantized) => Bitmap::StutterOnsetQuant,
            _ => Bitmap::Default,
        }
    }

    pub fn capture_start(mode: Mode) -> Self {
        match mode {
            Mode::Free => Bitmap::StutterCaptureStartFree,
            Mode::Quantized => Bitmap::StutterCaptureStartQuant,
        }
    }

    pub fn capture_end(mode: Mode) -> Self {
        match mode {
            Mode::Free => Bitmap::StutterCaptureEndFree,
            Mode::Quantized => Bitmap::StutterCaptureEndQuant,
        }
    }

    /// "Effect engaged" bitmap.
    pub fn active(effect: EffectId) -> Self {
        match effect {
            EffectId::Freeze => Bitmap::FreezeActive,
            EffectId::Choke => Bitmap::ChokeActive,
            _ => Bitmap::Default,
        }
    }
}

impl Quantization {
    pub fn bitmap(self) -> Bitmap {
        match self {
            Quantization::Q32 => Bitmap::Quant32,
            Quantization::Q16 => Bitmap::Quant16,
            Quantization::Q8 => Bitmap::Quant8,
            Quantization::Q4 => Bitmap::Quant4,
        }
    }
}

impl StutterState {
    /// Waiting states show what they are waiting for.
    pub fn bitmap(self) -> Bitmap {
        match self {
            StutterState::IdleNoLoop => Bitmap::Default,
            StutterState::IdleWithLoop => Bitmap::StutterIdleWithLoop,
            StutterState::WaitCaptureStart
            | StutterState::Capturing
            | StutterState::WaitCaptureEnd => Bitmap::StutterCapturing,
            StutterState::WaitPlaybackOnset
            | StutterState::Playing
            | StutterState::WaitPlaybackLength => Bitmap::StutterPlaying,
        }
    }

    pub fn led(self) -> LedState {
        match self {
            StutterState::WaitCaptureStart | StutterState::WaitPlaybackOnset => LedState::Blink,
            StutterState::Capturing
            | StutterState::WaitCaptureEnd
            | StutterState::Playing
            | StutterState::WaitPlaybackLength => LedState::On,
            StutterState::IdleNoLoop | StutterState::IdleWithLoop => LedState::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LedState {
    #[default]
    Off,
    On,
    /// Armed, waiting for a boundary. The LED collaborator picks the rate.
    Blink,
}

impl From<bool> for LedState {
    fn from(on: bool) -> Self {
        if on {
            LedState::On
        } else {
            LedState::Off
        }
    }
}

/// Output to the display/LED collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiEvent {
    Led { effect: EffectId, state: LedState },
    Display(Bitmap),
    BeatLed(bool),
}

/// Where UI events go. Must not block.
pub trait UiSink {
    fn send(&mut self, event: UiEvent);
}

impl UiSink for Vec<UiEvent> {
    fn send(&mut self, event: UiEvent) {
        self.push(event);
    }
}

/// Last-activated display priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayManager {
    last_activated: EffectId,
}

impl DisplayManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_activated(&self) -> EffectId {
        self.last_activated
    }

    pub fn set_last_activated(&mut self, effect: EffectId) {
        self.last_activated = effect;
    }

    /// The effect shown wins if it is still active, then freeze, then
    /// choke, then the default screen.
    pub fn resolve(&self, rack: &EffectRack) -> Bitmap {
        let freeze = rack.freeze().is_enabled();
        let choke = rack.choke().is_enabled();
        let stutter = rack.stutter().state();

        match self.last_activated {
            EffectId::Stutter if !stutter.is_idle() => return stutter.bitmap(),
            EffectId::Freeze if freeze => return Bitmap::FreezeActive,
            EffectId::Choke if choke => return Bitmap::ChokeActive,
            _ => {}
        }

        if freeze {
            Bitmap::FreezeActive
        } else if choke {
            Bitmap::ChokeActive
        } else {
            Bitmap::Default
        }
    }
}

/// De-duplicating front end for a [`UiSink`], plus the display priority
/// state.
#[derive(Debug)]
pub struct Feedback<S: UiSink> {
    sink: S,
    leds: [Option<LedState>; EffectId::COUNT],
    bitmap: Option<Bitmap>,
    beat_led: Option<bool>,
    display: DisplayManager,
}

impl<S: UiSink> Feedback<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            leds: [None; EffectId::COUNT],
            bitmap: None,
            beat_led: None,
            display: DisplayManager::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn set_led(&mut self, effect: EffectId, state: LedState) {
        let slot = &mut self.leds[effect.index()];
        if *slot != Some(state) {
            *slot = Some(state);
            self.sink.send(UiEvent::Led { effect, state });
        }
    }

    pub fn show(&mut self, bitmap: Bitmap) {
        if self.bitmap != Some(bitmap) {
            self.bitmap = Some(bitmap);
            self.sink.send(UiEvent::Display(bitmap));
        }
    }

    pub fn set_beat_led(&mut self, on: bool) {
        if self.beat_led != Some(on) {
            self.beat_led = Some(on);
            self.sink.send(UiEvent::BeatLed(on));
        }
    }

    pub fn current_bitmap(&self) -> Option<Bitmap> {
        self.bitmap
    }

    pub fn last_activated(&self) -> EffectId {
        self.display.last_activated()
    }

    pub fn set_last_activated(&mut self, effect: EffectId) {
        self.display.set_last_activated(effect);
    }

    /// Show whatever the priority rules pick right now.
    pub fn update_display(&mut self, rack: &EffectRack) {
        let bitmap = self.display.resolve(rack);
        self.show(bitmap);
    }
}

/// Beat indicator pulse timing.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeatLed {
    off_at: Option<u64>,
}

impl BeatLed {
    /// Pulse length in MIDI ticks.
    pub const PULSE_TICKS: u32 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.off_at.is_some()
    }

    /// Switch on until `now` plus two ticks' worth of samples.
    pub fn pulse(&mut self, now: u64, samples_per_beat: u32) {
        let pulse = samples_per_beat as u64 * Self::PULSE_TICKS as u64 / crate::transport::PPQN as u64;
        self.off_at = Some(now + pulse);
    }

    pub fn off(&mut self) {
        self.off_at = None;
    }

    /// Returns `true` when the pulse has just run out.
    pub fn expire(&mut self, now: u64) -> bool {
        match self.off_at {
            Some(at) if now >= at => {
                self.off_at = None;
                true
            }
            _ => false,
        }
    }
}
