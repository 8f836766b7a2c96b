//! Freeze integration tests
//!
//! Quantized onset and length against a running MIDI clock, all the way
//! from the command queue to the audio output and the UI channel.

use crate::helpers::*;
use microloop::core::effects::param;
use microloop::prelude::*;

/// Started transport, five clock pulses in (tick 5 of beat 0), freeze set to
/// quantized onset and length, position 4992.
fn armed_rig() -> Rig {
    let mut rig = Rig::new();
    rig.start();
    rig.ticks(5);
    // 20833 us * 24 at 44.1 kHz
    assert_eq!(rig.ctx().timekeeper.samples_per_beat(), 22_049);
    assert_eq!(rig.ctx().timekeeper.tick_in_beat(), 5);

    rig.cycles(39, 100);
    assert_eq!(rig.position(), 4_992);

    rig.send(Command::set_param(EffectId::Freeze, param::ONSET, 1));
    rig.send(Command::set_param(EffectId::Freeze, param::LENGTH, 1));
    rig
}

#[test]
fn test_quantized_freeze_fires_once_at_each_deadline() {
    let mut rig = armed_rig();
    let ctx = rig.shared();
    let freeze = ctx.rack.freeze();

    // 918 samples per tick, 5 ticks in: 4590 into the beat. The next 1/16
    // boundary (5512) is 922 away; minus the 128 sample lookahead.
    let onset = 4_992 + 922 - 128;
    assert_eq!(rig.ctx().quantizer.onset_deadline(&rig.ctx().timekeeper), onset);

    rig.send(Command::press(EffectId::Freeze));
    // Ignored while the length is quantized
    rig.send(Command::release(EffectId::Freeze));
    assert!(!freeze.is_enabled());
    assert_eq!(freeze.latch().scheduled_onset(), Some(onset));
    assert_eq!(freeze.latch().scheduled_release(), Some(onset + 5_512));

    let mut transitions = Vec::new();
    let mut was_enabled = false;
    while rig.position() < 20_000 {
        let (start, _) = rig.cycle(100);
        let enabled = freeze.is_enabled();
        if enabled != was_enabled {
            transitions.push((start, enabled));
            was_enabled = enabled;
        }
    }

    // Each deadline fires inside the block that contains it
    assert_eq!(transitions, vec![(5_760, true), (11_264, false)]);
    assert_eq!(freeze.latch().scheduled_onset(), None);
    assert_eq!(freeze.latch().scheduled_release(), None);
}

#[test]
fn test_frozen_output_replays_audio_before_onset() {
    let mut rig = armed_rig();
    rig.send(Command::press(EffectId::Freeze));

    // Blocks 4992..5760 carry 100; the onset block and later carry 9000.
    rig.cycles(6, 100);
    assert_eq!(rig.position(), 5_760);

    let (start, out) = rig.cycle(9_000);
    assert_eq!(start, 5_760);
    assert!(rig.ctx().rack.freeze().is_enabled());
    assert!(out.iter().all(|&s| s == 100));

    let (_, out) = rig.cycle(9_000);
    assert!(out.iter().all(|&s| s == 100));
}

#[test]
fn test_freeze_feedback_follows_audio_side() {
    let mut rig = armed_rig();
    let _ = rig.ui_events();

    rig.send(Command::press(EffectId::Freeze));
    assert!(rig
        .ui_events()
        .iter()
        .all(|e| !matches!(e, UiEvent::Led { effect: EffectId::Freeze, .. })));

    rig.cycles(60, 100);
    let events = rig.ui_events();

    let on = events.iter().position(|e| {
        *e == UiEvent::Led {
            effect: EffectId::Freeze,
            state: LedState::On,
        }
    });
    let off = events.iter().position(|e| {
        *e == UiEvent::Led {
            effect: EffectId::Freeze,
            state: LedState::Off,
        }
    });
    assert!(on.is_some() && off.is_some());
    assert!(on < off);
    assert!(events.contains(&UiEvent::Display(Bitmap::FreezeActive)));

    let last_display = events
        .iter()
        .rev()
        .find(|e| matches!(e, UiEvent::Display(_)));
    assert_eq!(last_display, Some(&UiEvent::Display(Bitmap::Default)));
}

#[test]
fn test_free_freeze_follows_button() {
    let mut rig = Rig::new();
    rig.cycles(4, 500);

    rig.send(Command::press(EffectId::Freeze));
    assert!(rig.ctx().rack.freeze().is_enabled());
    let (_, out) = rig.cycle(-700);
    assert!(out.iter().all(|&s| s == 500));

    rig.send(Command::release(EffectId::Freeze));
    assert!(!rig.ctx().rack.freeze().is_enabled());
    let (_, out) = rig.cycle(-700);
    assert!(out.iter().all(|&s| s == -700));
}
