//! Stutter integration tests
//!
//! Capture with FUNC held, buffer-full handling and looped playback.

use crate::helpers::*;
use microloop::core::effects::param;
use microloop::prelude::*;
use microloop::StutterState;

fn state(rig: &Rig) -> StutterState {
    rig.ctx().rack.stutter().state()
}

/// Capture `blocks` blocks valued 1, 2, 3... and stop with the stutter
/// button, leaving an idle loop.
fn capture_blocks(rig: &mut Rig, blocks: i16) {
    rig.send(Command::press(EffectId::Func));
    rig.send(Command::press(EffectId::Stutter));
    for value in 1..=blocks {
        rig.cycle(value);
    }
    rig.send(Command::release(EffectId::Stutter));
    rig.send(Command::release(EffectId::Func));
}

#[test]
fn test_loop_plays_back_in_order_and_wraps() {
    let mut rig = Rig::new();
    capture_blocks(&mut rig, 3);
    assert_eq!(state(&rig), StutterState::IdleWithLoop);
    assert_eq!(rig.ctx().rack.stutter().capture_length(), 3 * TEST_BLOCK);

    rig.send(Command::press(EffectId::Stutter));
    assert_eq!(state(&rig), StutterState::Playing);

    let heard: Vec<i16> = (0..5).map(|_| rig.cycle(-1).1[0]).collect();
    assert_eq!(heard, vec![1, 2, 3, 1, 2]);

    rig.send(Command::release(EffectId::Stutter));
    assert_eq!(state(&rig), StutterState::IdleWithLoop);
    let (_, out) = rig.cycle(-1);
    assert!(out.iter().all(|&s| s == -1));
}

#[test]
fn test_full_buffer_ends_capture_into_playback() {
    let mut rig = Rig::with_builder(Looper::builder().min_capture_bpm(300));
    // One bar at 300 BPM
    let capacity: usize = 4 * 8_820;

    rig.send(Command::press(EffectId::Func));
    rig.send(Command::press(EffectId::Stutter));

    let blocks = capacity.div_ceil(TEST_BLOCK);
    for i in 0..blocks {
        rig.cycle(i as i16 + 1);
    }
    // Still holding the button, so the loop starts straight away
    assert_eq!(state(&rig), StutterState::Playing);
    assert_eq!(rig.ctx().rack.stutter().capture_length(), capacity);

    let (_, out) = rig.cycle(-5);
    assert!(out.iter().all(|&s| s == 1));

    rig.send(Command::release(EffectId::Stutter));
    rig.send(Command::release(EffectId::Func));
    assert_eq!(state(&rig), StutterState::IdleWithLoop);
}

#[test]
fn test_full_buffer_without_trigger_keeps_loop_idle() {
    let mut rig = Rig::with_builder(Looper::builder().min_capture_bpm(300));
    let capacity = 4 * 8_820;
    rig.send(Command::set_param(EffectId::Stutter, param::CAPTURE_END, 1));
    // One beat at 30 BPM is longer than the buffer
    rig.parts.app.set_quantization(Quantization::Q4);
    rig.ctx().timekeeper.set_samples_per_beat(88_200);

    rig.send(Command::press(EffectId::Func));
    rig.send(Command::press(EffectId::Stutter));
    rig.cycles(2, 50);
    rig.send(Command::release(EffectId::Stutter));
    assert_eq!(state(&rig), StutterState::WaitCaptureEnd);

    rig.cycles(capacity / TEST_BLOCK + 1, 50);
    assert_eq!(state(&rig), StutterState::IdleWithLoop);
    assert_eq!(rig.ctx().rack.stutter().capture_length(), capacity);
    assert_eq!(rig.ctx().rack.stutter().scheduled_capture_end(), None);
}

#[test]
fn test_recapture_replaces_loop() {
    let mut rig = Rig::new();
    capture_blocks(&mut rig, 4);
    assert_eq!(rig.ctx().rack.stutter().capture_length(), 4 * TEST_BLOCK);

    rig.send(Command::press(EffectId::Func));
    rig.send(Command::press(EffectId::Stutter));
    assert_eq!(state(&rig), StutterState::Capturing);
    rig.cycle(77);
    rig.send(Command::release(EffectId::Func));
    // FUNC let go first: straight into playback of the new loop
    assert_eq!(state(&rig), StutterState::Playing);
    assert_eq!(rig.ctx().rack.stutter().capture_length(), TEST_BLOCK);

    let (_, out) = rig.cycle(0);
    assert!(out.iter().all(|&s| s == 77));
}

#[test]
fn test_quantized_playback_waits_for_boundary() {
    let mut rig = Rig::new();
    capture_blocks(&mut rig, 2);
    rig.send(Command::set_param(EffectId::Stutter, param::ONSET, 1));

    rig.send(Command::press(EffectId::Stutter));
    assert_eq!(state(&rig), StutterState::WaitPlaybackOnset);
    assert!(rig.ui_events().contains(&UiEvent::Led {
        effect: EffectId::Stutter,
        state: LedState::Blink,
    }));

    // Next 1/16 boundary of the default tempo is 5512 samples out
    rig.cycles(5_512 / TEST_BLOCK + 1, 0);
    assert_eq!(state(&rig), StutterState::Playing);
    assert!(rig
        .ui_events()
        .contains(&UiEvent::Display(Bitmap::StutterPlaying)));
}
