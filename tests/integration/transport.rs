//! Transport integration tests
//!
//! MIDI start/stop, clock ingestion, the beat LED and the queues between
//! contexts.

use crate::helpers::*;
use approx::assert_relative_eq;
use microloop::prelude::*;
use microloop::{TransportState, CLOCK_QUEUE_SIZE};
use std::time::Duration;

fn beat_led_events(events: &[UiEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::BeatLed(on) => Some(*on),
            _ => None,
        })
        .collect()
}

#[test]
fn test_start_rewinds_and_pulses_beat_led() {
    let mut rig = Rig::new();
    rig.cycles(10, 0);
    assert_eq!(rig.position(), 1_280);

    rig.start();
    assert_eq!(rig.position(), 0);
    assert_eq!(rig.ctx().timekeeper.transport_state(), TransportState::Playing);

    // Two ticks at 120 BPM: 1837 samples
    rig.cycles(14, 0);
    assert_eq!(beat_led_events(&rig.ui_events()), vec![true]);
    rig.cycles(1, 0);
    assert_eq!(beat_led_events(&rig.ui_events()), vec![false]);
}

#[test]
fn test_every_24th_tick_is_a_beat() {
    let mut rig = Rig::new();
    rig.start();
    rig.cycles(20, 0);
    let _ = rig.ui_events();

    rig.ticks(23);
    assert_eq!(rig.ctx().timekeeper.beat_number(), 0);
    assert_eq!(rig.ctx().timekeeper.tick_in_beat(), 23);
    assert!(beat_led_events(&rig.ui_events()).is_empty());

    rig.tick();
    assert_eq!(rig.ctx().timekeeper.beat_number(), 1);
    assert_eq!(rig.ctx().timekeeper.tick_in_beat(), 0);
    assert_eq!(beat_led_events(&rig.ui_events()), vec![true]);

    rig.ticks(24 * 3);
    assert_eq!(rig.ctx().timekeeper.bar_number(), 1);
    assert_eq!(rig.ctx().timekeeper.beat_in_bar(), 0);
}

#[test]
fn test_stop_freezes_beat_position() {
    let mut rig = Rig::new();
    rig.start();
    rig.ticks(30);
    assert!(rig.parts.midi.transport(TransportEvent::Stop));
    rig.parts.app.step();
    assert_eq!(beat_led_events(&rig.ui_events()).last(), Some(&false));

    rig.ticks(30);
    assert_eq!(rig.ctx().timekeeper.beat_number(), 1);
    assert_eq!(rig.ctx().timekeeper.tick_in_beat(), 6);

    // Continue keeps the position
    assert!(rig.parts.midi.transport(TransportEvent::Continue));
    rig.parts.app.step();
    rig.tick();
    assert_eq!(rig.ctx().timekeeper.tick_in_beat(), 7);
}

#[test]
fn test_tempo_follows_slower_clock() {
    let mut rig = Rig::new();
    rig.start();

    // 100 BPM: 25 ms per pulse
    for i in 0..96u32 {
        assert!(rig.parts.midi.clock_tick(i * 25_000));
        rig.parts.app.step();
    }
    let spb = rig.ctx().timekeeper.samples_per_beat();
    assert!((26_300..=26_460).contains(&spb), "spb = {spb}");
    assert_relative_eq!(rig.ctx().timekeeper.bpm(), 100.0, epsilon = 0.5);
}

#[test]
fn test_jitter_is_rejected_but_counted() {
    let mut rig = Rig::new();
    rig.start();
    rig.ticks(4);
    let spb = rig.ctx().timekeeper.samples_per_beat();

    // A 60 ms gap is outside the accepted period range
    assert!(rig.parts.midi.clock_tick(4 * TICK_PERIOD_US + 60_000));
    rig.parts.app.step();
    assert_eq!(rig.ctx().timekeeper.samples_per_beat(), spb);
    assert_eq!(rig.ctx().timekeeper.tick_in_beat(), 5);
}

#[test]
fn test_clock_queue_overflow_drops_ticks() {
    let mut rig = Rig::new();
    rig.start();
    for i in 0..CLOCK_QUEUE_SIZE as u32 - 1 {
        assert!(rig.parts.midi.clock_tick(i * TICK_PERIOD_US));
    }
    assert!(!rig.parts.midi.clock_tick(0));

    assert_eq!(rig.parts.app.step(), CLOCK_QUEUE_SIZE - 1);
    // 255 pulses: 10 beats and 15 ticks
    assert_eq!(rig.ctx().timekeeper.beat_number(), 10);
    assert_eq!(rig.ctx().timekeeper.tick_in_beat(), 15);
}

#[test]
fn test_spawned_app_loop_handles_commands() {
    let looper = Looper::builder()
        .app_yield(Duration::from_millis(1))
        .build()
        .expect("Failed to build looper");
    let LooperParts {
        app,
        mut input,
        context,
        ui,
        ..
    } = looper.split();

    let shutdown = Arc::new(AtomicFlag::new(false));
    let handle = app
        .spawn(Arc::clone(&shutdown))
        .expect("Failed to spawn app loop");

    assert!(input.send(Command::press(EffectId::Choke)));
    let event = ui
        .recv_timeout(Duration::from_secs(2))
        .expect("no UI event from app loop");
    assert!(matches!(event, UiEvent::Led { .. } | UiEvent::Display(_)));

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while !context.rack.choke().is_enabled() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(context.rack.choke().is_enabled());

    shutdown.set(true);
    handle.join().expect("app loop panicked");
}
