//! Choke integration tests

use crate::helpers::*;
use microloop::core::effects::param;
use microloop::prelude::*;

#[test]
fn test_choke_fades_out_and_back() {
    let mut rig = Rig::new();
    rig.send(Command::press(EffectId::Choke));

    let (_, first) = rig.cycle(10_000);
    assert!(first.windows(2).all(|w| w[1] <= w[0]));
    assert!(first[0] > 0 && first[127] < 10_000);

    let (_, second) = rig.cycle(10_000);
    assert!(second[127] == 0);

    rig.send(Command::release(EffectId::Choke));
    rig.cycles(2, 10_000);
    let (_, restored) = rig.cycle(10_000);
    assert!(restored.iter().all(|&s| s == 10_000));
    assert_eq!(rig.ctx().rack.choke().gain(), 1.0);
}

#[test]
fn test_quantized_length_releases_one_grid_after_press() {
    let mut rig = Rig::new();
    rig.send(Command::set_param(EffectId::Choke, param::LENGTH, 1));
    rig.cycles(10, 1_000);

    rig.send(Command::press(EffectId::Choke));
    let ctx = rig.shared();
    let choke = ctx.rack.choke();
    assert!(choke.is_enabled());
    // 1/16 of the default 22050 samples per beat
    assert_eq!(choke.latch().scheduled_release(), Some(1_280 + 5_512));

    rig.send(Command::release(EffectId::Choke));
    assert!(choke.is_enabled());

    let mut released_at = None;
    while rig.position() < 8_000 {
        let (start, _) = rig.cycle(1_000);
        if released_at.is_none() && !choke.is_enabled() {
            released_at = Some(start);
        }
    }
    assert_eq!(released_at, Some(6_784));
}

#[test]
fn test_release_before_quantized_onset_cancels_it() {
    let mut rig = Rig::new();
    rig.send(Command::set_param(EffectId::Choke, param::ONSET, 1));
    rig.cycles(3, 1_000);

    rig.send(Command::press(EffectId::Choke));
    let ctx = rig.shared();
    let choke = ctx.rack.choke();
    assert!(choke.latch().scheduled_onset().is_some());

    rig.send(Command::release(EffectId::Choke));
    assert_eq!(choke.latch().scheduled_onset(), None);

    rig.cycles(100, 1_000);
    assert!(!choke.is_enabled());
    let (_, out) = rig.cycle(1_000);
    assert!(out.iter().all(|&s| s == 1_000));
}

#[test]
fn test_choke_wins_over_frozen_audio() {
    let mut rig = Rig::new();
    rig.cycles(2, 3_000);
    rig.send(Command::press(EffectId::Freeze));
    rig.send(Command::press(EffectId::Choke));

    rig.cycles(2, 3_000);
    let (_, out) = rig.cycle(3_000);
    assert!(out.iter().all(|&s| s == 0));

    assert_eq!(rig.parts.app.status().choke_gain, 0.0);
    assert!(rig.parts.app.status().freeze);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_quantized_onset_fires_in_its_block(ticks in 0usize..24, blocks in 0usize..80) {
            let mut rig = Rig::new();
            rig.start();
            rig.ticks(ticks);
            rig.cycles(blocks, 1_000);
            rig.send(Command::set_param(EffectId::Choke, param::ONSET, 1));

            let pressed_at = rig.position();
            rig.send(Command::press(EffectId::Choke));
            let onset = rig.ctx().rack.choke().latch().scheduled_onset();
            prop_assert!(onset.is_some());
            let onset = onset.unwrap_or_default();
            prop_assert!(onset >= pressed_at);

            let mut fired_in = None;
            while fired_in.is_none() && rig.position() <= onset + 256 {
                let (start, _) = rig.cycle(1_000);
                if rig.ctx().rack.choke().is_enabled() {
                    fired_in = Some(start);
                }
            }
            let start = fired_in.unwrap_or(u64::MAX);
            prop_assert!(start <= onset && onset < start + TEST_BLOCK as u64);
        }
    }
}
