//! Test fixtures for microloop integration tests
//!
//! Drives every execution context by hand: audio blocks, application loop
//! iterations and MIDI clock pulses all happen on the test thread, in an
//! order the test chooses.

#![allow(dead_code)]

use microloop::prelude::*;
use microloop::LooperContext;
use std::sync::Once;

/// Block size used by every fixture.
pub const TEST_BLOCK: usize = 128;

/// 24 pulses per beat at 120 BPM.
pub const TICK_PERIOD_US: u32 = 20_833;

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub struct Rig {
    pub parts: LooperParts,
    clock_us: u32,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_builder(Looper::builder())
    }

    pub fn with_builder(builder: LooperBuilder) -> Self {
        init_tracing();
        let looper = builder
            .block_size(TEST_BLOCK)
            .build()
            .expect("Failed to build looper");
        Self {
            parts: looper.split(),
            clock_us: 0,
        }
    }

    pub fn ctx(&self) -> &LooperContext {
        &self.parts.context
    }

    /// Owned handle to the shared state, for holding across `&mut` calls.
    pub fn shared(&self) -> Arc<LooperContext> {
        Arc::clone(&self.parts.context)
    }

    pub fn position(&self) -> u64 {
        self.ctx().timekeeper.sample_position()
    }

    /// Send MIDI Start and let the application loop pick it up.
    pub fn start(&mut self) {
        assert!(self.parts.midi.transport(TransportEvent::Start));
        self.parts.app.step();
    }

    /// One MIDI clock pulse at the steady 120 BPM period.
    pub fn tick(&mut self) {
        assert!(self.parts.midi.clock_tick(self.clock_us));
        self.clock_us = self.clock_us.wrapping_add(TICK_PERIOD_US);
        self.parts.app.step();
    }

    pub fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Queue a command and run one application loop iteration.
    pub fn send(&mut self, cmd: Command) {
        assert!(self.parts.input.send(cmd), "command queue full");
        self.parts.app.step();
    }

    /// Process one block of constant input. Returns its start position and
    /// the processed left channel.
    pub fn block_of(&mut self, value: i16) -> (u64, Vec<i16>) {
        let mut left = vec![value; TEST_BLOCK];
        let mut right = vec![value; TEST_BLOCK];
        let start = self.parts.audio.process(&mut left, &mut right);
        (start, left)
    }

    /// Process one block, then one application loop iteration.
    pub fn cycle(&mut self, value: i16) -> (u64, Vec<i16>) {
        let out = self.block_of(value);
        self.parts.app.step();
        out
    }

    pub fn cycles(&mut self, n: usize, value: i16) {
        for _ in 0..n {
            self.cycle(value);
        }
    }

    /// Everything the display/LED side has received so far.
    pub fn ui_events(&self) -> Vec<UiEvent> {
        self.parts.ui.try_iter().collect()
    }
}
