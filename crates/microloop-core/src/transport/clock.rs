//! MIDI clock ingestion: tick timestamps in, tempo and beat position out.

use super::{TimeKeeper, TransportState};
use serde::{Deserialize, Serialize};

/// Realtime transport messages from the MIDI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransportEvent {
    /// Rewind to zero and play.
    Start = 0,
    Stop = 1,
    /// Play from the current position.
    Continue = 2,
}

/// Smooths raw MIDI clock timestamps into a tick period.
#[derive(Debug, Clone)]
pub struct TickTracker {
    last_tick_us: Option<u32>,
    avg_period_us: u32,
}

impl TickTracker {
    /// 120 BPM.
    pub const DEFAULT_PERIOD_US: u32 = 20_833;
    pub const MIN_PERIOD_US: u32 = 10_000;
    pub const MAX_PERIOD_US: u32 = 50_000;

    pub fn new() -> Self {
        Self {
            last_tick_us: None,
            avg_period_us: Self::DEFAULT_PERIOD_US,
        }
    }

    /// Forget the previous timestamp; the next tick only sets the reference.
    pub fn reset(&mut self) {
        self.last_tick_us = None;
    }

    #[inline]
    pub fn average_period_us(&self) -> u32 {
        self.avg_period_us
    }

    /// Feed one clock pulse. Returns `true` if the tempo estimate moved.
    ///
    /// Every pulse advances the beat/tick counter, even one whose period was
    /// rejected as jitter.
    pub fn on_tick(&mut self, timestamp_us: u32, timekeeper: &TimeKeeper) -> bool {
        let mut synced = false;
        if let Some(last) = self.last_tick_us {
            let period = timestamp_us.wrapping_sub(last);
            if (Self::MIN_PERIOD_US..=Self::MAX_PERIOD_US).contains(&period) {
                self.avg_period_us = (self.avg_period_us * 9 + period) / 10;
                synced = timekeeper.sync_to_midi_clock(self.avg_period_us);
            } else {
                tracing::trace!(period, "clock period out of range");
            }
        }
        self.last_tick_us = Some(timestamp_us);
        timekeeper.increment_tick();
        synced
    }

    /// Apply a transport message.
    pub fn on_transport(&mut self, event: TransportEvent, timekeeper: &TimeKeeper) {
        match event {
            TransportEvent::Start => {
                self.reset();
                timekeeper.reset();
                timekeeper.set_transport_state(TransportState::Playing);
            }
            TransportEvent::Stop => timekeeper.set_transport_state(TransportState::Stopped),
            TransportEvent::Continue => timekeeper.set_transport_state(TransportState::Playing),
        }
    }
}

impl Default for TickTracker {
    fn default() -> Self {
        Self::new()
    }
}
