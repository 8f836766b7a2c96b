//! Sample-accurate timing authority.
//!
//! Reconciles two timelines:
//! - the sample counter, advanced by the audio block handler
//! - the MIDI beat/tick counter and tempo estimate, advanced by the
//!   clock-ingestion task
//!
//! Every field is a single atomic word, so readers on either side never see a
//! torn value and nothing here ever blocks.

use super::{BEATS_PER_BAR, MAX_BPM, MIN_BPM, PPQN};
use crate::compat::{AtomicU32, AtomicU64, AtomicU8};
use crate::{AtomicFlag, EngineConfig, Ordering};
use serde::Serialize;

/// Transport state as reported by the external MIDI clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum TransportState {
    /// Clock ticks are ignored; samples keep counting.
    #[default]
    Stopped = 0,
    Playing = 1,
    /// Same timing behavior as `Playing`.
    Recording = 2,
}

impl TransportState {
    fn from_u8(val: u8) -> Self {
        match val {
            1 => TransportState::Playing,
            2 => TransportState::Recording,
            _ => TransportState::Stopped,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TransportState::Stopped => "STOPPED",
            TransportState::Playing => "PLAYING",
            TransportState::Recording => "RECORDING",
        }
    }
}

/// Point-in-time view of the timing authority, for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSnapshot {
    pub sample_position: u64,
    pub beat: u32,
    pub bar: u32,
    pub beat_in_bar: u32,
    pub tick_in_beat: u32,
    pub bpm: f32,
    pub samples_per_beat: u32,
    pub transport: TransportState,
    pub samples_to_next_beat: u32,
    pub samples_to_next_bar: u32,
}

/// The single shared clock.
///
/// Writers:
/// - audio block handler: [`advance`](Self::advance)
/// - clock task: [`sync_to_midi_clock`](Self::sync_to_midi_clock),
///   [`increment_tick`](Self::increment_tick),
///   [`set_transport_state`](Self::set_transport_state),
///   [`reset`](Self::reset)
///
/// Everyone else only reads.
#[derive(Debug)]
pub struct TimeKeeper {
    sample_rate: u32,
    block_size: u32,
    tolerance: u32,
    default_samples_per_beat: u32,
    min_samples_per_beat: u32,
    max_samples_per_beat: u32,

    sample_position: AtomicU64,
    beat_number: AtomicU32,
    tick_in_beat: AtomicU32,
    samples_per_beat: AtomicU32,
    transport: AtomicU8,
    beat_flag: AtomicFlag,
}

impl TimeKeeper {
    pub fn new(config: &EngineConfig) -> Self {
        let default_spb = config.default_samples_per_beat();
        Self {
            sample_rate: config.sample_rate,
            block_size: config.block_size as u32,
            tolerance: config.boundary_tolerance,
            default_samples_per_beat: default_spb,
            min_samples_per_beat: config.samples_per_beat_at(MAX_BPM),
            max_samples_per_beat: config.samples_per_beat_at(MIN_BPM),
            sample_position: AtomicU64::new(0),
            beat_number: AtomicU32::new(0),
            tick_in_beat: AtomicU32::new(0),
            samples_per_beat: AtomicU32::new(default_spb),
            transport: AtomicU8::new(TransportState::Stopped as u8),
            beat_flag: AtomicFlag::new(false),
        }
    }

    /// Zero the counters, restore 120 BPM and stop the transport.
    ///
    /// A pending beat flag is left alone so an indicator that has not polled
    /// it yet still sees it.
    pub fn reset(&self) {
        self.sample_position.store(0, Ordering::Release);
        self.tick_in_beat.store(0, Ordering::Relaxed);
        self.beat_number.store(0, Ordering::Release);
        self.samples_per_beat
            .store(self.default_samples_per_beat, Ordering::Release);
        self.transport
            .store(TransportState::Stopped as u8, Ordering::Release);
    }

    // =========================================================================
    // Sample timeline (audio side)
    // =========================================================================

    /// Advance the sample counter by one block and return the position of the
    /// block's first sample.
    #[inline]
    pub fn advance(&self, num_samples: u32) -> u64 {
        self.sample_position
            .fetch_add(num_samples as u64, Ordering::AcqRel)
    }

    #[inline]
    pub fn increment_samples(&self, num_samples: u32) {
        self.advance(num_samples);
    }

    #[inline]
    pub fn sample_position(&self) -> u64 {
        self.sample_position.load(Ordering::Acquire)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    // =========================================================================
    // Beat timeline (clock task)
    // =========================================================================

    /// Derive samples-per-beat from a (smoothed) MIDI tick period.
    ///
    /// Periods implying a tempo outside 30..=300 BPM are ignored and the
    /// previous tempo is kept. Returns whether the update was applied.
    pub fn sync_to_midi_clock(&self, tick_period_us: u32) -> bool {
        let beat_period_us = tick_period_us as u64 * PPQN as u64;
        let spb = beat_period_us * self.sample_rate as u64 / 1_000_000;

        if spb < self.min_samples_per_beat as u64 || spb > self.max_samples_per_beat as u64 {
            tracing::trace!(tick_period_us, spb, "tempo update rejected");
            return false;
        }

        self.samples_per_beat.store(spb as u32, Ordering::Release);
        tracing::debug!(bpm = self.sample_rate * 60 / spb as u32, "synced to MIDI clock");
        true
    }

    /// Unchecked tempo override.
    pub fn set_samples_per_beat(&self, samples_per_beat: u32) {
        self.samples_per_beat
            .store(samples_per_beat, Ordering::Release);
    }

    /// Count one MIDI clock pulse. Every 24th pulse starts a new beat and
    /// raises the beat flag.
    pub fn increment_tick(&self) {
        let tick = self.tick_in_beat.load(Ordering::Relaxed) + 1;
        if tick >= PPQN {
            self.tick_in_beat.store(0, Ordering::Release);
            let beat = self.beat_number.fetch_add(1, Ordering::AcqRel) + 1;
            self.beat_flag.set(true);
            tracing::trace!(beat, "beat advance");
        } else {
            self.tick_in_beat.store(tick, Ordering::Release);
        }
    }

    /// Test-and-clear the "beat crossed" flag.
    #[inline]
    pub fn poll_beat_flag(&self) -> bool {
        self.beat_flag.swap(false)
    }

    pub fn set_transport_state(&self, state: TransportState) {
        let previous = self.transport.swap(state as u8, Ordering::AcqRel);
        if previous != state as u8 {
            tracing::debug!(state = state.name(), "transport state");
        }
    }

    #[inline]
    pub fn transport_state(&self) -> TransportState {
        TransportState::from_u8(self.transport.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(
            self.transport_state(),
            TransportState::Playing | TransportState::Recording
        )
    }

    #[inline]
    pub fn beat_number(&self) -> u32 {
        self.beat_number.load(Ordering::Acquire)
    }

    #[inline]
    pub fn bar_number(&self) -> u32 {
        self.beat_number() / BEATS_PER_BAR
    }

    #[inline]
    pub fn beat_in_bar(&self) -> u32 {
        self.beat_number() % BEATS_PER_BAR
    }

    #[inline]
    pub fn tick_in_beat(&self) -> u32 {
        self.tick_in_beat.load(Ordering::Acquire)
    }

    #[inline]
    pub fn samples_per_beat(&self) -> u32 {
        self.samples_per_beat.load(Ordering::Acquire)
    }

    pub fn bpm(&self) -> f32 {
        let spb = self.samples_per_beat();
        if spb == 0 {
            return 0.0;
        }
        (self.sample_rate as f32 * 60.0) / spb as f32
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    #[inline]
    pub fn beat_to_sample(&self, beat: u64) -> u64 {
        beat * self.samples_per_beat() as u64
    }

    #[inline]
    pub fn bar_to_sample(&self, bar: u64) -> u64 {
        bar * BEATS_PER_BAR as u64 * self.samples_per_beat() as u64
    }

    #[inline]
    pub fn sample_to_beat(&self, sample: u64) -> u64 {
        match self.samples_per_beat() {
            0 => 0,
            spb => sample / spb as u64,
        }
    }

    // =========================================================================
    // Boundary queries
    // =========================================================================

    /// Samples until the next beat, from the absolute sample position modulo
    /// the beat length. Up to `boundary_tolerance` samples past a boundary
    /// counts as "now" (0).
    pub fn samples_to_next_beat(&self) -> u32 {
        let spb = self.samples_per_beat();
        self.samples_to_next_multiple(spb)
    }

    pub fn samples_to_next_bar(&self) -> u32 {
        let spb = self.samples_per_beat();
        self.samples_to_next_multiple(spb.saturating_mul(BEATS_PER_BAR))
    }

    fn samples_to_next_multiple(&self, period: u32) -> u32 {
        if period == 0 {
            return 0;
        }
        let within = (self.sample_position() % period as u64) as u32;
        if within <= self.tolerance {
            return 0;
        }
        period - within
    }

    /// Samples until the next `subdivision`-sized slot of the current beat.
    ///
    /// Position inside the beat comes from the tick counter, not from sample
    /// modulo: after a tempo change only tick boundaries line up with the
    /// sample timeline.
    pub fn samples_to_next_subdivision(&self, subdivision: u32) -> u32 {
        let spb = self.samples_per_beat();
        let samples_per_tick = spb / PPQN;
        let elapsed = (self.tick_in_beat() * samples_per_tick).min(spb);

        if subdivision == 0 {
            return 0;
        }
        if subdivision >= spb {
            return spb - elapsed;
        }

        let index = elapsed / subdivision;
        let next_start = ((index + 1) * subdivision).min(spb);
        next_start - elapsed
    }

    /// Whether the current block sits on the beat the beat counter says we
    /// are in (`beat_number * samples_per_beat`), within one block.
    ///
    /// Used by indicators. Schedulers use the `samples_to_next_*` queries.
    pub fn is_on_beat_boundary(&self) -> bool {
        let offset = self.beat_boundary_offset();
        offset >= 0 && offset <= self.block_size as i64
    }

    pub fn is_on_bar_boundary(&self) -> bool {
        self.beat_in_bar() == 0 && self.is_on_beat_boundary()
    }

    /// Signed distance from `beat_number * samples_per_beat` to the current
    /// sample position. Zero drift between the beat counter and the sample
    /// counter keeps this inside `[0, samples_per_beat)`.
    pub fn beat_boundary_offset(&self) -> i64 {
        let position = self.sample_position() as i64;
        let expected = self.beat_number() as i64 * self.samples_per_beat() as i64;
        position - expected
    }

    pub fn snapshot(&self) -> TimeSnapshot {
        let beat = self.beat_number();
        TimeSnapshot {
            sample_position: self.sample_position(),
            beat,
            bar: beat / BEATS_PER_BAR,
            beat_in_bar: beat % BEATS_PER_BAR,
            tick_in_beat: self.tick_in_beat(),
            bpm: self.bpm(),
            samples_per_beat: self.samples_per_beat(),
            transport: self.transport_state(),
            samples_to_next_beat: self.samples_to_next_beat(),
            samples_to_next_bar: self.samples_to_next_bar(),
        }
    }
}
