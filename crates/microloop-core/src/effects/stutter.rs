//! Capture/playback looper.
//!
//! The state machine lives in the shared [`Stutter`] and only reacts to
//! "do it now" calls and to deadline expiry. Whether a user action is
//! immediate or deferred is the controller's decision.
//!
//! ```text
//! IdleNoLoop ──capture──▶ WaitCaptureStart ──▶ Capturing ──▶ WaitCaptureEnd
//!                                                  │               │
//!                                   end (held) ◀───┴───────────────┘ end (released)
//!                                        │                               │
//!                                        ▼                               ▼
//!         WaitPlaybackOnset ──▶ Playing ──▶ WaitPlaybackLength ──▶ IdleWithLoop
//! ```
//!
//! Capture writes a bounded, non-circular buffer. A full buffer ends the
//! capture on the spot, whatever deadline is pending.

use super::{param, AtomicMode, Mode};
use crate::compat::{Arc, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Vec};
use crate::lockfree::{AtomicDeadline, AtomicFlag};
use crate::Ordering;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum StutterState {
    /// Nothing captured.
    #[default]
    IdleNoLoop = 0,
    /// A loop is ready to play.
    IdleWithLoop = 1,
    WaitCaptureStart = 2,
    Capturing = 3,
    /// Still capturing; the end is scheduled.
    WaitCaptureEnd = 4,
    WaitPlaybackOnset = 5,
    Playing = 6,
    /// Still playing; the stop is scheduled.
    WaitPlaybackLength = 7,
}

impl StutterState {
    fn from_u8(val: u8) -> Self {
        match val {
            1 => StutterState::IdleWithLoop,
            2 => StutterState::WaitCaptureStart,
            3 => StutterState::Capturing,
            4 => StutterState::WaitCaptureEnd,
            5 => StutterState::WaitPlaybackOnset,
            6 => StutterState::Playing,
            7 => StutterState::WaitPlaybackLength,
            _ => StutterState::IdleNoLoop,
        }
    }

    #[inline]
    pub fn is_idle(self) -> bool {
        matches!(self, StutterState::IdleNoLoop | StutterState::IdleWithLoop)
    }

    /// Writing into the capture buffer.
    #[inline]
    pub fn is_capturing(self) -> bool {
        matches!(self, StutterState::Capturing | StutterState::WaitCaptureEnd)
    }

    /// Emitting the captured loop.
    #[inline]
    pub fn is_playing(self) -> bool {
        matches!(self, StutterState::Playing | StutterState::WaitPlaybackLength)
    }

    pub fn name(self) -> &'static str {
        match self {
            StutterState::IdleNoLoop => "IDLE_NO_LOOP",
            StutterState::IdleWithLoop => "IDLE_WITH_LOOP",
            StutterState::WaitCaptureStart => "WAIT_CAPTURE_START",
            StutterState::Capturing => "CAPTURING",
            StutterState::WaitCaptureEnd => "WAIT_CAPTURE_END",
            StutterState::WaitPlaybackOnset => "WAIT_PLAYBACK_ONSET",
            StutterState::Playing => "PLAYING",
            StutterState::WaitPlaybackLength => "WAIT_PLAYBACK_LENGTH",
        }
    }
}

/// Shared half of the stutter.
#[derive(Debug)]
pub struct Stutter {
    state: AtomicU8,
    capacity: usize,

    onset_mode: AtomicMode,
    length_mode: AtomicMode,
    capture_start_mode: AtomicMode,
    capture_end_mode: AtomicMode,

    capture_start: AtomicDeadline,
    capture_end: AtomicDeadline,
    playback_onset: AtomicDeadline,
    playback_length: AtomicDeadline,

    /// Trigger state recorded with a scheduled capture end.
    end_trigger_held: AtomicFlag,
    /// Live trigger state, used when a full buffer ends the capture.
    trigger_held: AtomicFlag,

    capture_len: AtomicUsize,
    /// `(capture_epoch << 32) | samples_written`, published by the unit.
    progress: AtomicU64,
    capture_epoch: AtomicU32,
    playback_epoch: AtomicU32,
}

impl Stutter {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: AtomicU8::new(StutterState::IdleNoLoop as u8),
            capacity: capacity.clamp(1, u32::MAX as usize),
            onset_mode: AtomicMode::default(),
            length_mode: AtomicMode::default(),
            capture_start_mode: AtomicMode::default(),
            capture_end_mode: AtomicMode::default(),
            capture_start: AtomicDeadline::new(),
            capture_end: AtomicDeadline::new(),
            playback_onset: AtomicDeadline::new(),
            playback_length: AtomicDeadline::new(),
            end_trigger_held: AtomicFlag::new(false),
            trigger_held: AtomicFlag::new(false),
            capture_len: AtomicUsize::new(0),
            progress: AtomicU64::new(0),
            capture_epoch: AtomicU32::new(0),
            playback_epoch: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn state(&self) -> StutterState {
        StutterState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn set_state(&self, state: StutterState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Capture buffer size in samples per channel.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn capture_length(&self) -> usize {
        self.capture_len.load(Ordering::Acquire)
    }

    #[inline]
    pub fn has_loop(&self) -> bool {
        self.capture_length() > 0
    }

    /// Samples written by the capture in progress, as of the last block.
    pub fn samples_captured(&self) -> usize {
        let progress = self.progress.load(Ordering::Acquire);
        if (progress >> 32) as u32 == self.capture_epoch.load(Ordering::Acquire) {
            (progress & u32::MAX as u64) as usize
        } else {
            0
        }
    }

    fn idle_state(&self) -> StutterState {
        if self.has_loop() {
            StutterState::IdleWithLoop
        } else {
            StutterState::IdleNoLoop
        }
    }

    // =========================================================================
    // Capture
    // =========================================================================

    /// Drop any loop and start writing from the top of the buffer.
    pub fn start_capture(&self) {
        self.begin_capture();
        tracing::info!("stutter capture started");
    }

    fn begin_capture(&self) {
        self.capture_start.cancel();
        self.capture_end.cancel();
        self.playback_onset.cancel();
        self.playback_length.cancel();
        self.capture_len.store(0, Ordering::Release);
        self.capture_epoch.fetch_add(1, Ordering::AcqRel);
        self.set_state(StutterState::Capturing);
    }

    pub fn schedule_capture_start(&self, sample: u64) {
        self.capture_start.schedule(sample);
        self.set_state(StutterState::WaitCaptureStart);
        tracing::debug!(sample, "stutter capture start scheduled");
    }

    /// Back to idle. An existing loop survives a cancelled re-capture.
    pub fn cancel_capture_start(&self) {
        self.capture_start.cancel();
        self.set_state(self.idle_state());
    }

    /// Close the capture at its current length.
    ///
    /// An empty capture discards the loop. Otherwise playback starts right
    /// away if the trigger is still held.
    pub fn end_capture(&self, trigger_held: bool) {
        let len = self.samples_captured();
        self.finish_capture(len, trigger_held);
        tracing::info!(
            length = len,
            state = self.state().name(),
            "stutter capture ended"
        );
    }

    fn finish_capture(&self, len: usize, trigger_held: bool) {
        self.capture_end.cancel();
        self.capture_len.store(len, Ordering::Release);
        if len == 0 {
            self.set_state(StutterState::IdleNoLoop);
        } else if trigger_held {
            self.begin_playback();
        } else {
            self.set_state(StutterState::IdleWithLoop);
        }
    }

    pub fn schedule_capture_end(&self, sample: u64, trigger_held: bool) {
        self.end_trigger_held.set(trigger_held);
        self.capture_end.schedule(sample);
        self.set_state(StutterState::WaitCaptureEnd);
        tracing::debug!(sample, trigger_held, "stutter capture end scheduled");
    }

    pub fn scheduled_capture_start(&self) -> Option<u64> {
        self.capture_start.get()
    }

    pub fn scheduled_capture_end(&self) -> Option<u64> {
        self.capture_end.get()
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Start looping from the top. Returns `false` if there is nothing to play.
    pub fn start_playback(&self) -> bool {
        if !self.has_loop() {
            return false;
        }
        self.begin_playback();
        tracing::info!(length = self.capture_length(), "stutter playback started");
        true
    }

    fn begin_playback(&self) {
        self.playback_onset.cancel();
        self.playback_epoch.fetch_add(1, Ordering::AcqRel);
        self.set_state(StutterState::Playing);
    }

    pub fn schedule_playback_onset(&self, sample: u64) -> bool {
        if !self.has_loop() {
            return false;
        }
        self.playback_onset.schedule(sample);
        self.set_state(StutterState::WaitPlaybackOnset);
        tracing::debug!(sample, "stutter playback onset scheduled");
        true
    }

    /// Stop playing, or give up on a scheduled onset.
    pub fn stop_playback(&self) {
        self.halt_playback();
        tracing::info!("stutter playback stopped");
    }

    fn halt_playback(&self) {
        self.playback_onset.cancel();
        self.playback_length.cancel();
        self.set_state(self.idle_state());
    }

    pub fn schedule_playback_length(&self, sample: u64) {
        self.playback_length.schedule(sample);
        self.set_state(StutterState::WaitPlaybackLength);
        tracing::debug!(sample, "stutter playback stop scheduled");
    }

    pub fn scheduled_playback_onset(&self) -> Option<u64> {
        self.playback_onset.get()
    }

    pub fn scheduled_playback_length(&self) -> Option<u64> {
        self.playback_length.get()
    }

    // =========================================================================
    // Generic effect surface
    // =========================================================================

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.state().is_playing()
    }

    pub fn enable(&self) {
        self.start_playback();
    }

    /// Leave whatever the current activity is, immediately.
    pub fn disable(&self) {
        match self.state() {
            StutterState::WaitCaptureStart => self.cancel_capture_start(),
            StutterState::Capturing | StutterState::WaitCaptureEnd => self.end_capture(false),
            StutterState::WaitPlaybackOnset
            | StutterState::Playing
            | StutterState::WaitPlaybackLength => self.stop_playback(),
            StutterState::IdleNoLoop | StutterState::IdleWithLoop => {}
        }
    }

    pub fn toggle(&self) {
        if self.is_enabled() {
            self.disable();
        } else {
            self.enable();
        }
    }

    pub fn set_trigger_held(&self, held: bool) {
        self.trigger_held.set(held);
    }

    pub fn trigger_held(&self) -> bool {
        self.trigger_held.get()
    }

    pub fn onset_mode(&self) -> Mode {
        self.onset_mode.get()
    }

    pub fn length_mode(&self) -> Mode {
        self.length_mode.get()
    }

    pub fn capture_start_mode(&self) -> Mode {
        self.capture_start_mode.get()
    }

    pub fn capture_end_mode(&self) -> Mode {
        self.capture_end_mode.get()
    }

    pub fn set_param(&self, index: u8, value: u32) -> bool {
        let mode = Mode::from_value(value);
        let target = match index {
            param::LENGTH => &self.length_mode,
            param::ONSET => &self.onset_mode,
            param::CAPTURE_START => &self.capture_start_mode,
            param::CAPTURE_END => &self.capture_end_mode,
            other => {
                tracing::warn!(effect = "Stutter", param = other, "unknown parameter");
                return false;
            }
        };
        target.set(mode);
        tracing::debug!(effect = "Stutter", param = index, mode = mode.name(), "parameter set");
        true
    }

    /// Fire due deadlines in fixed order. A deadline that no longer matches
    /// the state is dropped.
    fn fire_due(&self, block_start: u64, block_len: u64) {
        if self.capture_start.take_due(block_start, block_len)
            && self.state() == StutterState::WaitCaptureStart
        {
            self.begin_capture();
            tracing::trace!(block_start, "capture start fired");
        }
        if self.capture_end.take_due(block_start, block_len)
            && self.state() == StutterState::WaitCaptureEnd
        {
            self.finish_capture(self.samples_captured(), self.end_trigger_held.get());
            tracing::trace!(block_start, "capture end fired");
        }
        if self.playback_onset.take_due(block_start, block_len)
            && self.state() == StutterState::WaitPlaybackOnset
        {
            self.begin_playback();
            tracing::trace!(block_start, "playback onset fired");
        }
        if self.playback_length.take_due(block_start, block_len)
            && self.state() == StutterState::WaitPlaybackLength
        {
            self.halt_playback();
            tracing::trace!(block_start, "playback length fired");
        }
    }
}

/// Audio-side half: the capture buffer and its cursors.
#[derive(Debug)]
pub struct StutterUnit {
    shared: Arc<Stutter>,
    left: Vec<i16>,
    right: Vec<i16>,
    write: usize,
    read: usize,
    capture_epoch: u32,
    playback_epoch: u32,
}

impl StutterUnit {
    pub fn new(shared: Arc<Stutter>) -> Self {
        let capacity = shared.capacity();
        Self {
            capture_epoch: shared.capture_epoch.load(Ordering::Acquire),
            playback_epoch: shared.playback_epoch.load(Ordering::Acquire),
            shared,
            left: vec![0; capacity],
            right: vec![0; capacity],
            write: 0,
            read: 0,
        }
    }

    pub fn shared(&self) -> &Arc<Stutter> {
        &self.shared
    }

    fn sync_cursors(&mut self) {
        let capture_epoch = self.shared.capture_epoch.load(Ordering::Acquire);
        if capture_epoch != self.capture_epoch {
            self.capture_epoch = capture_epoch;
            self.write = 0;
            self.publish_progress();
        }
        let playback_epoch = self.shared.playback_epoch.load(Ordering::Acquire);
        if playback_epoch != self.playback_epoch {
            self.playback_epoch = playback_epoch;
            self.read = 0;
        }
    }

    fn publish_progress(&self) {
        let packed = ((self.capture_epoch as u64) << 32) | self.write as u64;
        self.shared.progress.store(packed, Ordering::Release);
    }

    pub fn process(&mut self, left: &mut [i16], right: &mut [i16], block_start: u64) {
        let len = left.len().min(right.len());
        self.sync_cursors();
        self.shared.fire_due(block_start, len as u64);
        self.sync_cursors();

        let state = self.shared.state();
        if state.is_capturing() {
            self.capture(&left[..len], &right[..len]);
        } else if state.is_playing() {
            self.play(&mut left[..len], &mut right[..len]);
        }
    }

    /// Input passes through untouched while it is recorded.
    fn capture(&mut self, left: &[i16], right: &[i16]) {
        let capacity = self.left.len();
        let n = left.len().min(capacity - self.write);
        self.left[self.write..self.write + n].copy_from_slice(&left[..n]);
        self.right[self.write..self.write + n].copy_from_slice(&right[..n]);
        self.write += n;
        self.publish_progress();

        if self.write == capacity {
            self.shared
                .finish_capture(capacity, self.shared.trigger_held.get());
            self.sync_cursors();
            tracing::trace!(capacity, "capture buffer full");
        }
    }

    fn play(&mut self, left: &mut [i16], right: &mut [i16]) {
        let loop_len = self.shared.capture_length().min(self.left.len());
        if loop_len == 0 {
            return;
        }
        if self.read >= loop_len {
            self.read = 0;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            *l = self.left[self.read];
            *r = self.right[self.read];
            self.read += 1;
            if self.read == loop_len {
                self.read = 0;
            }
        }
    }
}
