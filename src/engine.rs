//! Engine wiring: the audio handler, the application loop and the queues
//! between them.

use crate::{LooperBuilder, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use microloop_core::{
    spsc_queue, Arc, AtomicFlag, BeatLed, Command, Consumer, ControlSurface, EffectUnit,
    EngineConfig, Feedback, LooperContext, Producer, Quantization, StutterState, TickTracker,
    TimeSnapshot, TransportEvent, UiEvent, UiSink,
};
use serde::Serialize;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace};

/// Input command queue size.
pub const COMMAND_QUEUE_SIZE: usize = 32;
/// MIDI clock timestamp queue size.
pub const CLOCK_QUEUE_SIZE: usize = 256;
/// MIDI transport event queue size.
pub const TRANSPORT_QUEUE_SIZE: usize = 32;

/// A fully allocated engine, ready to be split between execution contexts.
pub struct Looper {
    context: Arc<LooperContext>,
    units: [EffectUnit; 3],
    commands: (Producer<Command, COMMAND_QUEUE_SIZE>, Consumer<Command, COMMAND_QUEUE_SIZE>),
    clock: (Producer<u32, CLOCK_QUEUE_SIZE>, Consumer<u32, CLOCK_QUEUE_SIZE>),
    transport: (
        Producer<TransportEvent, TRANSPORT_QUEUE_SIZE>,
        Consumer<TransportEvent, TRANSPORT_QUEUE_SIZE>,
    ),
    ui: (Sender<UiEvent>, Receiver<UiEvent>),
    app_yield: Duration,
}

/// The engine, split by who owns what.
pub struct LooperParts {
    /// Runs in the audio interrupt / callback.
    pub audio: AudioHandler,
    /// Runs on the application thread.
    pub app: AppTask,
    /// Fed by the MIDI collaborator.
    pub midi: MidiInput,
    /// Fed by the input (button) collaborator.
    pub input: CommandInput,
    /// Drained by the display/LED collaborators.
    pub ui: Receiver<UiEvent>,
    pub context: Arc<LooperContext>,
}

impl Looper {
    pub fn builder() -> LooperBuilder {
        LooperBuilder::default()
    }

    pub(crate) fn new(config: EngineConfig, app_yield: Duration) -> Result<Self> {
        let context = Arc::new(LooperContext::new(config)?);
        let units = context.rack.units(&context.config);
        let ui = bounded(context.config.ui_channel_capacity);
        debug!(
            sample_rate = context.config.sample_rate,
            block_size = context.config.block_size,
            capture_samples = context.config.capture_buffer_samples(),
            "looper built"
        );

        Ok(Self {
            context,
            units,
            commands: spsc_queue(),
            clock: spsc_queue(),
            transport: spsc_queue(),
            ui,
            app_yield,
        })
    }

    pub fn context(&self) -> &Arc<LooperContext> {
        &self.context
    }

    pub fn split(self) -> LooperParts {
        let (command_tx, command_rx) = self.commands;
        let (clock_tx, clock_rx) = self.clock;
        let (transport_tx, transport_rx) = self.transport;
        let (ui_tx, ui_rx) = self.ui;

        LooperParts {
            audio: AudioHandler {
                context: Arc::clone(&self.context),
                units: self.units,
            },
            app: AppTask {
                context: Arc::clone(&self.context),
                commands: command_rx,
                clock: clock_rx,
                transport: transport_rx,
                tracker: TickTracker::new(),
                surface: ControlSurface::new(),
                feedback: Feedback::new(UiSender(ui_tx)),
                beat_led: BeatLed::new(),
                app_yield: self.app_yield,
            },
            midi: MidiInput {
                clock: clock_tx,
                transport: transport_tx,
            },
            input: CommandInput { commands: command_tx },
            ui: ui_rx,
            context: self.context,
        }
    }
}

/// The audio-interrupt side. Never blocks, never allocates.
pub struct AudioHandler {
    context: Arc<LooperContext>,
    units: [EffectUnit; 3],
}

impl AudioHandler {
    /// Process one stereo block in place: advance the clock, then run
    /// stutter, freeze and choke. Returns the position of the first frame.
    pub fn process(&mut self, left: &mut [i16], right: &mut [i16]) -> u64 {
        let len = left.len().min(right.len());
        let (left, right) = (&mut left[..len], &mut right[..len]);
        let start = self.context.timekeeper.advance(len as u32);
        for unit in self.units.iter_mut() {
            unit.process(left, right, start);
        }
        start
    }

    pub fn context(&self) -> &Arc<LooperContext> {
        &self.context
    }
}

/// [`UiSink`] over the bounded UI channel. A full channel drops the event.
#[derive(Debug, Clone)]
pub struct UiSender(Sender<UiEvent>);

impl UiSink for UiSender {
    fn send(&mut self, event: UiEvent) {
        match self.0.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => debug!(?event, "UI channel full, event dropped"),
            Err(TrySendError::Disconnected(_)) => trace!("UI receiver gone"),
        }
    }
}

/// The cooperative application loop.
pub struct AppTask {
    context: Arc<LooperContext>,
    commands: Consumer<Command, COMMAND_QUEUE_SIZE>,
    clock: Consumer<u32, CLOCK_QUEUE_SIZE>,
    transport: Consumer<TransportEvent, TRANSPORT_QUEUE_SIZE>,
    tracker: TickTracker,
    surface: ControlSurface,
    feedback: Feedback<UiSender>,
    beat_led: BeatLed,
    app_yield: Duration,
}

impl AppTask {
    /// One iteration: commands, visual feedback, transport, clock, beat LED.
    /// Bounded by the queue sizes. Returns the number of queue items handled.
    pub fn step(&mut self) -> usize {
        let ctx = &*self.context;
        let mut handled = 0;

        while let Some(cmd) = self.commands.pop() {
            handled += 1;
            if let Err(e) = self.surface.dispatch(ctx, &cmd, &mut self.feedback) {
                debug!(error = %e, ?cmd, "command ignored");
            }
        }

        self.surface.refresh(ctx, &mut self.feedback);

        while let Some(event) = self.transport.pop() {
            handled += 1;
            self.tracker.on_transport(event, &ctx.timekeeper);
            match event {
                TransportEvent::Start => {
                    self.beat_led.pulse(
                        ctx.timekeeper.sample_position(),
                        ctx.timekeeper.samples_per_beat(),
                    );
                    self.feedback.set_beat_led(true);
                }
                TransportEvent::Stop => {
                    self.beat_led.off();
                    self.feedback.set_beat_led(false);
                }
                TransportEvent::Continue => {}
            }
        }

        while let Some(timestamp) = self.clock.pop() {
            handled += 1;
            if ctx.timekeeper.is_running() {
                self.tracker.on_tick(timestamp, &ctx.timekeeper);
            }
        }

        let now = ctx.timekeeper.sample_position();
        if ctx.timekeeper.poll_beat_flag() {
            self.beat_led.pulse(now, ctx.timekeeper.samples_per_beat());
            self.feedback.set_beat_led(true);
        }
        if self.beat_led.expire(now) {
            self.feedback.set_beat_led(false);
        }

        handled
    }

    pub fn set_quantization(&mut self, grid: Quantization) {
        self.surface
            .set_quantization(&self.context, grid, &mut self.feedback);
    }

    pub fn status(&self) -> LooperStatus {
        LooperStatus::capture(&self.context)
    }

    /// Run [`step`](Self::step) on a named thread until `shutdown` is set.
    pub fn spawn(mut self, shutdown: Arc<AtomicFlag>) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("microloop-app".to_string())
            .spawn(move || {
                debug!("application loop started");
                while !shutdown.get() {
                    self.step();
                    thread::sleep(self.app_yield);
                }
                debug!("application loop stopped");
            })?;
        Ok(handle)
    }
}

/// Producer side of the MIDI clock and transport queues.
pub struct MidiInput {
    clock: Producer<u32, CLOCK_QUEUE_SIZE>,
    transport: Producer<TransportEvent, TRANSPORT_QUEUE_SIZE>,
}

impl MidiInput {
    /// Queue a clock pulse timestamp (µs). `false` if the queue was full.
    pub fn clock_tick(&mut self, timestamp_us: u32) -> bool {
        let pushed = self.clock.push(timestamp_us);
        if !pushed {
            debug!(timestamp_us, "clock queue full, tick dropped");
        }
        pushed
    }

    pub fn transport(&mut self, event: TransportEvent) -> bool {
        let pushed = self.transport.push(event);
        if !pushed {
            debug!(?event, "transport queue full, event dropped");
        }
        pushed
    }
}

/// Producer side of the command queue.
pub struct CommandInput {
    commands: Producer<Command, COMMAND_QUEUE_SIZE>,
}

impl CommandInput {
    /// `false` if the queue was full.
    pub fn send(&mut self, cmd: Command) -> bool {
        let pushed = self.commands.push(cmd);
        if !pushed {
            debug!(?cmd, "command queue full, command dropped");
        }
        pushed
    }

    /// Decode an 8-byte wire command and queue it.
    pub fn send_bytes(&mut self, bytes: [u8; Command::WIRE_SIZE]) -> Result<bool> {
        let cmd = Command::try_from_bytes(bytes)?;
        Ok(self.send(cmd))
    }
}

/// Status report, the structured form of a diagnostic dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LooperStatus {
    pub time: TimeSnapshot,
    pub quantization: Quantization,
    pub choke: bool,
    pub choke_gain: f32,
    pub freeze: bool,
    pub stutter: StutterState,
    pub loop_samples: usize,
}

impl LooperStatus {
    pub fn capture(ctx: &LooperContext) -> Self {
        Self {
            time: ctx.timekeeper.snapshot(),
            quantization: ctx.quantizer.grid(),
            choke: ctx.rack.choke().is_enabled(),
            choke_gain: ctx.rack.choke().gain(),
            freeze: ctx.rack.freeze().is_enabled(),
            stutter: ctx.rack.stutter().state(),
            loop_samples: ctx.rack.stutter().capture_length(),
        }
    }
}
