//! Simulation backend
//!
//! Replays every move through the real [`StepEngine`], one synthetic
//! pulse-end event at a time, while recording step counts, programmed
//! delays, and laser duty writes. Host tests drive the ramp engine and the
//! whole job pipeline against it without hardware.

use heapless::Vec;

use crate::motion::{Axis, Direction, MoveCommand, StepEffect, StepEngine, StepOutcome};
use crate::scanline::{CapacityError, ScanlineBuffer};
use crate::table::AccelTable;
use crate::traits::{CommandPort, EngraveBackend, ReadTimeout};

/// Bounded trace capacity; traces saturate, counters do not
const TRACE_CAP: usize = 2048;

/// In-memory engraver backend
pub struct SimBackend<'t> {
    delays: &'t [u16],
    line: ScanlineBuffer,
    engine: StepEngine,
    scan_steps: u32,
    feed_steps: u32,
    direction_history: Vec<Direction, 128>,
    laser_armed: bool,
    laser_writes: u32,
    laser_trace: Vec<u8, TRACE_CAP>,
    delay_trace: Vec<u16, TRACE_CAP>,
}

impl<'t> SimBackend<'t> {
    /// Create a backend over a generated acceleration table
    pub fn new(delays: &'t [u16]) -> Self {
        Self {
            delays,
            line: ScanlineBuffer::new(),
            engine: StepEngine::new(),
            scan_steps: 0,
            feed_steps: 0,
            direction_history: Vec::new(),
            laser_armed: false,
            laser_writes: 0,
            laser_trace: Vec::new(),
            delay_trace: Vec::new(),
        }
    }

    /// Total steps emitted on an axis
    pub fn steps(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Scan => self.scan_steps,
            Axis::Feed => self.feed_steps,
        }
    }

    /// Every duty value written (preloads and per-step rewrites), bounded
    /// by the trace capacity; `laser_writes` counts them all
    pub fn laser_trace(&self) -> &[u8] {
        &self.laser_trace
    }

    /// Total duty writes, unbounded
    pub fn laser_writes(&self) -> u32 {
        self.laser_writes
    }

    /// Every delay programmed into the step timer (initial and per-step)
    pub fn delay_trace(&self) -> &[u16] {
        &self.delay_trace
    }

    /// Scan directions in the order they were set (one per line)
    pub fn direction_history(&self) -> &[Direction] {
        &self.direction_history
    }

    /// True while the laser output is connected
    pub fn laser_armed(&self) -> bool {
        self.laser_armed
    }

    fn record_duty(&mut self, duty: u8) {
        self.laser_writes += 1;
        let _ = self.laser_trace.push(duty);
    }
}

impl EngraveBackend for SimBackend<'_> {
    fn set_direction(&mut self, axis: Axis, direction: Direction) {
        debug_assert!(self.engine.is_idle());
        if axis == Axis::Scan {
            let _ = self.direction_history.push(direction);
        }
    }

    fn run_move(&mut self, axis: Axis, cmd: MoveCommand, initial_delay: u16) {
        debug_assert!(self.engine.is_idle(), "moves must never overlap");
        let table = AccelTable::new(self.delays);
        self.engine.arm(cmd);
        let _ = self.delay_trace.push(initial_delay);

        loop {
            match axis {
                Axis::Scan => self.scan_steps += 1,
                Axis::Feed => self.feed_steps += 1,
            }
            match self.engine.pulse_end(&table, &self.line) {
                StepOutcome::Continue(StepEffect::None) => {}
                StepOutcome::Continue(StepEffect::Delay(d)) => {
                    let _ = self.delay_trace.push(d);
                }
                StepOutcome::Continue(StepEffect::LaserDuty(d)) => {
                    debug_assert!(self.laser_armed, "duty write with laser disarmed");
                    self.record_duty(d);
                }
                StepOutcome::Complete => break,
            }
        }
    }

    fn load_line(&mut self, pixels: &[u8]) -> Result<(), CapacityError> {
        debug_assert!(self.engine.is_idle());
        self.line.load(pixels)
    }

    fn laser_on(&mut self, first_duty: u8) {
        debug_assert!(!self.laser_armed);
        // Duty is preloaded before the output connects
        self.record_duty(first_duty);
        self.laser_armed = true;
    }

    fn laser_off(&mut self) {
        self.laser_armed = false;
    }
}

/// Scripted serial link for controller tests: reads come from a fixed
/// byte slice, writes are recorded
pub struct SimPort<'a> {
    input: &'a [u8],
    cursor: usize,
    sent: Vec<u8, 1024>,
}

impl<'a> SimPort<'a> {
    /// Create a port that will serve `input` byte by byte
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            cursor: 0,
            sent: Vec::new(),
        }
    }

    /// Everything the device wrote
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// True once every scripted byte has been consumed
    pub fn exhausted(&self) -> bool {
        self.cursor == self.input.len()
    }
}

impl CommandPort for SimPort<'_> {
    fn read_byte(&mut self, _timeout_ms: u32) -> Result<u8, ReadTimeout> {
        // An exhausted script behaves like a silent host
        match self.input.get(self.cursor) {
            Some(&b) => {
                self.cursor += 1;
                Ok(b)
            }
            None => Err(ReadTimeout),
        }
    }

    fn send(&mut self, bytes: &[u8]) {
        let _ = self.sent.extend_from_slice(bytes);
    }
}
