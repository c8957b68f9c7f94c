//! Abstraction seams between the engine and the hardware glue
//!
//! The firmware implements these over the real peripherals; the simulation
//! backend implements them in memory so the whole job pipeline runs in
//! host tests.

use crate::motion::{Axis, Direction, MoveCommand};
use crate::scanline::CapacityError;

/// A byte read did not complete within the allowed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadTimeout;

/// The serial command link
pub trait CommandPort {
    /// Read one byte, waiting at most `timeout_ms` milliseconds
    fn read_byte(&mut self, timeout_ms: u32) -> Result<u8, ReadTimeout>;

    /// Queue bytes for transmission, blocking until accepted
    fn send(&mut self, bytes: &[u8]);
}

/// Motion and laser hardware behind the engine
///
/// `run_move` is synchronous: it arms the move, sets the running flag,
/// starts the step timer, and returns only after the ISR has cleared the
/// flag on completion. Moves therefore never overlap.
pub trait EngraveBackend {
    /// Set the physical motor direction for an axis. Only while idle.
    fn set_direction(&mut self, axis: Axis, direction: Direction);

    /// Execute one move to completion. `initial_delay` is the first
    /// inter-step delay in timer ticks; table and raster moves reprogram
    /// subsequent delays from the ISR.
    fn run_move(&mut self, axis: Axis, cmd: MoveCommand, initial_delay: u16);

    /// Fill the scanline buffer. Only while idle; the ISR reads the buffer
    /// during raster moves.
    fn load_line(&mut self, pixels: &[u8]) -> Result<(), CapacityError>;

    /// Preload the first pixel's duty and connect the laser output, in
    /// that order: the first physical pixel must never be wrong.
    fn laser_on(&mut self, first_duty: u8);

    /// Stop the laser PWM, disconnect the output override, and force the
    /// pin low so no stale intensity can latch.
    fn laser_off(&mut self);
}
