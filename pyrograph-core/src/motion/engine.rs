//! The step-pulse state machine
//!
//! The pulse-end compare interrupt is modeled as a pure function from
//! (engine state, event) to (new state, hardware effect), so the ISR logic
//! is testable on the host by injecting synthetic events. Hardware concerns
//! stay outside: the compare channels themselves de-assert and re-assert
//! the step pin, and the caller applies the returned effect to the timer or
//! PWM registers.

use super::{Direction, MoveCommand, MoveKind};
use crate::scanline::ScanlineBuffer;
use crate::table::AccelTable;

/// Register write the caller performs when a move continues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepEffect {
    /// Constant-rate step; nothing to reprogram
    None,
    /// Reprogram the step timer compare channels for this inter-step delay
    Delay(u16),
    /// Rewrite the laser PWM duty register
    LaserDuty(u8),
}

/// Result of one pulse-end event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepOutcome {
    /// Move continues; apply the effect before the next compare fires
    Continue(StepEffect),
    /// Final step: stop the timer, clear the running flag
    Complete,
}

/// Step-pulse engine: `Idle` or `Running` one move
///
/// Exactly one move is active at a time; arming while running is a
/// precondition violation prevented by the blocking caller, not detected
/// here (the ISR has no channel to report errors mid-flight).
#[derive(Debug, Default)]
pub struct StepEngine {
    cmd: Option<MoveCommand>,
}

impl StepEngine {
    /// Create an idle engine
    pub const fn new() -> Self {
        Self { cmd: None }
    }

    /// True when no move is in progress
    pub fn is_idle(&self) -> bool {
        self.cmd.is_none()
    }

    /// The move in progress, if any
    pub fn current(&self) -> Option<&MoveCommand> {
        self.cmd.as_ref()
    }

    /// Arm a move. The caller starts the timer and sets the running flag
    /// atomically with this.
    pub fn arm(&mut self, cmd: MoveCommand) {
        debug_assert!(self.cmd.is_none(), "engine is not reentrant");
        self.cmd = Some(cmd);
    }

    /// Handle a pulse-end compare event
    ///
    /// The completion test observes the index before any decrement: a
    /// reverse move is exhausted when the event fires at index 0, so the
    /// counter never wraps below zero.
    pub fn pulse_end(&mut self, table: &AccelTable, line: &ScanlineBuffer) -> StepOutcome {
        let Some(cmd) = self.cmd.as_mut() else {
            debug_assert!(false, "pulse-end event while idle");
            return StepOutcome::Complete;
        };

        let exhausted = match cmd.direction {
            Direction::Reverse => {
                if cmd.step_index == 0 {
                    true
                } else {
                    cmd.step_index -= 1;
                    false
                }
            }
            Direction::Forward => {
                cmd.step_index += 1;
                cmd.step_index == cmd.total_steps
            }
        };

        if exhausted {
            self.cmd = None;
            return StepOutcome::Complete;
        }

        let effect = match cmd.kind {
            MoveKind::Constant => StepEffect::None,
            MoveKind::Table => StepEffect::Delay(table.delay(cmd.step_index)),
            MoveKind::Raster => {
                StepEffect::LaserDuty(line.pixel(cmd.line_offset + cmd.step_index))
            }
        };
        StepOutcome::Continue(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_line() -> ScanlineBuffer {
        ScanlineBuffer::new()
    }

    /// Run a move to completion, collecting the per-event effects.
    fn drain(
        engine: &mut StepEngine,
        table: &AccelTable,
        line: &ScanlineBuffer,
    ) -> (u32, heapless::Vec<StepEffect, 64>) {
        let mut steps = 0u32;
        let mut effects = heapless::Vec::new();
        loop {
            steps += 1;
            match engine.pulse_end(table, line) {
                StepOutcome::Continue(e) => effects.push(e).unwrap(),
                StepOutcome::Complete => return (steps, effects),
            }
        }
    }

    #[test]
    fn test_constant_move_step_count() {
        let delays = [100u16];
        let table = AccelTable::new(&delays);
        let mut engine = StepEngine::new();
        engine.arm(MoveCommand::constant(5));
        assert!(!engine.is_idle());

        let (steps, effects) = drain(&mut engine, &table, &empty_line());
        assert_eq!(steps, 5);
        assert!(effects.iter().all(|e| *e == StepEffect::None));
        assert!(engine.is_idle());
    }

    #[test]
    fn test_table_forward_walks_prefix() {
        let delays = [100, 80, 60, 50, 40];
        let table = AccelTable::new(&delays);
        let mut engine = StepEngine::new();
        // k = 2 for rate 60 would arm 3 steps; delays seen are indices 1, 2
        engine.arm(MoveCommand::table_forward(3));

        let (steps, effects) = drain(&mut engine, &table, &empty_line());
        assert_eq!(steps, 3);
        assert_eq!(
            &effects[..],
            &[StepEffect::Delay(80), StepEffect::Delay(60)]
        );
    }

    #[test]
    fn test_table_reverse_walks_down_to_zero() {
        let delays = [100, 80, 60, 50, 40];
        let table = AccelTable::new(&delays);
        let mut engine = StepEngine::new();
        engine.arm(MoveCommand::table_reverse(2));

        let (steps, effects) = drain(&mut engine, &table, &empty_line());
        // Events fire at indices 2, 1, 0; the last one completes the move
        // without touching the counter.
        assert_eq!(steps, 3);
        assert_eq!(
            &effects[..],
            &[StepEffect::Delay(80), StepEffect::Delay(100)]
        );
    }

    #[test]
    fn test_raster_forward_reads_in_order() {
        let delays = [100u16];
        let table = AccelTable::new(&delays);
        let mut line = ScanlineBuffer::new();
        line.load(&[10, 20, 30, 40]).unwrap();

        let mut engine = StepEngine::new();
        engine.arm(MoveCommand::raster(4, Direction::Forward, 0));
        let (steps, effects) = drain(&mut engine, &table, &line);

        assert_eq!(steps, 4);
        // The first pixel was preloaded before the move; the ISR serves the
        // remaining ones in order.
        assert_eq!(
            &effects[..],
            &[
                StepEffect::LaserDuty(20),
                StepEffect::LaserDuty(30),
                StepEffect::LaserDuty(40),
            ]
        );
    }

    #[test]
    fn test_raster_reverse_mirrors() {
        let delays = [100u16];
        let table = AccelTable::new(&delays);
        let mut line = ScanlineBuffer::new();
        line.load(&[10, 20, 30, 40]).unwrap();

        let mut engine = StepEngine::new();
        engine.arm(MoveCommand::raster(4, Direction::Reverse, 0));
        let (steps, effects) = drain(&mut engine, &table, &line);

        assert_eq!(steps, 4);
        assert_eq!(
            &effects[..],
            &[
                StepEffect::LaserDuty(30),
                StepEffect::LaserDuty(20),
                StepEffect::LaserDuty(10),
            ]
        );
    }

    #[test]
    fn test_raster_with_line_offset() {
        let delays = [100u16];
        let table = AccelTable::new(&delays);
        let mut line = ScanlineBuffer::new();
        line.load(&[0, 0, 7, 8, 9]).unwrap();

        let mut engine = StepEngine::new();
        engine.arm(MoveCommand::raster(3, Direction::Forward, 2));
        let (_, effects) = drain(&mut engine, &table, &line);
        assert_eq!(
            &effects[..],
            &[StepEffect::LaserDuty(8), StepEffect::LaserDuty(9)]
        );
    }

    #[test]
    fn test_single_step_move() {
        let delays = [100u16];
        let table = AccelTable::new(&delays);
        let mut engine = StepEngine::new();
        engine.arm(MoveCommand::constant(1));
        assert_eq!(
            engine.pulse_end(&table, &empty_line()),
            StepOutcome::Complete
        );
        assert!(engine.is_idle());
    }
}
