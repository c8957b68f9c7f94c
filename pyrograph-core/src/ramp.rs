//! Ramp engine
//!
//! Executes one acceleration or deceleration phase, optionally padded with
//! a constant-velocity phase, toward a terminal `rate` (inter-step delay)
//! over a total budget of `pad_steps`. The table prefix scan decides how
//! many of those steps ramp and how many cruise; each sub-move runs to
//! completion before the next is issued, so moves never overlap.

use crate::motion::{Axis, MoveCommand};
use crate::table::AccelTable;
use crate::traits::EngraveBackend;

/// Ramp length for `rate`, clamped so the boundary step stays inside the
/// table (the table length bounds the maximum representable ramp).
fn clamped_ramp_len(table: &AccelTable, rate: u16) -> u16 {
    table.ramp_len(rate).min(table.len() - 1)
}

/// Accelerate from standstill to `rate`, then cruise out the remainder of
/// `pad_steps`: ramp first, then flat.
///
/// The table walk covers `k + 1` steps (the boundary step included), so the
/// total distance is `pad_steps + 1` whenever the ramp fits the budget.
pub fn accelerate<B: EngraveBackend>(
    backend: &mut B,
    axis: Axis,
    table: &AccelTable,
    rate: u16,
    pad_steps: u16,
) {
    let k = clamped_ramp_len(table, rate);
    backend.run_move(axis, MoveCommand::table_forward(k + 1), table.delay(0));
    if k < pad_steps {
        backend.run_move(axis, MoveCommand::constant(pad_steps - k), rate);
    }
}

/// Cruise out the remainder of `pad_steps` at `rate`, then decelerate to a
/// stop: flat first, then ramp-down from table index `k`.
pub fn decelerate<B: EngraveBackend>(
    backend: &mut B,
    axis: Axis,
    table: &AccelTable,
    rate: u16,
    pad_steps: u16,
) {
    let k = clamped_ramp_len(table, rate);
    if k < pad_steps {
        backend.run_move(axis, MoveCommand::constant(pad_steps - k), rate);
    }
    backend.run_move(axis, MoveCommand::table_reverse(k), table.delay(k));
}
