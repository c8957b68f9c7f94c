//! Raster indexing rules
//!
//! During a raster move the laser duty is rewritten once per step by the
//! motion ISR; the modulator itself holds no timing. What lives here is
//! the indexing contract shared by the initial preload and the ISR: for a
//! Reverse move the first pixel served is the *last* entry of the target
//! segment, and the step counter starts at `steps - 1`, so both sides
//! mirror consistently and neither renders the line flipped.

use crate::motion::Direction;
use crate::scanline::ScanlineBuffer;

/// Scanline index of the first pixel a raster move serves
pub fn first_pixel_index(line_offset: u16, steps: u16, direction: Direction) -> u16 {
    match direction {
        Direction::Forward => line_offset,
        Direction::Reverse => line_offset + steps - 1,
    }
}

/// Duty preloaded into the PWM register before the laser output is
/// connected
pub fn first_duty(
    line: &ScanlineBuffer,
    line_offset: u16,
    steps: u16,
    direction: Direction,
) -> u8 {
    line.pixel(first_pixel_index(line_offset, steps, direction))
}
