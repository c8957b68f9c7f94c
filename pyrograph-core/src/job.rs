//! Raster job parameters
//!
//! All parameters are host-supplied over the command protocol, validated on
//! receipt, and held for the duration of one job. A rejected value leaves
//! the previous one in place.

use crate::motion::PULSE_WIDTH_TICKS;
use crate::scanline::SCANLINE_CAPACITY;

/// Default cruise delay: 1000 ticks, 2000 steps/s at the 2 MHz tick rate
pub const DEFAULT_VELOCITY: u16 = 1000;

/// Default ramp pad length in steps
pub const DEFAULT_RAMP_STEPS: u16 = 64;

/// Default scanline advance in feed-axis steps
pub const DEFAULT_LINE_PITCH: u16 = 1;

/// A parameter value the device cannot honor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamError {
    /// Width of zero or beyond the scanline buffer capacity
    WidthOutOfRange,
    /// Height of zero
    ZeroHeight,
    /// Cruise delay not above the step pulse width
    VelocityTooFast,
}

/// Parameters of one raster job
///
/// `width` is the single canonical scanline width: pixels per line, bytes
/// per streamed line, and steps per raster move are all the same number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JobParameters {
    /// Scanline width in pixels (0 = not yet set)
    pub width: u16,
    /// Image height in lines (0 = not yet set)
    pub height: u16,
    /// Backlash compensation steps taken before a reversed line
    pub backlash: u16,
    /// Feed-axis steps between scanlines
    pub pitch: u16,
    /// Ramp pad length in steps for the accelerate/decelerate phases
    pub ramp_steps: u16,
    /// Cruise inter-step delay in timer ticks
    pub velocity: u16,
}

impl Default for JobParameters {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            backlash: 0,
            pitch: DEFAULT_LINE_PITCH,
            ramp_steps: DEFAULT_RAMP_STEPS,
            velocity: DEFAULT_VELOCITY,
        }
    }
}

impl JobParameters {
    /// Set the scanline width; capped at the buffer capacity so a raster
    /// move can never index past the buffer
    pub fn set_width(&mut self, width: u16) -> Result<(), ParamError> {
        if width == 0 || usize::from(width) > SCANLINE_CAPACITY {
            return Err(ParamError::WidthOutOfRange);
        }
        self.width = width;
        Ok(())
    }

    /// Set the image height in lines
    pub fn set_height(&mut self, height: u16) -> Result<(), ParamError> {
        if height == 0 {
            return Err(ParamError::ZeroHeight);
        }
        self.height = height;
        Ok(())
    }

    /// Set the backlash compensation step count (0 disables)
    pub fn set_backlash(&mut self, steps: u16) -> Result<(), ParamError> {
        self.backlash = steps;
        Ok(())
    }

    /// Set the feed advance between scanlines (0 disables feed motion)
    pub fn set_pitch(&mut self, steps: u16) -> Result<(), ParamError> {
        self.pitch = steps;
        Ok(())
    }

    /// Set the ramp pad length
    pub fn set_ramp_steps(&mut self, steps: u16) -> Result<(), ParamError> {
        self.ramp_steps = steps;
        Ok(())
    }

    /// Set the cruise delay; must exceed the step pulse width so the
    /// pulse-end compare always precedes the next pulse-start
    pub fn set_velocity(&mut self, ticks: u16) -> Result<(), ParamError> {
        if ticks <= PULSE_WIDTH_TICKS {
            return Err(ParamError::VelocityTooFast);
        }
        self.velocity = ticks;
        Ok(())
    }

    /// True once the host has supplied everything a job needs
    pub fn ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_not_ready() {
        let params = JobParameters::default();
        assert!(!params.ready());
        assert_eq!(params.velocity, DEFAULT_VELOCITY);
    }

    #[test]
    fn test_width_bounds() {
        let mut params = JobParameters::default();
        assert_eq!(params.set_width(0), Err(ParamError::WidthOutOfRange));
        assert_eq!(
            params.set_width(SCANLINE_CAPACITY as u16 + 1),
            Err(ParamError::WidthOutOfRange)
        );
        assert!(params.set_width(SCANLINE_CAPACITY as u16).is_ok());
    }

    #[test]
    fn test_rejected_value_leaves_previous() {
        let mut params = JobParameters::default();
        params.set_width(800).unwrap();
        assert!(params.set_width(5000).is_err());
        assert_eq!(params.width, 800);
    }

    #[test]
    fn test_velocity_must_exceed_pulse_width() {
        let mut params = JobParameters::default();
        assert_eq!(
            params.set_velocity(PULSE_WIDTH_TICKS),
            Err(ParamError::VelocityTooFast)
        );
        assert!(params.set_velocity(PULSE_WIDTH_TICKS + 1).is_ok());
    }

    #[test]
    fn test_ready_needs_width_and_height() {
        let mut params = JobParameters::default();
        params.set_width(100).unwrap();
        assert!(!params.ready());
        params.set_height(10).unwrap();
        assert!(params.ready());
    }
}
