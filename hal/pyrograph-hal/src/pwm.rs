//! Laser PWM channel abstraction
//!
//! The laser is driven by a second, independent timer peripheral in PWM
//! mode. The duty register may be rewritten while the timer runs; the
//! output override connects or disconnects the compare output from the
//! physical pin.

/// PWM channel driving the laser diode
pub trait LaserPwm {
    /// Write the duty-cycle register (0 = off, 255 = full intensity).
    ///
    /// Safe to call from interrupt context while the timer is running.
    fn set_duty(&mut self, duty: u8);

    /// Connect the compare output to the physical pin.
    fn connect(&mut self);

    /// Disconnect the compare output from the physical pin. The pin falls
    /// back to its GPIO level.
    fn disconnect(&mut self);

    /// Start the PWM timer.
    fn start(&mut self);

    /// Stop the PWM timer.
    fn stop(&mut self);
}
