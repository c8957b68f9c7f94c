//! Laser PWM sequencing
//!
//! The modulator is electrically unforgiving: connecting the PWM output
//! before the duty register holds the first pixel burns a wrong first
//! pixel, and leaving the output connected after a move can latch a stale
//! nonzero intensity. This wrapper pins the call order down.

use pyrograph_hal::{LaserPwm, OutputPin};

/// Laser channel with enforced arm/disarm sequencing
///
/// The PWM handle here is used only while no move is running; during a
/// raster move the step ISR rewrites the duty register through its own
/// handle. Both sides follow the single-writer rule: foreground writes
/// only while idle, the ISR only while running.
pub struct RasterLaser<P: LaserPwm, G: OutputPin> {
    pwm: P,
    gate: G,
    armed: bool,
}

impl<P: LaserPwm, G: OutputPin> RasterLaser<P, G> {
    /// Take ownership of the PWM channel and the gate pin, starting with
    /// the laser forced off
    pub fn new(pwm: P, mut gate: G) -> Self {
        gate.set_low();
        Self {
            pwm,
            gate,
            armed: false,
        }
    }

    /// Arm the laser for a raster move: preload the first pixel's duty,
    /// start the PWM timer, and only then connect the output to the pin
    pub fn arm(&mut self, first_duty: u8) {
        debug_assert!(!self.armed);
        self.pwm.set_duty(first_duty);
        self.pwm.start();
        self.pwm.connect();
        self.armed = true;
    }

    /// Disarm after a move: stop the PWM timer, disconnect the override,
    /// and force the pin low
    pub fn disarm(&mut self) {
        self.pwm.stop();
        self.pwm.disconnect();
        self.gate.set_low();
        self.armed = false;
    }

    /// True while the output is connected
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Duty(u8),
        Start,
        Stop,
        Connect,
        Disconnect,
        GateLow,
    }

    #[derive(Clone)]
    struct Log(Rc<RefCell<Vec<Op>>>);

    struct MockPwm(Log);
    impl LaserPwm for MockPwm {
        fn set_duty(&mut self, duty: u8) {
            self.0 .0.borrow_mut().push(Op::Duty(duty));
        }
        fn connect(&mut self) {
            self.0 .0.borrow_mut().push(Op::Connect);
        }
        fn disconnect(&mut self) {
            self.0 .0.borrow_mut().push(Op::Disconnect);
        }
        fn start(&mut self) {
            self.0 .0.borrow_mut().push(Op::Start);
        }
        fn stop(&mut self) {
            self.0 .0.borrow_mut().push(Op::Stop);
        }
    }

    struct MockGate(Log);
    impl OutputPin for MockGate {
        fn set_high(&mut self) {}
        fn set_low(&mut self) {
            self.0 .0.borrow_mut().push(Op::GateLow);
        }
    }

    #[test]
    fn test_arm_preloads_duty_before_connecting() {
        let log = Log(Rc::new(RefCell::new(Vec::new())));
        let mut laser = RasterLaser::new(MockPwm(log.clone()), MockGate(log.clone()));
        laser.arm(42);

        assert!(laser.is_armed());
        assert_eq!(
            *log.0.borrow(),
            [Op::GateLow, Op::Duty(42), Op::Start, Op::Connect]
        );
    }

    #[test]
    fn test_disarm_stops_before_releasing_the_pin() {
        let log = Log(Rc::new(RefCell::new(Vec::new())));
        let mut laser = RasterLaser::new(MockPwm(log.clone()), MockGate(log.clone()));
        laser.arm(10);
        log.0.borrow_mut().clear();

        laser.disarm();
        assert!(!laser.is_armed());
        assert_eq!(*log.0.borrow(), [Op::Stop, Op::Disconnect, Op::GateLow]);
    }
}
