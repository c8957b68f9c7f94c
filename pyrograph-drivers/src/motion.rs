//! Shared motion state and the blocking move executor
//!
//! `SharedMotion` is the single mutable state reachable from two logical
//! contexts: the foreground control flow and the step-pulse interrupt.
//! Everything the ISR touches lives behind one critical-section mutex; the
//! running flag is the sole handshake between the two sides. The
//! foreground arms a move and then busy-polls the flag — the chosen
//! suspension mechanism — and never mutates the move state while the flag
//! is set. Only the ISR clears the flag, on the completing step.

use core::cell::RefCell;

use critical_section::Mutex;
use portable_atomic::{AtomicBool, Ordering};

use pyrograph_core::motion::{Axis, Direction, MoveCommand, StepEffect, StepEngine, StepOutcome};
use pyrograph_core::scanline::{CapacityError, ScanlineBuffer};
use pyrograph_core::table::AccelTable;
use pyrograph_core::traits::EngraveBackend;
use pyrograph_hal::{LaserPwm, OutputPin, StepAxis, StepTimer};

use crate::laser::RasterLaser;

fn step_axis(axis: Axis) -> StepAxis {
    match axis {
        Axis::Scan => StepAxis::Scan,
        Axis::Feed => StepAxis::Feed,
    }
}

struct Inner<T: StepTimer, P: LaserPwm> {
    engine: StepEngine,
    line: ScanlineBuffer,
    table: AccelTable<'static>,
    timer: T,
    pwm: P,
}

/// State shared between the control flow and the step-pulse ISR
///
/// Lives in a `static`; `init` hands over the hardware once at boot.
pub struct SharedMotion<T: StepTimer, P: LaserPwm> {
    inner: Mutex<RefCell<Option<Inner<T, P>>>>,
    running: AtomicBool,
}

impl<T: StepTimer, P: LaserPwm> SharedMotion<T, P> {
    /// Create the (not yet initialized) shared state
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
            running: AtomicBool::new(false),
        }
    }

    /// Install the step timer, the ISR's PWM duty handle, and the
    /// acceleration table. Must happen before the interrupt is enabled.
    pub fn init(&self, timer: T, pwm: P, table: AccelTable<'static>) {
        critical_section::with(|cs| {
            *self.inner.borrow_ref_mut(cs) = Some(Inner {
                engine: StepEngine::new(),
                line: ScanlineBuffer::new(),
                table,
                timer,
                pwm,
            });
        });
    }

    /// True while a move is in progress
    pub fn running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Pulse-end interrupt entry
    ///
    /// Ends the step, advances the engine, and applies the returned effect
    /// to the hardware. On the completing step it stops the timer and
    /// clears the running flag; no further register writes occur.
    pub fn on_pulse_end(&self) {
        critical_section::with(|cs| {
            let mut borrow = self.inner.borrow_ref_mut(cs);
            let Some(inner) = borrow.as_mut() else {
                return;
            };
            let Inner {
                engine,
                line,
                table,
                timer,
                pwm,
            } = inner;
            match engine.pulse_end(table, line) {
                StepOutcome::Complete => {
                    timer.stop();
                    self.running.store(false, Ordering::Release);
                }
                StepOutcome::Continue(StepEffect::Delay(d)) => timer.program_next(d),
                StepOutcome::Continue(StepEffect::LaserDuty(d)) => pwm.set_duty(d),
                StepOutcome::Continue(StepEffect::None) => {}
            }
        });
    }
}

/// Foreground driver: the engine backend over real hardware
///
/// Owns the direction pins and the laser sequencer outright (they are
/// foreground-only); shares the step timer, the PWM duty register, and the
/// scanline buffer with the ISR through [`SharedMotion`].
pub struct EngraveDriver<'a, T, P, L, G, SD, FD>
where
    T: StepTimer,
    P: LaserPwm,
    L: LaserPwm,
    G: OutputPin,
    SD: OutputPin,
    FD: OutputPin,
{
    motion: &'a SharedMotion<T, P>,
    laser: RasterLaser<L, G>,
    scan_dir: SD,
    feed_dir: FD,
}

impl<'a, T, P, L, G, SD, FD> EngraveDriver<'a, T, P, L, G, SD, FD>
where
    T: StepTimer,
    P: LaserPwm,
    L: LaserPwm,
    G: OutputPin,
    SD: OutputPin,
    FD: OutputPin,
{
    /// Assemble the driver
    pub fn new(
        motion: &'a SharedMotion<T, P>,
        laser: RasterLaser<L, G>,
        scan_dir: SD,
        feed_dir: FD,
    ) -> Self {
        Self {
            motion,
            laser,
            scan_dir,
            feed_dir,
        }
    }
}

impl<T, P, L, G, SD, FD> EngraveBackend for EngraveDriver<'_, T, P, L, G, SD, FD>
where
    T: StepTimer,
    P: LaserPwm,
    L: LaserPwm,
    G: OutputPin,
    SD: OutputPin,
    FD: OutputPin,
{
    fn set_direction(&mut self, axis: Axis, direction: Direction) {
        debug_assert!(!self.motion.running());
        let high = direction == Direction::Forward;
        match axis {
            Axis::Scan => self.scan_dir.set_state(high),
            Axis::Feed => self.feed_dir.set_state(high),
        }
    }

    fn run_move(&mut self, axis: Axis, cmd: MoveCommand, initial_delay: u16) {
        debug_assert!(!self.motion.running(), "moves must never overlap");
        critical_section::with(|cs| {
            let mut borrow = self.motion.inner.borrow_ref_mut(cs);
            let Some(inner) = borrow.as_mut() else {
                debug_assert!(false, "move before init");
                return;
            };
            inner.engine.arm(cmd);
            // The flag is set atomically with starting the timer: both
            // happen inside this critical section.
            self.motion.running.store(true, Ordering::Release);
            inner.timer.start(step_axis(axis), initial_delay);
        });
        while self.motion.running() {
            core::hint::spin_loop();
        }
    }

    fn load_line(&mut self, pixels: &[u8]) -> Result<(), CapacityError> {
        debug_assert!(!self.motion.running());
        critical_section::with(|cs| match self.motion.inner.borrow_ref_mut(cs).as_mut() {
            Some(inner) => inner.line.load(pixels),
            None => Err(CapacityError),
        })
    }

    fn laser_on(&mut self, first_duty: u8) {
        self.laser.arm(first_duty);
    }

    fn laser_off(&mut self) {
        self.laser.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyrograph_core::ramp;
    use std::boxed::Box;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::thread;
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum HwOp {
        Start(StepAxis, u16),
        Program(u16),
        Stop,
        Duty(u8),
    }

    type Log = Arc<StdMutex<Vec<HwOp>>>;

    struct MockTimer(Log);
    impl StepTimer for MockTimer {
        fn start(&mut self, axis: StepAxis, initial_delay: u16) {
            self.0.lock().unwrap().push(HwOp::Start(axis, initial_delay));
        }
        fn program_next(&mut self, delay: u16) {
            self.0.lock().unwrap().push(HwOp::Program(delay));
        }
        fn stop(&mut self) {
            self.0.lock().unwrap().push(HwOp::Stop);
        }
    }

    struct MockPwm(Log);
    impl LaserPwm for MockPwm {
        fn set_duty(&mut self, duty: u8) {
            self.0.lock().unwrap().push(HwOp::Duty(duty));
        }
        fn connect(&mut self) {}
        fn disconnect(&mut self) {}
        fn start(&mut self) {}
        fn stop(&mut self) {}
    }

    struct MockPin;
    impl OutputPin for MockPin {
        fn set_high(&mut self) {}
        fn set_low(&mut self) {}
    }

    static DELAYS: [u16; 6] = [200, 140, 120, 100, 90, 80];

    fn leak_shared(log: &Log) -> &'static SharedMotion<MockTimer, MockPwm> {
        let shared: &'static SharedMotion<MockTimer, MockPwm> =
            Box::leak(Box::new(SharedMotion::new()));
        shared.init(
            MockTimer(log.clone()),
            MockPwm(log.clone()),
            AccelTable::new(&DELAYS),
        );
        shared
    }

    /// Pump synthetic pulse-end events from this thread while the driver
    /// thread blocks in `run_move`; returns the number of events (= steps).
    fn pump_until_finished(
        shared: &SharedMotion<MockTimer, MockPwm>,
        handle: thread::JoinHandle<()>,
    ) -> u32 {
        let mut events = 0u32;
        loop {
            if shared.running() {
                shared.on_pulse_end();
                events += 1;
            } else if handle.is_finished() {
                handle.join().unwrap();
                return events;
            } else {
                thread::yield_now();
            }
        }
    }

    #[test]
    fn test_flag_is_set_for_exactly_the_move_duration() {
        let log: Log = Arc::new(StdMutex::new(Vec::new()));
        let shared = leak_shared(&log);

        assert!(!shared.running(), "flag must be clear before arming");

        let handle = thread::spawn(move || {
            let laser = RasterLaser::new(MockPwm(Arc::new(StdMutex::new(Vec::new()))), MockPin);
            let mut driver = EngraveDriver::new(shared, laser, MockPin, MockPin);
            driver.run_move(Axis::Scan, MoveCommand::constant(25), 100);
        });

        let events = pump_until_finished(shared, handle);
        assert_eq!(events, 25);
        assert!(!shared.running(), "flag must be clear after completion");

        // Arm and stop bracket the move
        let ops = log.lock().unwrap();
        assert_eq!(ops.first(), Some(&HwOp::Start(StepAxis::Scan, 100)));
        assert_eq!(ops.last(), Some(&HwOp::Stop));
    }

    #[test]
    fn test_ramp_through_real_stack_counts_pad_plus_one() {
        let log: Log = Arc::new(StdMutex::new(Vec::new()));
        let shared = leak_shared(&log);

        let handle = thread::spawn(move || {
            let laser = RasterLaser::new(MockPwm(Arc::new(StdMutex::new(Vec::new()))), MockPin);
            let mut driver = EngraveDriver::new(shared, laser, MockPin, MockPin);
            let table = AccelTable::new(&DELAYS);
            // k = 4 for rate 100: 5 ramp steps, then 16 flat
            ramp::accelerate(&mut driver, Axis::Scan, &table, 100, 20);
        });

        let events = pump_until_finished(shared, handle);
        assert_eq!(events, 21);

        // The ISR reprogrammed the table prefix during the ramp move
        let ops = log.lock().unwrap();
        let programmed: Vec<u16> = ops
            .iter()
            .filter_map(|op| match op {
                HwOp::Program(d) => Some(*d),
                _ => None,
            })
            .collect();
        assert_eq!(programmed, [140, 120, 100, 90]);
    }

    #[test]
    fn test_raster_move_rewrites_duty_per_step() {
        let log: Log = Arc::new(StdMutex::new(Vec::new()));
        let shared = leak_shared(&log);

        let handle = thread::spawn(move || {
            // The laser sequencer aliases the same PWM the ISR writes
            let laser = RasterLaser::new(MockPwm(log_for_laser(shared)), MockPin);
            let mut driver = EngraveDriver::new(shared, laser, MockPin, MockPin);
            driver.load_line(&[7, 8, 9]).unwrap();
            driver.laser_on(9);
            driver.run_move(Axis::Scan, MoveCommand::raster(3, Direction::Reverse, 0), 100);
            driver.laser_off();
        });

        let events = pump_until_finished(shared, handle);
        assert_eq!(events, 3);

        let duties: Vec<u8> = log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                HwOp::Duty(d) => Some(*d),
                _ => None,
            })
            .collect();
        // Preload of the last pixel, then the ISR mirroring down
        assert_eq!(duties, [9, 8, 7]);
    }

    // The ISR-side PWM handle and the sequencer handle alias the same
    // peripheral; in tests they share the same log.
    fn log_for_laser(shared: &SharedMotion<MockTimer, MockPwm>) -> Log {
        critical_section::with(|cs| {
            let borrow = shared.inner.borrow_ref(cs);
            borrow.as_ref().map(|inner| inner.pwm.0.clone()).unwrap()
        })
    }
}
