//! RP2040 board support
//!
//! Pin map (slice = `(gpio >> 1) & 7` on RP2040):
//!
//! | GPIO | Function                         |
//! |------|----------------------------------|
//! | 0/1  | UART0 TX/RX, host link 57600 8N1 |
//! | 2    | scan step (PWM slice 1, ch A)    |
//! | 4    | feed step (PWM slice 2, ch A)    |
//! | 6    | laser (PWM slice 3, ch A)        |
//! | 10   | scan direction                   |
//! | 11   | feed direction                   |
//! | 25   | status LED                       |
//!
//! The step generator runs a PWM slice per axis at the 2 MHz engine tick:
//! channel A shapes the pulse in hardware (high while the counter is below
//! the pulse width), TOP is the inter-step delay, and the wrap interrupt is
//! the pulse-end event that advances the move. The laser slice is an 8-bit
//! duty channel at roughly 20 kHz whose compare register the ISR rewrites
//! during raster moves.

use embassy_rp::interrupt;
use embassy_rp::pac;
use embassy_time::{Duration, Instant};

use pyrograph_core::motion::PULSE_WIDTH_TICKS;
use pyrograph_hal::{
    LaserPwm, OutputPin, ReadTimeout, StepAxis, StepTimer, UartConfig, UartRx, UartTx,
};

const SCAN_SLICE: usize = 1;
const FEED_SLICE: usize = 2;
const LASER_SLICE: usize = 3;

const SCAN_STEP_GPIO: usize = 2;
const FEED_STEP_GPIO: usize = 4;
const LASER_GPIO: usize = 6;
const SCAN_DIR_GPIO: usize = 10;
const FEED_DIR_GPIO: usize = 11;
const LED_GPIO: usize = 25;

// 125 MHz system clock divided to the 2 MHz engine tick: 62.5
const STEP_DIV_INT: u8 = 62;
const STEP_DIV_FRAC: u8 = 8;

// Laser carrier: 125 MHz / (256 * 24) ≈ 20.3 kHz at 8-bit duty
const LASER_DIV_INT: u8 = 24;
const LASER_TOP: u16 = 255;

const SYS_CLK_HZ: u64 = 125_000_000;

const FUNCSEL_UART: u8 = 2;
const FUNCSEL_PWM: u8 = 4;
const FUNCSEL_SIO: u8 = 5;

fn set_funcsel(gpio: usize, funcsel: u8) {
    pac::IO_BANK0
        .gpio(gpio)
        .ctrl()
        .write(|w| w.set_funcsel(funcsel));
}

fn sio_output(gpio: usize, high: bool) {
    let mask = 1u32 << gpio;
    if high {
        pac::SIO.gpio_out(0).value_set().write_value(mask);
    } else {
        pac::SIO.gpio_out(0).value_clr().write_value(mask);
    }
    pac::SIO.gpio_oe(0).value_set().write_value(mask);
}

/// One-time pin, UART, and PWM setup. Called before any driver is built.
pub fn init(_p: embassy_rp::Peripherals) {
    // Direction pins, LED, and the (disconnected) laser gate are plain
    // SIO outputs, all low
    for gpio in [SCAN_DIR_GPIO, FEED_DIR_GPIO, LED_GPIO, LASER_GPIO] {
        sio_output(gpio, false);
        set_funcsel(gpio, FUNCSEL_SIO);
    }
    // Step pins belong to their PWM slices
    set_funcsel(SCAN_STEP_GPIO, FUNCSEL_PWM);
    set_funcsel(FEED_STEP_GPIO, FUNCSEL_PWM);

    // Step slices: engine tick rate, hardware-shaped pulse width
    for slice in [SCAN_SLICE, FEED_SLICE] {
        let ch = pac::PWM.ch(slice);
        ch.div().write(|w| {
            w.set_int(STEP_DIV_INT);
            w.set_frac(STEP_DIV_FRAC);
        });
        ch.cc().write(|w| w.set_a(PULSE_WIDTH_TICKS));
    }

    // Laser slice: free-running 8-bit duty carrier, duty 0
    let laser = pac::PWM.ch(LASER_SLICE);
    laser.div().write(|w| w.set_int(LASER_DIV_INT));
    laser.top().write(|w| w.set_top(LASER_TOP));
    laser.cc().write(|w| w.set_a(0));

    // UART0: the fixed host link parameters (57600 8N1), FIFOs on.
    // The 6-bit fractional baud divisor comes out at 135 + 41/64.
    let cfg = UartConfig::default();
    let divisor = (SYS_CLK_HZ * 64) / (16 * u64::from(cfg.baudrate));
    set_funcsel(0, FUNCSEL_UART);
    set_funcsel(1, FUNCSEL_UART);
    let uart = pac::UART0;
    uart.uartibrd().write(|w| w.set_baud_divint((divisor >> 6) as u16));
    uart.uartfbrd().write(|w| w.set_baud_divfrac((divisor & 0x3f) as u8));
    uart.uartlcr_h().write(|w| {
        w.set_wlen(cfg.data_bits - 5);
        w.set_pen(cfg.parity);
        w.set_stp2(cfg.stop_bits == 2);
        w.set_fen(true);
    });
    uart.uartcr().write(|w| {
        w.set_uarten(true);
        w.set_txe(true);
        w.set_rxe(true);
    });
}

/// Unmask the PWM wrap interrupt after [`crate::MOTION`] is initialized
pub fn enable_step_interrupt() {
    pac::PWM.intr().write(|w| w.0 = 0xff);
    // SAFETY: the shared motion state is initialized before this runs
    unsafe { cortex_m::peripheral::NVIC::unmask(pac::Interrupt::PWM_IRQ_WRAP) };
}

/// Pulse-end interrupt: both step slices funnel into the engine
#[interrupt]
fn PWM_IRQ_WRAP() {
    let pending = pac::PWM.ints().read().0;
    let step_mask = (1 << SCAN_SLICE) | (1 << FEED_SLICE);
    if pending & step_mask != 0 {
        pac::PWM.intr().write(|w| w.0 = pending & step_mask);
        crate::MOTION.on_pulse_end();
    }
}

/// Step-pulse generator over the two axis slices
pub struct StepSlices {
    active: usize,
}

impl StepSlices {
    pub const fn new() -> Self {
        Self { active: SCAN_SLICE }
    }
}

impl StepTimer for StepSlices {
    fn start(&mut self, axis: StepAxis, initial_delay: u16) {
        self.active = match axis {
            StepAxis::Scan => SCAN_SLICE,
            StepAxis::Feed => FEED_SLICE,
        };
        let ch = pac::PWM.ch(self.active);
        ch.top().write(|w| w.set_top(initial_delay - 1));
        ch.ctr().write(|w| w.set_ctr(0));
        pac::PWM.inte().modify(|w| w.0 |= 1 << self.active);
        ch.csr().modify(|w| w.set_en(true));
    }

    fn program_next(&mut self, delay: u16) {
        pac::PWM.ch(self.active).top().write(|w| w.set_top(delay - 1));
    }

    fn stop(&mut self) {
        let ch = pac::PWM.ch(self.active);
        ch.csr().modify(|w| w.set_en(false));
        pac::PWM.inte().modify(|w| w.0 &= !(1 << self.active));
    }
}

/// Laser PWM handle; the ISR and the foreground sequencer each hold one.
/// Every operation is a single register access.
#[derive(Clone, Copy)]
pub struct LaserSlice;

impl LaserPwm for LaserSlice {
    fn set_duty(&mut self, duty: u8) {
        pac::PWM.ch(LASER_SLICE).cc().modify(|w| w.set_a(duty as u16));
    }

    fn connect(&mut self) {
        set_funcsel(LASER_GPIO, FUNCSEL_PWM);
    }

    fn disconnect(&mut self) {
        set_funcsel(LASER_GPIO, FUNCSEL_SIO);
    }

    fn start(&mut self) {
        let ch = pac::PWM.ch(LASER_SLICE);
        ch.ctr().write(|w| w.set_ctr(0));
        ch.csr().modify(|w| w.set_en(true));
    }

    fn stop(&mut self) {
        pac::PWM.ch(LASER_SLICE).csr().modify(|w| w.set_en(false));
    }
}

/// SIO output pin wrapper
pub struct SioPin<const GPIO: usize>;

impl<const GPIO: usize> OutputPin for SioPin<GPIO> {
    fn set_high(&mut self) {
        pac::SIO.gpio_out(0).value_set().write_value(1 << GPIO);
    }

    fn set_low(&mut self) {
        pac::SIO.gpio_out(0).value_clr().write_value(1 << GPIO);
    }
}

/// Laser gate: holds the pin low whenever the PWM override is disconnected
pub type LaserGate = SioPin<LASER_GPIO>;
/// Scan-axis direction pin
pub type ScanDir = SioPin<SCAN_DIR_GPIO>;
/// Feed-axis direction pin
pub type FeedDir = SioPin<FEED_DIR_GPIO>;
/// Status LED
pub type StatusLed = SioPin<LED_GPIO>;

/// Host link receive half
pub struct HostUartRx;

impl UartRx for HostUartRx {
    fn read_byte(&mut self, timeout_ms: u32) -> Result<u8, ReadTimeout> {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        while pac::UART0.uartfr().read().rxfe() {
            if Instant::now() > deadline {
                return Err(ReadTimeout);
            }
        }
        Ok(pac::UART0.uartdr().read().data())
    }
}

/// Host link transmit half
pub struct HostUartTx;

impl UartTx for HostUartTx {
    fn write_blocking(&mut self, data: &[u8]) {
        for &byte in data {
            while pac::UART0.uartfr().read().txff() {}
            pac::UART0.uartdr().write(|w| w.set_data(byte));
        }
    }
}
