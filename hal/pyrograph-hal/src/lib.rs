//! Peripheral abstraction traits for the Pyrograph engraver firmware
//!
//! These traits describe the handful of peripherals the engraving engine
//! touches, so that the engine and drivers stay board-agnostic:
//!
//! - Step-pulse timer (two compare channels: pulse start and pulse end)
//! - Laser PWM channel (duty register plus output override)
//! - UART with bounded-timeout byte reads
//! - Digital output pins (direction, laser gate)

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod pwm;
pub mod timer;
pub mod uart;

pub use gpio::OutputPin;
pub use pwm::LaserPwm;
pub use timer::{StepAxis, StepTimer};
pub use uart::{ReadTimeout, UartConfig, UartRx, UartTx};
