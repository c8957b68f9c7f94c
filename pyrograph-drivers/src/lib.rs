//! Driver glue for the Pyrograph engraver
//!
//! Board-agnostic implementations of the engine's backend traits over the
//! HAL peripheral traits:
//!
//! - [`motion::SharedMotion`] — the state shared between the foreground
//!   control flow and the step-pulse interrupt, with the busy-wait move
//!   executor
//! - [`laser::RasterLaser`] — laser PWM sequencing that can never latch a
//!   stale intensity
//! - [`serial::CommandUart`] — UART adapter for the command link

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod laser;
pub mod motion;
pub mod serial;

pub use laser::RasterLaser;
pub use motion::{EngraveDriver, SharedMotion};
pub use serial::CommandUart;
