//! Engraver Serial Command Protocol
//!
//! This crate defines the ASCII-framed protocol spoken between the engraver
//! and the host sender over a 57600 8N1 serial link.
//!
//! # Protocol Overview
//!
//! Every message begins with the `#` sentinel; the next byte selects the
//! command. Numeric arguments are ASCII decimal, at most five digits,
//! terminated by `;`:
//!
//! ```text
//! host → device   ##          handshake
//! host → device   #P1000;     set scanline width (pixels)
//! host → device   #Y100;      set image height (lines)
//! host → device   #!          start job
//! device → host   #Y / #N     command accepted / rejected
//! device → host   #D          ready for the next scanline, followed by
//!                             exactly `width` raw intensity bytes
//! device → host   #?          unknown or malformed command
//! ```
//!
//! Scanline payload bytes are raw and unframed; the device never inspects
//! them for sentinels. The link parameters are fixed (no negotiation).

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod wire;

pub use command::{Command, CommandParser, ParseError};
pub use wire::{Reply, DELIMITER, MAX_ARG_DIGITS, SENTINEL};
