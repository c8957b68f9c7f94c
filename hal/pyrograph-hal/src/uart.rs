//! UART serial communication abstractions
//!
//! The command link is a plain byte stream. Reads are bounded: every byte
//! inside a framed message must arrive within a timeout, or the in-progress
//! parse is abandoned.

/// A byte read did not complete within the allowed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadTimeout;

/// UART transmitter
pub trait UartTx {
    /// Write data to the UART, blocking until all bytes are queued.
    fn write_blocking(&mut self, data: &[u8]);
}

/// UART receiver
pub trait UartRx {
    /// Read a single byte, waiting at most `timeout_ms` milliseconds.
    fn read_byte(&mut self, timeout_ms: u32) -> Result<u8, ReadTimeout>;
}

/// UART configuration
///
/// The link parameters are fixed; there is no runtime baud negotiation.
#[derive(Debug, Clone, Copy)]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits
    pub data_bits: u8,
    /// Parity enabled
    pub parity: bool,
    /// Number of stop bits
    pub stop_bits: u8,
}

impl Default for UartConfig {
    fn default() -> Self {
        // 57600 8N1, no flow control
        Self {
            baudrate: 57_600,
            data_bits: 8,
            parity: false,
            stop_bits: 1,
        }
    }
}
