//! UART adapter for the command link

use pyrograph_core::traits::{CommandPort, ReadTimeout};
use pyrograph_hal::{UartRx, UartTx};

/// Command link over a pair of HAL UART halves
pub struct CommandUart<R: UartRx, T: UartTx> {
    rx: R,
    tx: T,
}

impl<R: UartRx, T: UartTx> CommandUart<R, T> {
    /// Wrap the UART halves
    pub fn new(rx: R, tx: T) -> Self {
        Self { rx, tx }
    }
}

impl<R: UartRx, T: UartTx> CommandPort for CommandUart<R, T> {
    fn read_byte(&mut self, timeout_ms: u32) -> Result<u8, ReadTimeout> {
        self.rx.read_byte(timeout_ms).map_err(|_| ReadTimeout)
    }

    fn send(&mut self, bytes: &[u8]) {
        self.tx.write_blocking(bytes);
    }
}
