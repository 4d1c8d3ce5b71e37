//! Serial link abstractions
//!
//! The communications task runs inside a scheduler round, so reads are
//! non-blocking: a receiver hands over whatever bytes have already arrived.

/// Errors reported by a serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Transmit queue cannot take the whole message
    TxFull,
    /// Receiver reported framing/parity/overrun trouble
    Hardware,
}

/// UART transmitter
pub trait UartTx {
    /// Queue data for transmission
    ///
    /// Must not wait for the bytes to leave the wire.
    fn write(&mut self, data: &[u8]) -> Result<(), LinkError>;
}

/// UART receiver
pub trait UartRx {
    /// Copy already-received bytes into `buf`
    ///
    /// Returns the number of bytes copied, `0` when nothing is pending.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// Read a single pending byte, if any
    fn read_byte(&mut self) -> Result<Option<u8>, LinkError> {
        let mut buf = [0u8; 1];
        let n = self.read_available(&mut buf)?;
        Ok(if n == 1 { Some(buf[0]) } else { None })
    }
}

/// Combined UART interface
///
/// For links that provide both TX and RX on a single peripheral.
pub trait Uart: UartTx + UartRx {}

// Blanket implementation
impl<T: UartTx + UartRx> Uart for T {}
