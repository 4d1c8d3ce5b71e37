//! Host UART receive task
//!
//! Moves received bytes into the RX pipe for the comms task to parse.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use crate::channels::RX_PIPE;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// UART RX task
#[embassy_executor::task]
pub async fn uart_rx_task(mut rx: BufferedUartRx) {
    info!("UART RX task started");

    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);
                // Waits for the comms task when the pipe is full
                RX_PIPE.write_all(&buf[..n]).await;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
