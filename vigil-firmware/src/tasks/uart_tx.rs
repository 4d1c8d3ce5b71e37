//! Host UART transmit task
//!
//! Drains encoded responses from the TX pipe onto the wire.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use crate::channels::TX_PIPE;

/// Buffer size for UART transmit
const TX_BUF_SIZE: usize = 64;

/// UART TX task
#[embassy_executor::task]
pub async fn uart_tx_task(mut tx: BufferedUartTx) {
    info!("UART TX task started");

    let mut buf = [0u8; TX_BUF_SIZE];

    loop {
        let n = TX_PIPE.read(&mut buf).await;
        if let Err(e) = tx.write_all(&buf[..n]).await {
            warn!("UART write error: {:?}", e);
        }
    }
}
