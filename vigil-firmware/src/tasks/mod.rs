//! Embassy async tasks
//!
//! The monitor task runs the cooperative scheduler; the others translate
//! hardware events into the shared state it reads.

pub mod button;
pub mod edge;
pub mod monitor;
pub mod tick;
pub mod uart_rx;
pub mod uart_tx;

pub use button::button_task;
pub use edge::edge_task;
pub use monitor::{monitor_task, BoardMonitor};
pub use tick::tick_task;
pub use uart_rx::uart_rx_task;
pub use uart_tx::uart_tx_task;
