//! Measurement pipeline
//!
//! Edge-triggered signals (pulse, respiration) are counted in interrupt
//! context and converted to rates by periodic tasks. Temperature and EKG
//! amplitude are polled. Blood pressure comes from the cuff state machine.
//! Every acquired value is published into a per-signal ring buffer that the
//! correction engine drains.

pub mod buffer;
pub mod edge;
pub mod pipeline;
pub mod pressure;
pub mod signals;

pub use buffer::{MeasurementBuffers, RingBuffer, MEASURE_BUF_LEN};
pub use edge::{EdgeCounter, Edges, MeasureFlags};
pub use pipeline::{edge_rate, read_ekg_block, read_temperature, MeasureTimers};
pub use pressure::{CuffOutcome, CuffPhase, PressureCycle};
pub use signals::{MeasurementSelect, Signal};
