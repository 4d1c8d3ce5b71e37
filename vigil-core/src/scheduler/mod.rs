//! Cooperative round scheduler
//!
//! Tasks live in a fixed arena addressed by id. The run queue links arena
//! slots by index, and insert/remove requests made during a round are
//! buffered and applied at the start of the next one.

pub mod executor;
pub mod queue;

pub use executor::{Round, Scheduler, Task, MAX_TASKS};
pub use queue::TaskQueue;
