//! Hard faults
//!
//! A fault means a resource invariant broke: the scheduler latches it and
//! stops running tasks, and the firmware resets the controller.

use crate::measure::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// A raw write would have overwritten samples not yet corrected
    MeasurementOverrun(Signal),
    /// An EKG block arrived while a full window was still unconsumed
    EkgOverrun,
    /// Task id outside the arena or never registered
    UnknownTask(u8),
}
