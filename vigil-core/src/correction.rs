//! Correction engine
//!
//! Drains every signal's unprocessed window through the calibration
//! transform. Runs on its own period; between runs the measurement tasks
//! keep publishing raw samples.

use crate::config::Calibrate;
use crate::measure::{MeasurementBuffers, Signal};

/// Correct all pending raw samples, returning the number of slots written
pub fn compute<C: Calibrate + ?Sized>(buffers: &mut MeasurementBuffers, calibration: &C) -> usize {
    let mut written = 0;
    for signal in Signal::ALL {
        written += buffers
            .get_mut(signal)
            .correct_pending(|raw| calibration.correct(signal, raw));
    }
    if written > 0 {
        trace!("corrected {} samples", written);
    }
    written
}
