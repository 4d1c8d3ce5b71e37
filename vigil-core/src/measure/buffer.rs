//! Raw and corrected measurement ring buffers
//!
//! Each signal owns a ring of raw samples and a ring of corrected values
//! sharing one index space. Writers publish by advancing
//! `next_measure_index` (the most recently written slot); the correction
//! engine advances `last_compute_index` (the most recently corrected
//! slot). Slots in `(last_compute_index, next_measure_index]` are
//! waiting for correction.

use super::signals::Signal;
use crate::fault::Fault;

/// Slots per ring
pub const MEASURE_BUF_LEN: usize = 8;

/// Ring buffer pair for one signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingBuffer<const N: usize = MEASURE_BUF_LEN> {
    raw: [u32; N],
    corrected: [u32; N],
    next_measure_index: usize,
    last_compute_index: usize,
    published: bool,
    computed: bool,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The write would overwrite a slot that has not been corrected yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overrun;

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            raw: [0; N],
            corrected: [0; N],
            next_measure_index: 0,
            last_compute_index: 0,
            published: false,
            computed: false,
        }
    }

    pub fn next_measure_index(&self) -> usize {
        self.next_measure_index
    }

    pub fn last_compute_index(&self) -> usize {
        self.last_compute_index
    }

    /// Number of slots waiting for correction
    pub fn pending(&self) -> usize {
        (self.next_measure_index + N - self.last_compute_index) % N
    }

    /// Write a raw sample into the next slot and publish it
    pub fn publish(&mut self, value: u32) -> Result<(), Overrun> {
        let next = (self.next_measure_index + 1) % N;
        if next == self.last_compute_index {
            return Err(Overrun);
        }
        self.raw[next] = value;
        self.next_measure_index = next;
        self.published = true;
        Ok(())
    }

    /// Most recently published raw sample
    pub fn latest_raw(&self) -> Option<u32> {
        self.published.then(|| self.raw[self.next_measure_index])
    }

    /// Most recently corrected value
    pub fn latest_corrected(&self) -> Option<u32> {
        self.computed.then(|| self.corrected[self.last_compute_index])
    }

    pub fn raw_at(&self, index: usize) -> u32 {
        self.raw[index % N]
    }

    pub fn corrected_at(&self, index: usize) -> u32 {
        self.corrected[index % N]
    }

    /// Correct every pending slot with `f`, returning how many were written
    ///
    /// Leaves `last_compute_index == next_measure_index`.
    pub fn correct_pending<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(u32) -> u32,
    {
        let mut count = 0;
        while self.last_compute_index != self.next_measure_index {
            let index = (self.last_compute_index + 1) % N;
            self.corrected[index] = f(self.raw[index]);
            self.last_compute_index = index;
            count += 1;
        }
        if count > 0 {
            self.computed = true;
        }
        count
    }
}

/// One ring buffer pair per signal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementBuffers {
    rings: [RingBuffer; Signal::COUNT],
}

impl MeasurementBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signal: Signal) -> &RingBuffer {
        &self.rings[signal.index()]
    }

    pub fn get_mut(&mut self, signal: Signal) -> &mut RingBuffer {
        &mut self.rings[signal.index()]
    }

    /// Publish a raw sample
    ///
    /// Overwriting an uncorrected slot is a hard fault.
    pub fn publish(&mut self, signal: Signal, value: u32) -> Result<(), Fault> {
        self.get_mut(signal)
            .publish(value)
            .map_err(|Overrun| Fault::MeasurementOverrun(signal))
    }

    pub fn latest_corrected(&self, signal: Signal) -> Option<u32> {
        self.get(signal).latest_corrected()
    }

    pub fn latest_raw(&self, signal: Signal) -> Option<u32> {
        self.get(signal).latest_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_advances_next_index() {
        let mut ring = RingBuffer::<8>::new();
        assert_eq!(ring.latest_raw(), None);
        ring.publish(42).unwrap();
        assert_eq!(ring.next_measure_index(), 1);
        assert_eq!(ring.latest_raw(), Some(42));
        assert_eq!(ring.pending(), 1);
    }

    #[test]
    fn test_overrun_before_correction() {
        let mut ring = RingBuffer::<8>::new();
        for v in 0..7 {
            ring.publish(v).unwrap();
        }
        // The eighth write would land on the last corrected slot
        assert_eq!(ring.publish(7), Err(Overrun));
        assert_eq!(ring.latest_raw(), Some(6));

        ring.correct_pending(|v| v);
        ring.publish(7).unwrap();
    }

    #[test]
    fn test_correct_wraps_from_last_to_next() {
        let mut ring = RingBuffer::<8>::new();
        ring.raw = [80, 0, 0, 0, 0, 0, 0, 80];
        ring.raw[1] = 80;
        ring.last_compute_index = 6;
        ring.next_measure_index = 1;

        let written = ring.correct_pending(|raw| 9 + 2 * raw);
        assert_eq!(written, 3);
        assert_eq!(ring.corrected_at(7), 169);
        assert_eq!(ring.corrected_at(0), 169);
        assert_eq!(ring.corrected_at(1), 169);
        // Slot 6 was already processed and is left alone
        assert_eq!(ring.corrected_at(6), 0);
        assert_eq!(ring.last_compute_index(), ring.next_measure_index());
    }

    #[test]
    fn test_correct_is_idempotent_without_new_samples() {
        let mut ring = RingBuffer::<8>::new();
        ring.publish(10).unwrap();
        assert_eq!(ring.correct_pending(|v| v * 2), 1);
        assert_eq!(ring.correct_pending(|_| unreachable!()), 0);
        assert_eq!(ring.latest_corrected(), Some(20));
    }

    #[test]
    fn test_buffers_fault_names_signal() {
        let mut buffers = MeasurementBuffers::new();
        for v in 0..7 {
            buffers.publish(Signal::Pulse, v).unwrap();
        }
        assert_eq!(
            buffers.publish(Signal::Pulse, 99),
            Err(Fault::MeasurementOverrun(Signal::Pulse))
        );
        // Other signals are independent
        buffers.publish(Signal::Temperature, 1).unwrap();
    }
}
