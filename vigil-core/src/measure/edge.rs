//! State shared with interrupt handlers
//!
//! Edge handlers only increment a counter; the consuming task reads and
//! resets it with a single atomic swap, so no edge is lost or counted
//! twice. On Cortex-M0+ the atomics are emulated with critical sections.

use portable_atomic::{AtomicU32, AtomicU8, Ordering};

/// Single-producer single-consumer edge counter
#[derive(Debug, Default)]
pub struct EdgeCounter {
    count: AtomicU32,
}

impl EdgeCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Called from the edge handler
    #[inline]
    pub fn record_edge(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and reset the count
    pub fn take(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }

    pub fn peek(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Edge counters for the interrupt-driven signals
#[derive(Debug, Default)]
pub struct Edges {
    pub pulse: EdgeCounter,
    pub respiration: EdgeCounter,
}

impl Edges {
    pub const fn new() -> Self {
        Self {
            pulse: EdgeCounter::new(),
            respiration: EdgeCounter::new(),
        }
    }
}

/// Measurement progress flags
#[derive(Debug, Default)]
pub struct MeasureFlags {
    bits: AtomicU8,
}

impl MeasureFlags {
    /// Systolic reading latched in the current cuff cycle
    pub const SYST_READY: u8 = 1 << 0;
    /// Diastolic reading latched in the current cuff cycle
    pub const DIAS_READY: u8 = 1 << 1;
    /// EKG acquisition armed
    pub const EKG_MEASURE: u8 = 1 << 2;
    /// EKG analysis window full
    pub const EKG_READY: u8 = 1 << 3;

    pub const fn new(bits: u8) -> Self {
        Self {
            bits: AtomicU8::new(bits),
        }
    }

    pub fn set(&self, mask: u8) {
        self.bits.fetch_or(mask, Ordering::AcqRel);
    }

    pub fn clear(&self, mask: u8) {
        self.bits.fetch_and(!mask, Ordering::AcqRel);
    }

    /// True if every bit of `mask` is set
    pub fn contains(&self, mask: u8) -> bool {
        self.bits.load(Ordering::Acquire) & mask == mask
    }

    pub fn bits(&self) -> u8 {
        self.bits.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_resets_count() {
        let counter = EdgeCounter::new();
        for _ in 0..5 {
            counter.record_edge();
        }
        assert_eq!(counter.peek(), 5);
        assert_eq!(counter.take(), 5);
        assert_eq!(counter.take(), 0);
    }

    #[test]
    fn test_edges_across_threads_are_counted_once() {
        use std::sync::Arc;
        use std::thread;

        let counter = Arc::new(EdgeCounter::new());
        let producer = {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    counter.record_edge();
                }
            })
        };

        let mut total = 0;
        while !producer.is_finished() {
            total += counter.take();
        }
        producer.join().unwrap();
        total += counter.take();
        assert_eq!(total, 10_000);
    }

    #[test]
    fn test_flags_set_and_clear() {
        let flags = MeasureFlags::new(0);
        flags.set(MeasureFlags::SYST_READY | MeasureFlags::EKG_MEASURE);
        assert!(flags.contains(MeasureFlags::SYST_READY));
        assert!(!flags.contains(MeasureFlags::SYST_READY | MeasureFlags::DIAS_READY));

        flags.clear(MeasureFlags::SYST_READY);
        assert_eq!(flags.bits(), MeasureFlags::EKG_MEASURE);
    }
}
