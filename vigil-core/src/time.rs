//! Scheduler timebase
//!
//! One tick is one scheduler round. The counter wraps at `u32::MAX`; all
//! interval arithmetic goes through [`elapsed`], which uses wrapping
//! subtraction and is therefore correct for intervals below 2^31 ticks.

/// Scheduler rounds since boot
pub type Tick = u32;

/// Ticks from `then` to `now`
#[inline]
pub fn elapsed(now: Tick, then: Tick) -> Tick {
    now.wrapping_sub(then)
}

/// Fires once every `period` ticks
///
/// The first firing happens once `period` ticks have passed since tick 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Periodic {
    period: Tick,
    last: Tick,
}

impl Periodic {
    pub const fn new(period: Tick) -> Self {
        Self { period, last: 0 }
    }

    pub fn period(&self) -> Tick {
        self.period
    }

    /// Returns true (and restarts the interval) if the period has elapsed
    pub fn due(&mut self, now: Tick) -> bool {
        if elapsed(now, self.last) >= self.period {
            self.last = now;
            true
        } else {
            false
        }
    }
}
