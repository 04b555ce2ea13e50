//! # Time
//!
//! Monotonic millisecond timestamps on a wrapping `u32` clock.
//!
//! The clock wraps roughly every 49.7 days. Elapsed time is always computed
//! with wrapping subtraction, so spans shorter than a full wrap come out
//! right even when the counter rolled over in between.

/// A point on the scheduler's millisecond clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instant(u32);

impl Instant {
    #[inline]
    pub const fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    #[inline]
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Milliseconds from `earlier` to `self`, modulo the clock wrap.
    #[inline]
    pub const fn millis_since(self, earlier: Instant) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// The instant `ms` milliseconds later, wrapping.
    #[inline]
    pub const fn wrapping_add(self, ms: u32) -> Self {
        Self(self.0.wrapping_add(ms))
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
