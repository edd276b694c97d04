//! Wrap-safe monotonic time.
//!
//! Every timestamp in the firmware is a 32-bit millisecond counter taken
//! from the monotonic boot timer.  The counter wraps after ~49.7 days, so
//! elapsed time is **always** computed with wrapping unsigned subtraction,
//! never by comparing two instants directly.
//!
//! ```text
//!   u32::MAX - 5        2  (wrapped)
//!        │               │
//!        ▼               ▼
//!   ─────●───────────────●─────▶   elapsed = 2 - (MAX - 5) = 8 ms
//! ```

use core::fmt;

/// Milliseconds.  Used for both durations and intervals.
pub type Millis = u32;

/// Half the counter range (~24.8 days).  Differences above this are read
/// as the earlier instant lying ahead.
const HALF_RANGE: Millis = u32::MAX / 2;

/// Monotonic instant (milliseconds since boot, wrapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Instant(u32);

impl Instant {
    /// Instant at boot.
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    /// Truncate a 64-bit microsecond uptime into a wrapping millisecond instant.
    pub const fn from_micros(us: u64) -> Self {
        Self((us / 1_000) as u32)
    }

    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`.
    ///
    /// Correct across a single counter wrap.  If `earlier` is actually in
    /// the future the result is a very large value, which callers treat as
    /// "long overdue" rather than "not yet".
    pub const fn elapsed_since(self, earlier: Instant) -> Millis {
        self.0.wrapping_sub(earlier.0)
    }

    /// `true` once at least `interval` ms have passed since `earlier`.
    pub const fn has_elapsed(self, earlier: Instant, interval: Millis) -> bool {
        self.elapsed_since(earlier) >= interval
    }

    /// Elapsed time for windows anchored on an event stamp.
    ///
    /// A stamp taken after `self` (a tick that captured `now` before a
    /// publish) lies in the near future; anything less than half the
    /// counter range ahead counts as zero elapsed instead of wrapping.
    pub const fn elapsed_since_stamp(self, stamp: Instant) -> Millis {
        let d = self.0.wrapping_sub(stamp.0);
        if d > HALF_RANGE { 0 } else { d }
    }

    /// This instant advanced by `ms`, wrapping.
    #[must_use]
    pub const fn add_millis(self, ms: Millis) -> Self {
        Self(self.0.wrapping_add(ms))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t+{}ms", self.0)
    }
}

/// Scale an interval, saturating instead of overflowing.
pub fn scale_interval(interval: Millis, multiplier: u32) -> Millis {
    interval.saturating_mul(multiplier.max(1))
}
