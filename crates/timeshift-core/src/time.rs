//! Host clock timestamps and delay values.
//!
//! The host drives the engine with monotonic timestamps (the browser's
//! `performance.now()` or an `Instant` offset). Delays are clamped to the
//! engine ceiling on construction so downstream code never re-checks.

use crate::limits::MAX_DELAY_MS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// A point on the host's monotonic clock, measured from an arbitrary origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The clock origin.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Timestamp from whole milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    /// Timestamp from fractional milliseconds. Negative or non-finite input maps to zero.
    pub fn from_millis_f64(ms: f64) -> Self {
        if !ms.is_finite() || ms <= 0.0 {
            return Self::ZERO;
        }
        Self(Duration::from_secs_f64(ms / 1000.0))
    }

    /// Offset from the clock origin.
    #[inline]
    pub fn as_duration(self) -> Duration {
        self.0
    }

    /// Milliseconds since the clock origin.
    #[inline]
    pub fn as_millis_f64(self) -> f64 {
        self.0.as_secs_f64() * 1000.0
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    #[inline]
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs)
    }
}

impl Sub for Timestamp {
    type Output = Duration;
    fn sub(self, rhs: Self) -> Duration {
        self.saturating_since(rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}ms", self.as_millis_f64())
    }
}

/// A delay clamped to `[0, MAX_DELAY_MS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct Delay(Duration);

impl Delay {
    /// No delay.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// The ceiling.
    pub const MAX: Self = Self(Duration::from_millis(MAX_DELAY_MS));

    /// Delay from milliseconds, clamped to the ceiling.
    #[inline]
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms.min(MAX_DELAY_MS)))
    }

    /// Delay from a signed millisecond value; negatives clamp to zero.
    pub fn from_millis_i64(ms: i64) -> Self {
        Self::from_millis(ms.max(0) as u64)
    }

    #[inline]
    pub fn as_duration(self) -> Duration {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0.as_millis() as u64
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Number of whole intervals needed to cover this delay (rounded up).
    pub fn intervals(self, interval: Duration) -> u64 {
        if self.0.is_zero() {
            return 0;
        }
        let interval = interval.as_nanos().max(1);
        self.0.as_nanos().div_ceil(interval) as u64
    }
}

impl From<u64> for Delay {
    fn from(ms: u64) -> Self {
        Self::from_millis(ms)
    }
}

impl From<Delay> for u64 {
    fn from(delay: Delay) -> Self {
        delay.as_millis()
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.as_millis())
    }
}

/// How elapsed delay is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimingMode {
    /// Delay counted in display refreshes at the nominal interval.
    #[default]
    FrameCount,
    /// Delay measured on the host clock.
    WallClock,
}

impl fmt::Display for TimingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameCount => write!(f, "frame-count"),
            Self::WallClock => write!(f, "wall-clock"),
        }
    }
}
