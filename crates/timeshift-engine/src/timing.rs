//! Delay timing: frame-count vs wall-clock measurement.
//!
//! Frame-count timing converts the delay into display refreshes at the
//! nominal 60 Hz interval, which keeps replay smooth on standard displays.
//! On a high refresh rate display that count would elapse too early, so
//! the strategy watches the refresh cadence and switches to the host clock
//! once the rolling average falls below the threshold. The switch is one-way.

use crate::settings::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use timeshift_core::{Delay, Timestamp, TimingMode};
use tracing::info;

/// A point in both clocks the scheduler counts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    pub at: Timestamp,
    /// Display refresh index.
    pub refresh: u64,
}

impl Mark {
    pub fn new(at: Timestamp, refresh: u64) -> Self {
        Self { at, refresh }
    }
}

/// Which timing modes a scheduler may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimingPolicy {
    /// Start in frame-count mode, switch to wall clock on high refresh displays.
    #[default]
    Adaptive,
    /// Always count refreshes.
    FrameCount,
    /// Always use the host clock.
    WallClock,
}

/// Rolling average of display refresh intervals.
#[derive(Debug, Clone)]
pub struct RefreshSampler {
    intervals: VecDeque<Duration>,
    size: usize,
    last: Option<Timestamp>,
}

impl RefreshSampler {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            intervals: VecDeque::with_capacity(size),
            size,
            last: None,
        }
    }

    /// Record a refresh timestamp.
    pub fn record(&mut self, now: Timestamp) {
        if let Some(last) = self.last {
            if self.intervals.len() == self.size {
                self.intervals.pop_front();
            }
            self.intervals.push_back(now.saturating_since(last));
        }
        self.last = Some(now);
    }

    /// Average interval, once the sample is full.
    pub fn average(&self) -> Option<Duration> {
        if self.intervals.len() < self.size {
            return None;
        }
        let total: Duration = self.intervals.iter().sum();
        Some(total / self.size as u32)
    }

    /// Forget the last timestamp so a gap (hidden page) is not sampled.
    pub fn break_cadence(&mut self) {
        self.last = None;
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

/// Measures whether a delay has elapsed between two marks.
#[derive(Debug, Clone)]
pub struct TimingStrategy {
    mode: TimingMode,
    policy: TimingPolicy,
    nominal: Duration,
    threshold: Duration,
    sampler: RefreshSampler,
}

impl TimingStrategy {
    pub fn new(policy: TimingPolicy, nominal: Duration, sample_size: usize, threshold: Duration) -> Self {
        let mode = match policy {
            TimingPolicy::WallClock => TimingMode::WallClock,
            TimingPolicy::Adaptive | TimingPolicy::FrameCount => TimingMode::FrameCount,
        };
        Self {
            mode,
            policy,
            nominal,
            threshold,
            sampler: RefreshSampler::new(sample_size),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.timing_policy,
            config.nominal_refresh_interval(),
            config.refresh_sample_size,
            config.high_refresh_threshold(),
        )
    }

    pub fn mode(&self) -> TimingMode {
        self.mode
    }

    pub fn policy(&self) -> TimingPolicy {
        self.policy
    }

    /// Feed one display refresh. Returns `true` on the refresh that switches
    /// to wall-clock timing; the caller rebases its baseline then.
    pub fn observe_refresh(&mut self, now: Timestamp) -> bool {
        if self.mode == TimingMode::WallClock || self.policy != TimingPolicy::Adaptive {
            return false;
        }
        self.sampler.record(now);
        match self.sampler.average() {
            Some(average) if average < self.threshold => {
                info!(
                    average_ms = average.as_secs_f64() * 1000.0,
                    "high refresh rate display, switching to wall-clock timing"
                );
                self.mode = TimingMode::WallClock;
                true
            }
            _ => false,
        }
    }

    /// Drop the cadence reference after the page was hidden.
    pub fn break_cadence(&mut self) {
        self.sampler.break_cadence();
    }

    /// Whether `delay` has elapsed from `since` to `now`.
    pub fn elapsed_reached(&self, since: Mark, delay: Delay, now: Mark) -> bool {
        match self.mode {
            TimingMode::FrameCount => {
                now.refresh.saturating_sub(since.refresh) >= delay.intervals(self.nominal)
            }
            TimingMode::WallClock => now.at.saturating_since(since.at) >= delay.as_duration(),
        }
    }

    /// Refreshes a delay spans in frame-count mode.
    pub fn delay_refreshes(&self, delay: Delay) -> u64 {
        delay.intervals(self.nominal)
    }
}

impl Default for TimingStrategy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
