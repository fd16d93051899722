//! Per-element wet/dry route.

use crate::delay_line::DelayLine;
use serde::{Deserialize, Serialize};
use timeshift_core::Delay;
use tracing::debug;

/// Which path is audible. Gains always sum to 1; the two paths are never
/// blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Crossfade {
    /// Delayed path.
    Wet,
    /// Bypass path.
    #[default]
    Dry,
}

impl Crossfade {
    /// `(wet, dry)` gains.
    #[inline]
    pub fn gains(self) -> (f32, f32) {
        match self {
            Self::Wet => (1.0, 0.0),
            Self::Dry => (0.0, 1.0),
        }
    }
}

/// Delay and bypass paths from one element to the output.
#[derive(Debug, Clone)]
pub struct AudioRoute {
    sample_rate: u32,
    channels: u16,
    delay_line: DelayLine,
    crossfade: Crossfade,
    /// Delay to apply whenever the route is enabled.
    configured: Delay,
    enabled: bool,
}

impl AudioRoute {
    /// A dry route with zero latency.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            delay_line: DelayLine::new(),
            crossfade: Crossfade::Dry,
            configured: Delay::ZERO,
            enabled: true,
        }
    }

    /// Set the delay, clamped to the engine ceiling.
    ///
    /// A non-zero delay resizes the delay line and switches to the wet path.
    /// Zero switches to the dry path and rebuilds an empty line so no tail
    /// from the previous delay is ever heard.
    pub fn set_delay(&mut self, delay: Delay) {
        self.configured = delay;
        if self.enabled {
            self.apply(delay);
        }
    }

    /// Apply the configured delay.
    pub fn enable(&mut self) {
        self.enabled = true;
        self.apply(self.configured);
    }

    /// Route to the dry path with a rebuilt empty line, keeping the
    /// configured delay for the next [`enable`](Self::enable).
    pub fn disable(&mut self) {
        self.enabled = false;
        self.apply(Delay::ZERO);
    }

    fn apply(&mut self, delay: Delay) {
        if delay.is_zero() {
            self.delay_line = DelayLine::new();
            self.crossfade = Crossfade::Dry;
        } else {
            self.delay_line.set_delay_samples(self.samples_for(delay));
            self.crossfade = Crossfade::Wet;
        }
        debug!(%delay, crossfade = ?self.crossfade, "audio route updated");
    }

    /// Interleaved samples covering `delay` at this route's format.
    pub fn samples_for(&self, delay: Delay) -> usize {
        let frames = delay.as_millis() as u128 * self.sample_rate as u128 / 1000;
        frames as usize * self.channels as usize
    }

    /// `output = delay(input * wet) + input * dry`, sample by sample.
    ///
    /// Processes `min(input.len(), output.len())` samples.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let (wet, dry) = self.crossfade.gains();
        for (out, &x) in output.iter_mut().zip(input) {
            *out = self.delay_line.tick(x * wet) + x * dry;
        }
    }

    pub fn crossfade(&self) -> Crossfade {
        self.crossfade
    }

    /// `(wet, dry)` gains currently in force.
    pub fn gains(&self) -> (f32, f32) {
        self.crossfade.gains()
    }

    /// The delay that applies while enabled.
    pub fn configured_delay(&self) -> Delay {
        self.configured
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn delay_line(&self) -> &DelayLine {
        &self.delay_line
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
