//! Sample delay line.
//!
//! A circular buffer whose length is the delay in samples. Changing the
//! delay linearizes the buffer (oldest sample first) and then pads or trims
//! at the old end, so samples already in flight keep their order.

/// Fixed-latency delay over interleaved samples.
#[derive(Debug, Clone, Default)]
pub struct DelayLine {
    buffer: Vec<f32>,
    /// Next slot to read and overwrite.
    pos: usize,
}

impl DelayLine {
    /// An empty line with zero latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// A silent line delaying by `samples`.
    pub fn with_delay(samples: usize) -> Self {
        Self {
            buffer: vec![0.0; samples],
            pos: 0,
        }
    }

    /// Current latency in samples.
    pub fn delay_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the line passes samples straight through.
    pub fn is_passthrough(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Change the latency.
    ///
    /// Growing inserts silence ahead of the buffered samples; shrinking
    /// drops the oldest ones.
    pub fn set_delay_samples(&mut self, samples: usize) {
        let current = self.buffer.len();
        if samples == current {
            return;
        }

        self.buffer.rotate_left(self.pos);
        self.pos = 0;

        if samples > current {
            self.buffer.splice(0..0, std::iter::repeat(0.0).take(samples - current));
        } else {
            self.buffer.drain(0..current - samples);
        }
    }

    /// Push one sample and return the sample leaving the line.
    #[inline]
    pub fn tick(&mut self, input: f32) -> f32 {
        if self.buffer.is_empty() {
            return input;
        }
        let out = std::mem::replace(&mut self.buffer[self.pos], input);
        self.pos += 1;
        if self.pos == self.buffer.len() {
            self.pos = 0;
        }
        out
    }

    /// Whether every buffered sample is silent.
    pub fn is_silent(&self) -> bool {
        self.buffer.iter().all(|s| *s == 0.0)
    }
}
