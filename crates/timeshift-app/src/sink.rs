//! Audio sink opened on first use.
//!
//! Audio mode can be switched on by a settings message long after startup,
//! so the device is opened the first time the monitor has an audio graph,
//! at that graph's format. A failed open is not retried.

use timeshift_core::Result;
use tracing::{info, warn};

#[derive(Debug)]
pub enum LazySink<O> {
    Closed,
    Open(O),
    Unavailable,
}

impl<O> LazySink<O> {
    pub fn new(output: Option<O>) -> Self {
        output.map_or(Self::Closed, Self::Open)
    }

    /// Open the sink for a graph processing at `sample_rate` with `channels`
    /// if it is still closed. Returns `true` on the call that opened it.
    pub fn ensure(
        &mut self,
        sample_rate: u32,
        channels: u16,
        open: impl FnOnce(u32, u16) -> Result<O>,
    ) -> bool {
        if !matches!(self, Self::Closed) {
            return false;
        }
        match open(sample_rate, channels) {
            Ok(output) => {
                info!(sample_rate, channels, "audio output opened for delayed audio");
                *self = Self::Open(output);
                true
            }
            Err(err) => {
                warn!(%err, "audio output unavailable, processing silently");
                *self = Self::Unavailable;
                false
            }
        }
    }

    pub fn output(&self) -> Option<&O> {
        match self {
            Self::Open(output) => Some(output),
            Self::Closed | Self::Unavailable => None,
        }
    }
}
