//! Frame capture: uploads the source's current decoded picture into a
//! pooled texture and stamps it with a sequence number.

use crate::backend::GpuBackend;
use crate::texture_pool::TexturePool;
use timeshift_core::{Frame, SharedImage, Timestamp};
use tracing::{trace, warn};

/// How much decoded data a media element holds, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Anything that exposes a current decoded picture.
pub trait FrameSource {
    fn ready_state(&self) -> ReadyState;

    /// The picture the decoder is showing right now, if any.
    fn current_image(&self) -> Option<SharedImage>;
}

/// Per-scheduler capture unit.
#[derive(Debug)]
pub struct FrameCapture {
    next_sequence: u64,
}

impl FrameCapture {
    pub fn new() -> Self {
        Self { next_sequence: 1 }
    }

    /// Sequence number of the most recent successful capture, 0 before the first.
    pub fn last_sequence(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Capture the source's current picture.
    ///
    /// Returns `None` without touching the pool when the source has no
    /// current data. An upload failure returns the texture to the pool, so a
    /// successful call performs exactly one net acquisition.
    pub fn capture<G, S>(
        &mut self,
        gpu: &mut G,
        pool: &mut TexturePool,
        source: &S,
        now: Timestamp,
        refresh: u64,
    ) -> Option<Frame>
    where
        G: GpuBackend + ?Sized,
        S: FrameSource + ?Sized,
    {
        if source.ready_state() < ReadyState::HaveCurrentData {
            return None;
        }
        let image = source.current_image()?;
        if image.is_empty() {
            return None;
        }

        let texture = match pool.acquire(gpu) {
            Ok(texture) => texture,
            Err(err) => {
                trace!(%err, "texture acquisition failed, skipping capture");
                return None;
            }
        };

        if let Err(err) = gpu.upload_image(texture, &image) {
            trace!(%err, %texture, "upload failed, skipping capture");
            if let Err(err) = pool.release(gpu, texture) {
                warn!(%err, %texture, "could not return texture after failed upload");
            }
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(Frame {
            texture,
            sequence,
            captured_at: now,
            refresh,
        })
    }
}

impl Default for FrameCapture {
    fn default() -> Self {
        Self::new()
    }
}
