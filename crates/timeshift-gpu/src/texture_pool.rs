//! GPU texture pool for efficient texture reuse.
//!
//! Avoids allocating/deallocating GPU textures per captured frame by keeping
//! a small set of idle textures. The pool grows on demand while many frames
//! are in flight, but never keeps more than `capacity` idle textures: extra
//! releases are destroyed immediately.

use crate::backend::GpuBackend;
use std::collections::HashSet;
use timeshift_core::limits::POOL_CAPACITY;
use timeshift_core::{Result, TextureHandle, TimeshiftError};
use tracing::warn;

/// Pool of reusable textures owned by one scheduler.
#[derive(Debug)]
pub struct TexturePool {
    /// Textures ready for reuse (most recently released last).
    idle: Vec<TextureHandle>,
    /// Textures currently held by a frame slot.
    checked_out: HashSet<TextureHandle>,
    capacity: usize,
    created: u64,
    destroyed: u64,
}

impl TexturePool {
    /// Create a pool keeping at most `capacity` idle textures.
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Vec::with_capacity(capacity),
            checked_out: HashSet::new(),
            capacity,
            created: 0,
            destroyed: 0,
        }
    }

    /// Acquire an idle texture or create a new one.
    pub fn acquire<G: GpuBackend + ?Sized>(&mut self, gpu: &mut G) -> Result<TextureHandle> {
        let texture = match self.idle.pop() {
            Some(texture) => texture,
            None => {
                let texture = gpu.create_texture()?;
                self.created += 1;
                texture
            }
        };
        self.checked_out.insert(texture);
        Ok(texture)
    }

    /// Return a texture. Kept for reuse while the idle set is below capacity,
    /// destroyed otherwise.
    ///
    /// Releasing a handle that is not checked out is a caller bug; it is
    /// reported and otherwise ignored, so a texture is never destroyed twice.
    pub fn release<G: GpuBackend + ?Sized>(
        &mut self,
        gpu: &mut G,
        texture: TextureHandle,
    ) -> Result<()> {
        if !self.checked_out.remove(&texture) {
            warn!(%texture, "release of a texture that is not checked out");
            return Err(TimeshiftError::TextureNotCheckedOut(texture));
        }

        if self.idle.len() < self.capacity {
            self.idle.push(texture);
        } else {
            gpu.delete_texture(texture);
            self.destroyed += 1;
        }
        Ok(())
    }

    /// Destroy every texture the pool still knows about.
    pub fn destroy_all<G: GpuBackend + ?Sized>(&mut self, gpu: &mut G) {
        if !self.checked_out.is_empty() {
            warn!(
                count = self.checked_out.len(),
                "destroying textures that were never released"
            );
        }
        for texture in self.idle.drain(..).chain(self.checked_out.drain()) {
            gpu.delete_texture(texture);
            self.destroyed += 1;
        }
    }

    /// Whether `texture` is currently checked out.
    pub fn is_checked_out(&self, texture: TextureHandle) -> bool {
        self.checked_out.contains(&texture)
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn checked_out_count(&self) -> usize {
        self.checked_out.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Textures created over the pool's lifetime.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Textures destroyed over the pool's lifetime.
    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }

    /// Textures currently alive (idle or checked out).
    pub fn live(&self) -> u64 {
        self.created - self.destroyed
    }
}

impl Default for TexturePool {
    fn default() -> Self {
        Self::new(POOL_CAPACITY)
    }
}
