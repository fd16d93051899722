//! Delayed-frame renderer.
//!
//! Draws one texture over the whole surface through a fixed passthrough
//! program. The program is built lazily on the first draw so a scheduler
//! that never shows a frame never compiles anything.

use crate::backend::GpuBackend;
use timeshift_core::{Frame, ProgramHandle, Result};
use tracing::trace;

/// Per-surface renderer state.
#[derive(Debug, Default)]
pub struct Renderer {
    program: Option<ProgramHandle>,
    last_drawn_refresh: Option<u64>,
    draws: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn program<G: GpuBackend + ?Sized>(&mut self, gpu: &mut G) -> Result<ProgramHandle> {
        match self.program {
            Some(program) => Ok(program),
            None => {
                let program = gpu.create_program()?;
                self.program = Some(program);
                Ok(program)
            }
        }
    }

    /// Draw `frame` for display refresh `refresh`.
    ///
    /// Returns whether a draw was issued. A second call for the same refresh,
    /// a dead texture handle, or any backend error results in no draw.
    pub fn draw<G: GpuBackend + ?Sized>(&mut self, gpu: &mut G, frame: &Frame, refresh: u64) -> bool {
        if self.last_drawn_refresh == Some(refresh) {
            return false;
        }
        if !gpu.is_texture(frame.texture) {
            trace!(texture = %frame.texture, "skipping draw of dead texture");
            return false;
        }

        let result = self
            .program(gpu)
            .and_then(|program| gpu.draw_quad(program, frame.texture));
        match result {
            Ok(()) => {
                self.last_drawn_refresh = Some(refresh);
                self.draws += 1;
                true
            }
            Err(err) => {
                trace!(%err, sequence = frame.sequence, "draw failed, skipping cycle");
                false
            }
        }
    }

    /// Clear the surface. Errors are swallowed.
    pub fn clear<G: GpuBackend + ?Sized>(&mut self, gpu: &mut G) {
        if let Err(err) = gpu.clear() {
            trace!(%err, "clear failed");
        }
    }

    /// Release the program. Safe to call more than once.
    pub fn destroy<G: GpuBackend + ?Sized>(&mut self, gpu: &mut G) {
        if let Some(program) = self.program.take() {
            gpu.delete_program(program);
        }
    }

    /// Total successful draws.
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    /// Refresh index of the most recent draw.
    pub fn last_drawn_refresh(&self) -> Option<u64> {
        self.last_drawn_refresh
    }

    /// Allow the next call to draw even within the same refresh (after a resize).
    pub fn invalidate(&mut self) {
        self.last_drawn_refresh = None;
    }
}
