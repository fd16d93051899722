//! Backend abstraction for one overlay surface's GPU context.

use timeshift_core::{DecodedImage, ProgramHandle, Result, TextureHandle};

/// GPU operations needed by the pool, the capture unit and the renderer.
///
/// Every call may fail once the context is lost; callers on the per-refresh
/// path swallow errors and skip the cycle.
pub trait GpuBackend {
    /// Create a texture sampled with clamp-to-edge wrapping and linear filtering.
    fn create_texture(&mut self) -> Result<TextureHandle>;

    /// Destroy a texture. Unknown handles are ignored.
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Whether `texture` names a live texture in this context.
    fn is_texture(&self, texture: TextureHandle) -> bool;

    /// Upload a decoded image, resizing the texture storage if needed.
    fn upload_image(&mut self, texture: TextureHandle, image: &DecodedImage) -> Result<()>;

    /// Build the passthrough program and its full-surface quad.
    fn create_program(&mut self) -> Result<ProgramHandle>;

    fn delete_program(&mut self, program: ProgramHandle);

    /// Draw `texture` over the whole surface.
    fn draw_quad(&mut self, program: ProgramHandle, texture: TextureHandle) -> Result<()>;

    /// Clear the surface to transparent black.
    fn clear(&mut self) -> Result<()>;

    /// Resize the surface's backing store.
    fn resize(&mut self, width: u32, height: u32);

    /// Release the context itself. No call succeeds afterwards.
    fn lose_context(&mut self);
}
