//! Timeshift GPU - frame capture and delayed-frame rendering
//!
//! The engine talks to the GPU only through [`GpuBackend`], one instance per
//! overlay surface. [`WgpuSurface`] is the wgpu implementation; hosts with a
//! different API (WebGL, a test recorder) implement the trait themselves.

pub mod backend;
pub mod capture;
pub mod context;
pub mod renderer;
pub mod surface;
pub mod texture;
pub mod texture_pool;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::GpuBackend;
pub use capture::{FrameCapture, FrameSource, ReadyState};
pub use context::GpuContext;
pub use renderer::Renderer;
pub use surface::WgpuSurface;
pub use texture::GpuTexture;
pub use texture_pool::TexturePool;
