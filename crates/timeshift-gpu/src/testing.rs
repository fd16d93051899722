//! In-crate test doubles.

use crate::backend::GpuBackend;
use crate::capture::{FrameSource, ReadyState};
use std::collections::HashSet;
use std::sync::Arc;
use timeshift_core::{
    DecodedImage, ProgramHandle, Result, SharedImage, TextureHandle, TimeshiftError,
};

/// Backend that only counts calls.
#[derive(Debug, Default)]
pub struct CountingGpu {
    pub next: u64,
    pub live: HashSet<TextureHandle>,
    pub created: u64,
    pub deleted: Vec<TextureHandle>,
    pub uploads: u64,
    pub draws: Vec<TextureHandle>,
    pub clears: u64,
    pub programs_deleted: u64,
    pub fail_create: bool,
    pub fail_upload: bool,
    pub fail_draw: bool,
}

impl GpuBackend for CountingGpu {
    fn create_texture(&mut self) -> Result<TextureHandle> {
        if self.fail_create {
            return Err(TimeshiftError::ContextLost);
        }
        self.next += 1;
        self.created += 1;
        let handle = TextureHandle(self.next);
        self.live.insert(handle);
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.live.remove(&texture);
        self.deleted.push(texture);
    }

    fn is_texture(&self, texture: TextureHandle) -> bool {
        self.live.contains(&texture)
    }

    fn upload_image(&mut self, _texture: TextureHandle, _image: &DecodedImage) -> Result<()> {
        if self.fail_upload {
            return Err(TimeshiftError::Gpu("upload rejected".into()));
        }
        self.uploads += 1;
        Ok(())
    }

    fn create_program(&mut self) -> Result<ProgramHandle> {
        Ok(ProgramHandle(1))
    }

    fn delete_program(&mut self, _program: ProgramHandle) {
        self.programs_deleted += 1;
    }

    fn draw_quad(&mut self, _program: ProgramHandle, texture: TextureHandle) -> Result<()> {
        if self.fail_draw {
            return Err(TimeshiftError::ContextLost);
        }
        self.draws.push(texture);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.clears += 1;
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn lose_context(&mut self) {}
}

/// Source that always shows the same small picture.
pub struct StillSource {
    pub state: ReadyState,
    pub image: SharedImage,
}

impl StillSource {
    pub fn new(state: ReadyState) -> Self {
        Self {
            state,
            image: Arc::new(DecodedImage::solid(4, 4, [10, 20, 30, 255])),
        }
    }
}

impl FrameSource for StillSource {
    fn ready_state(&self) -> ReadyState {
        self.state
    }

    fn current_image(&self) -> Option<SharedImage> {
        Some(self.image.clone())
    }
}
