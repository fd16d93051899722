//! The headless host: overlay surfaces backed by wgpu (or a counting
//! backend when no adapter is available) and a text-recording painter.

use crate::sim::{SyntheticCaptions, SyntheticVideo};
use std::collections::{HashMap, HashSet};
use timeshift_core::{
    DecodedImage, ElementId, ProgramHandle, Rect, Result, TextureHandle, TimeshiftError, Vec2,
};
use timeshift_engine::{OverlayPlan, Platform};
use timeshift_gpu::{GpuBackend, GpuContext, WgpuSurface};
use timeshift_subtitles::{FontSpec, Rgba, SubtitlePainter, TextMeasure};
use tracing::debug;

/// Backend that tracks handles without touching a GPU.
#[derive(Debug, Default)]
pub struct NullGpu {
    next: u64,
    live: HashSet<TextureHandle>,
    draws: u64,
    lost: bool,
}

impl GpuBackend for NullGpu {
    fn create_texture(&mut self) -> Result<TextureHandle> {
        if self.lost {
            return Err(TimeshiftError::ContextLost);
        }
        self.next += 1;
        let texture = TextureHandle(self.next);
        self.live.insert(texture);
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.live.remove(&texture);
    }

    fn is_texture(&self, texture: TextureHandle) -> bool {
        self.live.contains(&texture)
    }

    fn upload_image(&mut self, texture: TextureHandle, _image: &DecodedImage) -> Result<()> {
        if self.live.contains(&texture) {
            Ok(())
        } else {
            Err(TimeshiftError::UnknownTexture(texture))
        }
    }

    fn create_program(&mut self) -> Result<ProgramHandle> {
        if self.lost {
            return Err(TimeshiftError::ContextLost);
        }
        Ok(ProgramHandle(1))
    }

    fn delete_program(&mut self, _program: ProgramHandle) {}

    fn draw_quad(&mut self, _program: ProgramHandle, texture: TextureHandle) -> Result<()> {
        if !self.live.contains(&texture) {
            return Err(TimeshiftError::UnknownTexture(texture));
        }
        self.draws += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        debug!(width, height, "null surface resized");
    }

    fn lose_context(&mut self) {
        self.live.clear();
        self.lost = true;
    }
}

/// Video surface of the host.
pub enum HostGpu {
    Wgpu(WgpuSurface),
    Null(NullGpu),
}

impl HostGpu {
    /// Render passes submitted to this surface.
    pub fn presented(&self) -> u64 {
        match self {
            Self::Wgpu(gpu) => gpu.presented(),
            Self::Null(gpu) => gpu.draws,
        }
    }
}

impl GpuBackend for HostGpu {
    fn create_texture(&mut self) -> Result<TextureHandle> {
        match self {
            Self::Wgpu(gpu) => gpu.create_texture(),
            Self::Null(gpu) => gpu.create_texture(),
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        match self {
            Self::Wgpu(gpu) => gpu.delete_texture(texture),
            Self::Null(gpu) => gpu.delete_texture(texture),
        }
    }

    fn is_texture(&self, texture: TextureHandle) -> bool {
        match self {
            Self::Wgpu(gpu) => gpu.is_texture(texture),
            Self::Null(gpu) => gpu.is_texture(texture),
        }
    }

    fn upload_image(&mut self, texture: TextureHandle, image: &DecodedImage) -> Result<()> {
        match self {
            Self::Wgpu(gpu) => gpu.upload_image(texture, image),
            Self::Null(gpu) => gpu.upload_image(texture, image),
        }
    }

    fn create_program(&mut self) -> Result<ProgramHandle> {
        match self {
            Self::Wgpu(gpu) => gpu.create_program(),
            Self::Null(gpu) => gpu.create_program(),
        }
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        match self {
            Self::Wgpu(gpu) => gpu.delete_program(program),
            Self::Null(gpu) => gpu.delete_program(program),
        }
    }

    fn draw_quad(&mut self, program: ProgramHandle, texture: TextureHandle) -> Result<()> {
        match self {
            Self::Wgpu(gpu) => gpu.draw_quad(program, texture),
            Self::Null(gpu) => gpu.draw_quad(program, texture),
        }
    }

    fn clear(&mut self) -> Result<()> {
        match self {
            Self::Wgpu(gpu) => gpu.clear(),
            Self::Null(gpu) => gpu.clear(),
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        match self {
            Self::Wgpu(gpu) => gpu.resize(width, height),
            Self::Null(gpu) => gpu.resize(width, height),
        }
    }

    fn lose_context(&mut self) {
        match self {
            Self::Wgpu(gpu) => gpu.lose_context(),
            Self::Null(gpu) => gpu.lose_context(),
        }
    }
}

/// Subtitle surface that keeps the text it was last asked to paint.
#[derive(Debug, Default)]
pub struct TextPainter {
    lines: Vec<String>,
}

impl TextPainter {
    /// Text painted since the last clear, segments joined per call order.
    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

impl TextMeasure for TextPainter {
    fn measure(&self, text: &str, font: &FontSpec) -> f32 {
        // average Helvetica advance is about half the em size
        text.chars().count() as f32 * font.size_px as f32 * 0.5
    }
}

impl SubtitlePainter for TextPainter {
    fn clear(&mut self) {
        self.lines.clear();
    }

    fn fill_rect(&mut self, _rect: Rect, _color: Rgba) {}

    fn fill_text(&mut self, text: &str, _origin: Vec2, _font: &FontSpec, _color: Rgba) {
        self.lines.push(text.to_string());
    }

    fn stroke_line(&mut self, _from: Vec2, _to: Vec2, _width: f32, _color: Rgba) {}
}

pub struct HostPlatform {
    context: Option<GpuContext>,
    captions: SyntheticCaptions,
    overlays: HashMap<ElementId, OverlayPlan>,
}

impl HostPlatform {
    pub fn new(context: Option<GpuContext>) -> Self {
        Self {
            context,
            captions: SyntheticCaptions::default(),
            overlays: HashMap::new(),
        }
    }

    pub fn overlay(&self, id: ElementId) -> Option<&OverlayPlan> {
        self.overlays.get(&id)
    }
}

impl Platform for HostPlatform {
    type Element = SyntheticVideo;
    type Gpu = HostGpu;
    type Painter = TextPainter;
    type Document = SyntheticCaptions;

    fn create_surfaces(
        &mut self,
        _element: &SyntheticVideo,
        plan: &OverlayPlan,
    ) -> Result<(HostGpu, TextPainter)> {
        let (width, height) = plan.video.backing;
        let gpu = match &self.context {
            Some(context) => HostGpu::Wgpu(context.create_surface(width.max(1), height.max(1))),
            None => HostGpu::Null(NullGpu::default()),
        };
        Ok((gpu, TextPainter::default()))
    }

    fn place_overlays(&mut self, id: ElementId, plan: &OverlayPlan) {
        debug!(element = %id, video = ?plan.video.backing, subtitles = ?plan.subtitles.backing, "overlays placed");
        self.overlays.insert(id, *plan);
    }

    fn remove_overlays(&mut self, id: ElementId) {
        self.overlays.remove(&id);
    }

    fn captions(&mut self) -> &mut SyntheticCaptions {
        &mut self.captions
    }
}
