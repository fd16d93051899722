//! GPU texture wrapper.

use timeshift_core::{DecodedImage, PixelFormat, Result, TimeshiftError};

/// A GPU texture holding one captured frame or a surface's backing store.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl GpuTexture {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
        label: Option<&str>,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
            format,
        }
    }

    /// Texture matching a decoded image's layout.
    pub fn for_video_frame(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Self {
        Self::new(
            device,
            width,
            height,
            wgpu_format(format),
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            Some("Captured Frame"),
        )
    }

    /// Offscreen backing store of an overlay surface.
    pub fn render_target(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self::new(
            device,
            width,
            height,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC,
            Some("Overlay Target"),
        )
    }

    /// Whether `image` can be written without reallocating.
    pub fn fits(&self, image: &DecodedImage) -> bool {
        self.width == image.width
            && self.height == image.height
            && self.format == wgpu_format(image.format)
    }

    /// Write a decoded image into this texture.
    pub fn upload_image(&self, queue: &wgpu::Queue, image: &DecodedImage) -> Result<()> {
        if !self.fits(image) {
            return Err(TimeshiftError::Gpu(format!(
                "Image {}x{} {:?} doesn't match texture {}x{} {:?}",
                image.width, image.height, image.format, self.width, self.height, self.format
            )));
        }

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(image.stride as u32),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        Ok(())
    }
}

fn wgpu_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
        PixelFormat::Bgra8 => wgpu::TextureFormat::Bgra8UnormSrgb,
    }
}
