//! wgpu implementation of [`GpuBackend`].
//!
//! Each overlay surface renders into its own offscreen target. The host
//! composites the target over the media element.

use crate::backend::GpuBackend;
use crate::texture::GpuTexture;
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;
use std::sync::Arc;
use timeshift_core::{DecodedImage, ProgramHandle, Result, TextureHandle, TimeshiftError};
use tracing::debug;
use wgpu::util::DeviceExt;

const BLIT_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0) var frame_texture: texture_2d<f32>;
@group(0) @binding(1) var frame_sampler: sampler;

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(in.position, 0.0, 1.0);
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(frame_texture, frame_sampler, in.uv);
}
"#;

/// Full-surface quad vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct QuadVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Triangle strip covering clip space; v flipped so row 0 is the top.
const QUAD: [QuadVertex; 4] = [
    QuadVertex {
        position: [-1.0, -1.0],
        uv: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, -1.0],
        uv: [1.0, 1.0],
    },
    QuadVertex {
        position: [-1.0, 1.0],
        uv: [0.0, 0.0],
    },
    QuadVertex {
        position: [1.0, 1.0],
        uv: [1.0, 0.0],
    },
];

struct BlitProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vertex_buffer: wgpu::Buffer,
}

/// One overlay surface backed by an offscreen wgpu texture.
pub struct WgpuSurface {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    target: GpuTexture,
    /// Pooled textures; storage is allocated on first upload.
    textures: HashMap<TextureHandle, Option<GpuTexture>>,
    programs: HashMap<ProgramHandle, BlitProgram>,
    next_texture: u64,
    next_program: u32,
    presented: u64,
    lost: bool,
}

impl WgpuSurface {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        width: u32,
        height: u32,
    ) -> Self {
        let target = GpuTexture::render_target(&device, width, height);
        Self {
            device,
            queue,
            target,
            textures: HashMap::new(),
            programs: HashMap::new(),
            next_texture: 0,
            next_program: 0,
            presented: 0,
            lost: false,
        }
    }

    /// Draws and clears submitted so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    fn ensure_live(&self) -> Result<()> {
        if self.lost {
            Err(TimeshiftError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn build_program(&self) -> BlitProgram {
        let device = &self.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit_shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blit_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blit_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[QuadVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.target.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blit_quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        BlitProgram {
            pipeline,
            bind_group_layout,
            sampler,
            vertex_buffer,
        }
    }

    fn submit_pass(&mut self, draw: Option<(&BlitProgram, &wgpu::BindGroup)>) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("overlay_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("overlay_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some((program, bind_group)) = draw {
                pass.set_pipeline(&program.pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.set_vertex_buffer(0, program.vertex_buffer.slice(..));
                pass.draw(0..QUAD.len() as u32, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.presented += 1;
    }
}

impl GpuBackend for WgpuSurface {
    fn create_texture(&mut self) -> Result<TextureHandle> {
        self.ensure_live()?;
        self.next_texture += 1;
        let handle = TextureHandle(self.next_texture);
        self.textures.insert(handle, None);
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(Some(slot)) = self.textures.remove(&texture) {
            slot.texture.destroy();
        }
    }

    fn is_texture(&self, texture: TextureHandle) -> bool {
        !self.lost && self.textures.contains_key(&texture)
    }

    fn upload_image(&mut self, texture: TextureHandle, image: &DecodedImage) -> Result<()> {
        self.ensure_live()?;
        let slot = self
            .textures
            .get_mut(&texture)
            .ok_or(TimeshiftError::UnknownTexture(texture))?;

        let needs_alloc = !matches!(slot, Some(existing) if existing.fits(image));
        if needs_alloc {
            if let Some(old) = slot.take() {
                old.texture.destroy();
            }
            *slot = Some(GpuTexture::for_video_frame(
                &self.device,
                image.width,
                image.height,
                image.format,
            ));
        }

        match slot {
            Some(gpu_texture) => gpu_texture.upload_image(&self.queue, image),
            None => Err(TimeshiftError::UnknownTexture(texture)),
        }
    }

    fn create_program(&mut self) -> Result<ProgramHandle> {
        self.ensure_live()?;
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let program = self.build_program();
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(TimeshiftError::Shader(err.to_string()));
        }

        self.next_program += 1;
        let handle = ProgramHandle(self.next_program);
        self.programs.insert(handle, program);
        debug!(program = handle.0, "blit program created");
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
    }

    fn draw_quad(&mut self, program: ProgramHandle, texture: TextureHandle) -> Result<()> {
        self.ensure_live()?;
        let Some(blit) = self.programs.remove(&program) else {
            return Err(TimeshiftError::Gpu(format!("Unknown program {}", program.0)));
        };

        let bind_group = match self.textures.get(&texture) {
            Some(Some(frame)) => Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("blit_bind_group"),
                layout: &blit.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&frame.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&blit.sampler),
                    },
                ],
            })),
            _ => None,
        };

        let result = match &bind_group {
            Some(bind_group) => {
                self.submit_pass(Some((&blit, bind_group)));
                Ok(())
            }
            None => Err(TimeshiftError::UnknownTexture(texture)),
        };
        self.programs.insert(program, blit);
        result
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.submit_pass(None);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.lost || (self.target.width == width && self.target.height == height) {
            return;
        }
        self.target.texture.destroy();
        self.target = GpuTexture::render_target(&self.device, width, height);
    }

    fn lose_context(&mut self) {
        if self.lost {
            return;
        }
        for slot in self.textures.drain().filter_map(|(_, slot)| slot) {
            slot.texture.destroy();
        }
        self.programs.clear();
        self.target.texture.destroy();
        self.lost = true;
        debug!("overlay surface context released");
    }
}
