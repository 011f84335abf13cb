//! Textured quad lab
//!
//! A long road-like quad in the ground plane, seen from above one end, used
//! to compare magnification, minification and anisotropic filtering.

use super::{uniform_bind_group, uniform_layout, Lab, CLEAR_COLOR};
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::resources::{GpuTexture, MagFilter, MinFilter, SamplerSettings, TextureData, MAX_ANISOTROPY};
use crate::scene::{Camera, Projection};
use crate::state::AppState;
use crate::LabResult;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use std::path::PathBuf;

const QUAD_POSITIONS: [Vec3; 4] = [
    Vec3::new(-10.0, 0.0, -10.0),
    Vec3::new(-10.0, 0.0, -330.0),
    Vec3::new(10.0, 0.0, -330.0),
    Vec3::new(10.0, 0.0, -10.0),
];

const QUAD_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, 0.0),
];

const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

const CAMERA_HEIGHT: f32 = 10.0;

const QUAD_SHADER: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniform;
@group(1) @binding(0) var color_texture: texture_2d<f32>;
@group(1) @binding(1) var color_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(position, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(color_texture, color_sampler, in.uv);
}
"#;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view_proj: Mat4,
}

/// GPU resources of the quad lab
struct QuadGpu {
    pipeline: RenderPipelineHandle,
    texture_layout: BindGroupLayoutHandle,
    camera_buffer: BufferHandle,
    camera_bind_group: BindGroupHandle,
    position_buffer: BufferHandle,
    uv_buffer: BufferHandle,
    index_buffer: BufferHandle,
    texture: GpuTexture,
    sampler: SamplerHandle,
    texture_bind_group: BindGroupHandle,
    /// Settings the current sampler was built from
    applied: SamplerSettings,
}

/// Lab comparing texture sampler parameters
pub struct TexturedQuadLab {
    texture_path: PathBuf,
    pub settings: SamplerSettings,
    /// Sideways camera offset, -1..=1
    pub camera_pan: f32,
    camera: Camera,
    gpu: Option<QuadGpu>,
}

impl TexturedQuadLab {
    pub fn new(texture_path: impl Into<PathBuf>) -> Self {
        let position = Vec3::new(0.0, CAMERA_HEIGHT, 0.0);
        Self {
            texture_path: texture_path.into(),
            settings: SamplerSettings::default(),
            camera_pan: 0.0,
            camera: Camera::new(
                position,
                position - Vec3::Z,
                Projection::perspective(45.0, 16.0 / 9.0, 0.01, 400.0),
            ),
            gpu: None,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    fn load_texture(&self) -> TextureData {
        match TextureData::from_file(&self.texture_path) {
            Ok(data) => data.with_mipmaps(),
            Err(e) => {
                log::warn!("{}; using a checkerboard instead", e);
                TextureData::checkerboard(256, [230, 230, 230, 255], [40, 40, 40, 255]).with_mipmaps()
            }
        }
    }

    fn texture_bind_group<B: GraphicsBackend>(
        backend: &mut B,
        layout: BindGroupLayoutHandle,
        texture: &GpuTexture,
        sampler: SamplerHandle,
    ) -> BackendResult<BindGroupHandle> {
        backend.create_bind_group(
            layout,
            &[
                (0, BindGroupEntry::Texture(texture.view)),
                (1, BindGroupEntry::Sampler(sampler)),
            ],
        )
    }

    fn create_gpu<B: GraphicsBackend>(&self, backend: &mut B) -> LabResult<QuadGpu> {
        let camera_layout = uniform_layout(backend, ShaderStageFlags::VERTEX)?;
        let texture_layout = backend.create_bind_group_layout(&[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Texture { filterable: true },
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Sampler { filtering: true },
            },
        ])?;

        let pipeline = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Textured Quad Pipeline".into()),
            shader: QUAD_SHADER.into(),
            vertex_layouts: vec![
                VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vec3>() as u64,
                    attributes: vec![VertexAttribute {
                        location: 0,
                        format: VertexFormat::Float32x3,
                        offset: 0,
                    }],
                },
                VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vec2>() as u64,
                    attributes: vec![VertexAttribute {
                        location: 1,
                        format: VertexFormat::Float32x2,
                        offset: 0,
                    }],
                },
            ],
            bind_group_layouts: vec![camera_layout, texture_layout],
            depth_stencil: None,
            color_targets: vec![ColorTargetState {
                format: backend.swapchain_format(),
                write_mask: ColorWrites::ALL,
            }],
        })?;

        let uniform = CameraUniform {
            view_proj: self.camera.view_projection_matrix(),
        };
        let camera_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some("Quad Camera Buffer".into()),
                size: std::mem::size_of::<CameraUniform>() as u64,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            },
            bytemuck::bytes_of(&uniform),
        )?;
        let camera_bind_group = uniform_bind_group(backend, camera_layout, camera_buffer)?;

        let position_bytes: &[u8] = bytemuck::cast_slice(&QUAD_POSITIONS);
        let position_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some("Quad Positions".into()),
                size: position_bytes.len() as u64,
                usage: BufferUsage::VERTEX,
            },
            position_bytes,
        )?;

        let uv_bytes: &[u8] = bytemuck::cast_slice(&QUAD_UVS);
        let uv_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some("Quad UVs".into()),
                size: uv_bytes.len() as u64,
                usage: BufferUsage::VERTEX,
            },
            uv_bytes,
        )?;

        let index_bytes: &[u8] = bytemuck::cast_slice(&QUAD_INDICES);
        let index_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some("Quad Indices".into()),
                size: index_bytes.len() as u64,
                usage: BufferUsage::INDEX,
            },
            index_bytes,
        )?;

        let texture = GpuTexture::create(backend, &self.load_texture())?;
        let sampler = backend.create_sampler(&self.settings.descriptor())?;
        let texture_bind_group = Self::texture_bind_group(backend, texture_layout, &texture, sampler)?;

        log::info!(
            "Textured quad ready: {}x{} texture, {} mip levels",
            texture.width,
            texture.height,
            TextureData::full_mip_count(texture.width, texture.height)
        );

        Ok(QuadGpu {
            pipeline,
            texture_layout,
            camera_buffer,
            camera_bind_group,
            position_buffer,
            uv_buffer,
            index_buffer,
            texture,
            sampler,
            texture_bind_group,
            applied: self.settings,
        })
    }

    /// Swap in a sampler built from the current settings
    fn rebuild_sampler<B: GraphicsBackend>(&mut self, backend: &mut B) -> LabResult<()> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };

        let sampler = backend.create_sampler(&self.settings.descriptor())?;
        let bind_group = match Self::texture_bind_group(backend, gpu.texture_layout, &gpu.texture, sampler) {
            Ok(bind_group) => bind_group,
            Err(e) => {
                backend.destroy_sampler(sampler);
                return Err(e.into());
            }
        };

        let old_bind_group = std::mem::replace(&mut gpu.texture_bind_group, bind_group);
        let old_sampler = std::mem::replace(&mut gpu.sampler, sampler);
        backend.destroy_bind_group(old_bind_group);
        backend.destroy_sampler(old_sampler);
        gpu.applied = self.settings;

        log::debug!(
            "Sampler rebuilt: mag {:?}, min {:?}, anisotropy {}",
            self.settings.mag_filter,
            self.settings.min_filter,
            self.settings.effective_anisotropy()
        );
        Ok(())
    }
}

impl<B: GraphicsBackend> Lab<B> for TexturedQuadLab {
    fn title(&self) -> &str {
        "Textured Quad"
    }

    fn init(&mut self, backend: &mut B, width: u32, height: u32) -> LabResult<()> {
        self.camera.set_aspect(width as f32, height as f32);
        let gpu = self.create_gpu(backend)?;
        if let Some(old) = self.gpu.replace(gpu) {
            release_gpu(backend, old);
        }
        Ok(())
    }

    fn resize(&mut self, _backend: &mut B, width: u32, height: u32) -> LabResult<()> {
        self.camera.set_aspect(width as f32, height as f32);
        Ok(())
    }

    fn update(&mut self, backend: &mut B) -> LabResult<()> {
        self.camera_pan = self.camera_pan.clamp(-1.0, 1.0);
        self.camera
            .set_position(Vec3::new(self.camera_pan, CAMERA_HEIGHT, 0.0));

        let needs_sampler = self
            .gpu
            .as_ref()
            .is_some_and(|gpu| gpu.applied != self.settings);
        if needs_sampler {
            self.rebuild_sampler(backend)?;
        }

        if let Some(gpu) = &self.gpu {
            let uniform = CameraUniform {
                view_proj: self.camera.view_projection_matrix(),
            };
            backend.write_buffer(gpu.camera_buffer, 0, bytemuck::bytes_of(&uniform));
        }
        Ok(())
    }

    fn render(&mut self, backend: &mut B, frame: &FrameContext) {
        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Textured Quad Pass".into()),
            color_attachments: vec![ColorAttachment {
                view: frame.swapchain_view,
                clear_color: CLEAR_COLOR,
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: None,
        });

        if let Some(gpu) = &self.gpu {
            backend.set_viewport(0.0, 0.0, frame.width as f32, frame.height as f32, 0.0, 1.0);
            backend.set_render_pipeline(gpu.pipeline);
            backend.set_bind_group(0, gpu.camera_bind_group);
            backend.set_bind_group(1, gpu.texture_bind_group);
            backend.set_vertex_buffer(0, gpu.position_buffer, 0);
            backend.set_vertex_buffer(1, gpu.uv_buffer, 0);
            backend.set_index_buffer(gpu.index_buffer, 0);
            backend.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        }

        backend.end_render_pass();
    }

    fn gui(&mut self, ctx: &egui::Context, state: &AppState) {
        egui::Window::new("Texture sampling")
            .default_pos([10.0, 10.0])
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Magnification");
                for filter in MagFilter::ALL {
                    ui.radio_value(&mut self.settings.mag_filter, filter, filter.label());
                }
                ui.separator();

                ui.heading("Minification");
                for filter in MinFilter::ALL {
                    ui.radio_value(&mut self.settings.min_filter, filter, filter.label());
                }
                ui.separator();

                ui.add(
                    egui::Slider::new(&mut self.settings.anisotropy, 1.0..=MAX_ANISOTROPY)
                        .text("Anisotropic filtering")
                        .step_by(1.0),
                );
                if self.settings.effective_anisotropy() == 1 && self.settings.anisotropy > 1.0 {
                    ui.weak("Anisotropy needs linear filters everywhere");
                }
                ui.separator();

                ui.add(egui::Slider::new(&mut self.camera_pan, -1.0..=1.0).text("Camera Pan"));
                ui.separator();

                ui.label(state.frame_label());
            });
    }

    fn release(&mut self, backend: &mut B) {
        if let Some(gpu) = self.gpu.take() {
            release_gpu(backend, gpu);
        }
    }
}

fn release_gpu<B: GraphicsBackend>(backend: &mut B, gpu: QuadGpu) {
    backend.destroy_bind_group(gpu.texture_bind_group);
    backend.destroy_bind_group(gpu.camera_bind_group);
    backend.destroy_sampler(gpu.sampler);
    gpu.texture.destroy(backend);
    backend.destroy_buffer(gpu.position_buffer);
    backend.destroy_buffer(gpu.uv_buffer);
    backend.destroy_buffer(gpu.index_buffer);
    backend.destroy_buffer(gpu.camera_buffer);
}
