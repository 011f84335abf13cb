//! Height-field terrain lab
//!
//! [`HeightField`] owns the GPU side of a tessellated grid plus its height
//! and diffuse maps. [`HeightFieldLab`] renders it and exposes the
//! tessellation factor in the GUI.

use super::{uniform_bind_group, uniform_layout, DepthTarget, Lab, CLEAR_COLOR};
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::resources::{GpuTexture, GridMesh, SamplerSettings, TextureData};
use crate::scene::{Camera, Projection};
use crate::state::AppState;
use crate::LabResult;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::path::{Path, PathBuf};

/// Largest tessellation the GUI slider offers
pub const MAX_TESSELLATION: i32 = 512;

const HEIGHTFIELD_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    height_scale: f32,
}

@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(1) @binding(0) var height_map: texture_2d<f32>;
@group(1) @binding(1) var diffuse_map: texture_2d<f32>;
@group(1) @binding(2) var diffuse_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    // R32Float is not filterable, so read the nearest texel directly.
    let size = vec2<i32>(textureDimensions(height_map));
    let texel = clamp(vec2<i32>(uv * vec2<f32>(size)), vec2<i32>(0), size - vec2<i32>(1));
    let height = textureLoad(height_map, texel, 0).r;

    var out: VertexOutput;
    let world = vec3<f32>(position.x, height * uniforms.height_scale, position.y);
    out.clip_position = uniforms.view_proj * vec4<f32>(world, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(diffuse_map, diffuse_sampler, in.uv);
}
"#;

/// Uploaded grid mesh: two vertex buffers and a `u32` index buffer
#[derive(Debug)]
pub struct GpuGridMesh {
    pub positions: BufferHandle,
    pub uvs: BufferHandle,
    pub indices: BufferHandle,
    pub index_count: u32,
    pub tessellation: u32,
}

impl GpuGridMesh {
    /// Upload a generated mesh into fresh buffers
    pub fn upload<B: GraphicsBackend>(backend: &mut B, mesh: &GridMesh) -> BackendResult<Self> {
        let positions = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some("Height Field Positions".into()),
                size: mesh.position_bytes().len() as u64,
                usage: BufferUsage::VERTEX,
            },
            mesh.position_bytes(),
        )?;

        let uvs = match backend.create_buffer_init(
            &BufferDescriptor {
                label: Some("Height Field UVs".into()),
                size: mesh.uv_bytes().len() as u64,
                usage: BufferUsage::VERTEX,
            },
            mesh.uv_bytes(),
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                backend.destroy_buffer(positions);
                return Err(e);
            }
        };

        let indices = match backend.create_buffer_init(
            &BufferDescriptor {
                label: Some("Height Field Indices".into()),
                size: mesh.index_bytes().len() as u64,
                usage: BufferUsage::INDEX,
            },
            mesh.index_bytes(),
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                backend.destroy_buffer(positions);
                backend.destroy_buffer(uvs);
                return Err(e);
            }
        };

        Ok(Self {
            positions,
            uvs,
            indices,
            index_count: mesh.index_count() as u32,
            tessellation: mesh.tessellation(),
        })
    }

    pub fn destroy<B: GraphicsBackend>(self, backend: &mut B) {
        backend.destroy_buffer(self.positions);
        backend.destroy_buffer(self.uvs);
        backend.destroy_buffer(self.indices);
    }
}

/// GPU resources of one height-field terrain
#[derive(Default)]
pub struct HeightField {
    mesh_resolution: u32,
    height_field_path: Option<PathBuf>,
    diffuse_path: Option<PathBuf>,
    height_texture: Option<GpuTexture>,
    diffuse_texture: Option<GpuTexture>,
    mesh: Option<GpuGridMesh>,
}

impl HeightField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tessellation of the uploaded mesh, 0 before the first generation
    pub fn mesh_resolution(&self) -> u32 {
        self.mesh_resolution
    }

    pub fn mesh(&self) -> Option<&GpuGridMesh> {
        self.mesh.as_ref()
    }

    pub fn height_texture(&self) -> Option<&GpuTexture> {
        self.height_texture.as_ref()
    }

    pub fn diffuse_texture(&self) -> Option<&GpuTexture> {
        self.diffuse_texture.as_ref()
    }

    pub fn height_field_path(&self) -> Option<&Path> {
        self.height_field_path.as_deref()
    }

    pub fn diffuse_path(&self) -> Option<&Path> {
        self.diffuse_path.as_deref()
    }

    /// Load a height map, flipped so row 0 is the bottom of the image.
    ///
    /// On failure the previous texture stays in place. On success the old
    /// view is destroyed, so bind groups over it must be rebuilt
    /// ([`HeightFieldLab::reload_height_field`] does this).
    pub fn load_height_field<B: GraphicsBackend>(&mut self, backend: &mut B, path: &Path) -> LabResult<()> {
        let data = TextureData::load_height_field(path, true)?;
        let texture = GpuTexture::create(backend, &data)?;
        if let Some(old) = self.height_texture.replace(texture) {
            old.destroy(backend);
        }
        self.height_field_path = Some(path.to_path_buf());
        log::info!("Height field loaded from {}", path.display());
        Ok(())
    }

    /// Load the diffuse map with a full mip chain.
    ///
    /// Replaces the old texture the same way as [`Self::load_height_field`].
    pub fn load_diffuse_texture<B: GraphicsBackend>(&mut self, backend: &mut B, path: &Path) -> LabResult<()> {
        let data = TextureData::load_diffuse(path, true)?.with_mipmaps();
        let texture = GpuTexture::create(backend, &data)?;
        if let Some(old) = self.diffuse_texture.replace(texture) {
            old.destroy(backend);
        }
        self.diffuse_path = Some(path.to_path_buf());
        log::info!("Diffuse texture loaded from {}", path.display());
        Ok(())
    }

    /// Fill missing maps with a flat height and a white diffuse texel
    pub fn use_fallback_textures<B: GraphicsBackend>(&mut self, backend: &mut B) -> LabResult<()> {
        if self.height_texture.is_none() {
            self.height_texture = Some(GpuTexture::create(backend, &TextureData::flat_height())?);
        }
        if self.diffuse_texture.is_none() {
            self.diffuse_texture = Some(GpuTexture::create(backend, &TextureData::white())?);
        }
        Ok(())
    }

    /// Generate a grid with `tessellation` edges per side and swap it in.
    ///
    /// The new buffers are fully built before the old ones are destroyed, so
    /// an invalid factor or a failed upload leaves the current mesh intact.
    pub fn generate_mesh<B: GraphicsBackend>(&mut self, backend: &mut B, tessellation: i32) -> LabResult<()> {
        let mesh = GridMesh::generate(tessellation)?;
        let uploaded = GpuGridMesh::upload(backend, &mesh)?;

        if let Some(old) = self.mesh.replace(uploaded) {
            old.destroy(backend);
        }
        self.mesh_resolution = mesh.tessellation();

        log::debug!(
            "Generated height field mesh: N={}, {} vertices, {} triangles",
            mesh.tessellation(),
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(())
    }

    /// Bind the mesh buffers and draw every triangle.
    ///
    /// Returns false without drawing when no mesh has been generated yet.
    pub fn submit_triangles<B: GraphicsBackend>(&self, backend: &mut B) -> bool {
        let Some(mesh) = &self.mesh else {
            log::warn!("No height field mesh generated yet, nothing to draw");
            return false;
        };

        backend.set_vertex_buffer(0, mesh.positions, 0);
        backend.set_vertex_buffer(1, mesh.uvs, 0);
        backend.set_index_buffer(mesh.indices, 0);
        backend.draw_indexed(0..mesh.index_count, 0, 0..1);
        true
    }

    /// Destroy every owned GPU resource
    pub fn release<B: GraphicsBackend>(&mut self, backend: &mut B) {
        if let Some(mesh) = self.mesh.take() {
            mesh.destroy(backend);
        }
        if let Some(texture) = self.height_texture.take() {
            texture.destroy(backend);
        }
        if let Some(texture) = self.diffuse_texture.take() {
            texture.destroy(backend);
        }
        self.mesh_resolution = 0;
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct HeightFieldUniform {
    view_proj: Mat4,
    height_scale: f32,
    _padding: [f32; 3],
}

/// Pipeline state of the lab
struct HeightFieldGpu {
    pipeline: RenderPipelineHandle,
    uniform_buffer: BufferHandle,
    uniform_bind_group: BindGroupHandle,
    texture_layout: BindGroupLayoutHandle,
    texture_bind_group: BindGroupHandle,
    sampler: SamplerHandle,
    depth: DepthTarget,
}

/// Lab rendering a displaced height-field terrain
pub struct HeightFieldLab {
    height_field_path: PathBuf,
    diffuse_path: PathBuf,
    /// Requested tessellation; the mesh is regenerated when it changes
    pub tessellation: i32,
    pub height_scale: f32,
    camera: Camera,
    height_field: HeightField,
    gpu: Option<HeightFieldGpu>,
}

impl HeightFieldLab {
    pub fn new(height_field_path: impl Into<PathBuf>, diffuse_path: impl Into<PathBuf>, tessellation: i32) -> Self {
        Self {
            height_field_path: height_field_path.into(),
            diffuse_path: diffuse_path.into(),
            tessellation,
            height_scale: 0.25,
            camera: Camera::new(
                Vec3::new(0.0, 1.4, 2.2),
                Vec3::ZERO,
                Projection::perspective(45.0, 16.0 / 9.0, 0.01, 100.0),
            ),
            height_field: HeightField::new(),
            gpu: None,
        }
    }

    pub fn height_field(&self) -> &HeightField {
        &self.height_field
    }

    /// Swap in a new height map and rebind it for the next frame
    pub fn reload_height_field<B: GraphicsBackend>(&mut self, backend: &mut B, path: &Path) -> LabResult<()> {
        self.height_field.load_height_field(backend, path)?;
        self.height_field_path = path.to_path_buf();
        self.rebind_textures(backend)
    }

    /// Swap in a new diffuse map and rebind it for the next frame
    pub fn reload_diffuse_texture<B: GraphicsBackend>(&mut self, backend: &mut B, path: &Path) -> LabResult<()> {
        self.height_field.load_diffuse_texture(backend, path)?;
        self.diffuse_path = path.to_path_buf();
        self.rebind_textures(backend)
    }

    fn rebind_textures<B: GraphicsBackend>(&mut self, backend: &mut B) -> LabResult<()> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };

        let bind_group = texture_bind_group(backend, gpu.texture_layout, gpu.sampler, &self.height_field)?;
        let old = std::mem::replace(&mut gpu.texture_bind_group, bind_group);
        backend.destroy_bind_group(old);
        Ok(())
    }

    fn uniform(&self) -> HeightFieldUniform {
        HeightFieldUniform {
            view_proj: self.camera.view_projection_matrix(),
            height_scale: self.height_scale,
            _padding: [0.0; 3],
        }
    }

    fn create_gpu<B: GraphicsBackend>(&self, backend: &mut B, width: u32, height: u32) -> LabResult<HeightFieldGpu> {
        let uniform_layout = uniform_layout(backend, ShaderStageFlags::VERTEX)?;
        let texture_layout = backend.create_bind_group_layout(&[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::VERTEX,
                ty: BindingType::Texture { filterable: false },
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Texture { filterable: true },
            },
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Sampler { filtering: true },
            },
        ])?;

        let pipeline = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Height Field Pipeline".into()),
            shader: HEIGHTFIELD_SHADER.into(),
            vertex_layouts: GridMesh::vertex_layouts(),
            bind_group_layouts: vec![uniform_layout, texture_layout],
            depth_stencil: Some(DepthStencilState {
                format: DepthTarget::FORMAT,
                depth_write_enabled: true,
            }),
            color_targets: vec![ColorTargetState {
                format: backend.swapchain_format(),
                write_mask: ColorWrites::ALL,
            }],
        })?;

        let uniform = self.uniform();
        let uniform_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some("Height Field Uniforms".into()),
                size: std::mem::size_of::<HeightFieldUniform>() as u64,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            },
            bytemuck::bytes_of(&uniform),
        )?;
        let uniform_bind_group = uniform_bind_group(backend, uniform_layout, uniform_buffer)?;

        let sampler = backend.create_sampler(&SamplerSettings::default().descriptor())?;

        let texture_bind_group = texture_bind_group(backend, texture_layout, sampler, &self.height_field)?;

        let depth = DepthTarget::create(backend, width, height)?;

        Ok(HeightFieldGpu {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            texture_bind_group,
            sampler,
            depth,
        })
    }
}

impl<B: GraphicsBackend> Lab<B> for HeightFieldLab {
    fn title(&self) -> &str {
        "Height Field"
    }

    fn init(&mut self, backend: &mut B, width: u32, height: u32) -> LabResult<()> {
        self.camera.set_aspect(width as f32, height as f32);

        if let Err(e) = self.height_field.load_height_field(backend, &self.height_field_path) {
            log::warn!("{}; using a flat height field", e);
        }
        if let Err(e) = self.height_field.load_diffuse_texture(backend, &self.diffuse_path) {
            log::warn!("{}; using a white diffuse texture", e);
        }
        self.height_field.use_fallback_textures(backend)?;

        self.height_field.generate_mesh(backend, self.tessellation)?;

        let gpu = self.create_gpu(backend, width, height)?;
        if let Some(old) = self.gpu.replace(gpu) {
            release_gpu(backend, old);
        }
        Ok(())
    }

    fn resize(&mut self, backend: &mut B, width: u32, height: u32) -> LabResult<()> {
        self.camera.set_aspect(width as f32, height as f32);

        if let Some(gpu) = self.gpu.as_mut() {
            let depth = DepthTarget::create(backend, width, height)?;
            std::mem::replace(&mut gpu.depth, depth).destroy(backend);
        }
        Ok(())
    }

    fn update(&mut self, backend: &mut B) -> LabResult<()> {
        if self.tessellation != self.height_field.mesh_resolution() as i32 {
            if let Err(e) = self.height_field.generate_mesh(backend, self.tessellation) {
                log::warn!("Keeping N={}: {}", self.height_field.mesh_resolution(), e);
                self.tessellation = self.height_field.mesh_resolution() as i32;
            }
        }

        if let Some(gpu) = &self.gpu {
            backend.write_buffer(gpu.uniform_buffer, 0, bytemuck::bytes_of(&self.uniform()));
        }
        Ok(())
    }

    fn render(&mut self, backend: &mut B, frame: &FrameContext) {
        let Some(gpu) = &self.gpu else {
            return;
        };

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Height Field Pass".into()),
            color_attachments: vec![ColorAttachment {
                view: frame.swapchain_view,
                clear_color: CLEAR_COLOR,
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: Some(gpu.depth.attachment()),
        });

        backend.set_viewport(0.0, 0.0, frame.width as f32, frame.height as f32, 0.0, 1.0);
        backend.set_render_pipeline(gpu.pipeline);
        backend.set_bind_group(0, gpu.uniform_bind_group);
        backend.set_bind_group(1, gpu.texture_bind_group);
        self.height_field.submit_triangles(backend);

        backend.end_render_pass();
    }

    fn gui(&mut self, ctx: &egui::Context, state: &AppState) {
        egui::Window::new("Height field")
            .default_pos([10.0, 10.0])
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.add(
                    egui::Slider::new(&mut self.tessellation, 1..=MAX_TESSELLATION)
                        .text("Tessellation")
                        .logarithmic(true),
                );
                ui.add(egui::Slider::new(&mut self.height_scale, 0.0..=1.0).text("Height scale"));
                ui.separator();

                let n = self.height_field.mesh_resolution() as usize;
                ui.label(format!(
                    "{} vertices, {} triangles",
                    (n + 1) * (n + 1),
                    2 * n * n
                ));
                ui.label(state.frame_label());
            });
    }

    fn release(&mut self, backend: &mut B) {
        if let Some(gpu) = self.gpu.take() {
            release_gpu(backend, gpu);
        }
        self.height_field.release(backend);
    }
}

fn texture_bind_group<B: GraphicsBackend>(
    backend: &mut B,
    layout: BindGroupLayoutHandle,
    sampler: SamplerHandle,
    height_field: &HeightField,
) -> LabResult<BindGroupHandle> {
    let (Some(height_texture), Some(diffuse_texture)) = (height_field.height_texture(), height_field.diffuse_texture())
    else {
        return Err(BackendError::TextureCreationFailed("height field textures missing".into()).into());
    };

    Ok(backend.create_bind_group(
        layout,
        &[
            (0, BindGroupEntry::Texture(height_texture.view)),
            (1, BindGroupEntry::Texture(diffuse_texture.view)),
            (2, BindGroupEntry::Sampler(sampler)),
        ],
    )?)
}

fn release_gpu<B: GraphicsBackend>(backend: &mut B, gpu: HeightFieldGpu) {
    backend.destroy_bind_group(gpu.texture_bind_group);
    backend.destroy_bind_group(gpu.uniform_bind_group);
    backend.destroy_sampler(gpu.sampler);
    backend.destroy_buffer(gpu.uniform_buffer);
    gpu.depth.destroy(backend);
}
