//! Teaching labs
//!
//! Each lab owns its GPU resources and GUI settings; the engine drives it
//! through the [`Lab`] trait.

pub mod heightfield;
pub mod textured_quad;

pub use heightfield::{GpuGridMesh, HeightField, HeightFieldLab};
pub use textured_quad::TexturedQuadLab;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::state::AppState;
use crate::LabResult;

/// Background colour shared by both labs
pub const CLEAR_COLOR: [f32; 4] = [0.2, 0.2, 0.8, 1.0];

/// A lab the engine can run
pub trait Lab<B: GraphicsBackend> {
    /// Window title
    fn title(&self) -> &str;

    /// Create GPU resources for a surface of the given size
    fn init(&mut self, backend: &mut B, width: u32, height: u32) -> LabResult<()>;

    /// Recreate size-dependent resources
    fn resize(&mut self, backend: &mut B, width: u32, height: u32) -> LabResult<()>;

    /// Apply settings changed in the GUI and refresh uniforms
    fn update(&mut self, backend: &mut B) -> LabResult<()>;

    /// Record the lab's render pass into the current frame
    fn render(&mut self, backend: &mut B, frame: &FrameContext);

    /// Build the lab's control panel
    fn gui(&mut self, ctx: &egui::Context, state: &AppState);

    /// Destroy every GPU resource the lab owns
    fn release(&mut self, backend: &mut B);
}

/// Depth buffer matching the surface size
pub struct DepthTarget {
    pub texture: TextureHandle,
    pub view: TextureViewHandle,
}

impl DepthTarget {
    pub const FORMAT: TextureFormat = TextureFormat::Depth32Float;

    pub fn create<B: GraphicsBackend>(backend: &mut B, width: u32, height: u32) -> BackendResult<Self> {
        let texture = backend.create_texture(&TextureDescriptor {
            label: Some("Depth Buffer".into()),
            width: width.max(1),
            height: height.max(1),
            mip_levels: 1,
            format: Self::FORMAT,
            usage: TextureUsage::RENDER_ATTACHMENT,
        })?;

        match backend.create_texture_view(texture) {
            Ok(view) => Ok(Self { texture, view }),
            Err(e) => {
                backend.destroy_texture(texture);
                Err(e)
            }
        }
    }

    pub fn destroy<B: GraphicsBackend>(self, backend: &mut B) {
        backend.destroy_texture_view(self.view);
        backend.destroy_texture(self.texture);
    }

    pub fn attachment(&self) -> DepthStencilAttachment {
        DepthStencilAttachment {
            view: self.view,
            depth_store_op: StoreOp::Discard,
            depth_clear_value: 1.0,
        }
    }
}

/// Layout for a uniform buffer at binding 0
pub(crate) fn uniform_layout<B: GraphicsBackend>(
    backend: &mut B,
    visibility: ShaderStageFlags,
) -> BackendResult<BindGroupLayoutHandle> {
    backend.create_bind_group_layout(&[BindGroupLayoutEntry {
        binding: 0,
        visibility,
        ty: BindingType::UniformBuffer,
    }])
}

/// Bind a whole buffer at binding 0
pub(crate) fn uniform_bind_group<B: GraphicsBackend>(
    backend: &mut B,
    layout: BindGroupLayoutHandle,
    buffer: BufferHandle,
) -> BackendResult<BindGroupHandle> {
    backend.create_bind_group(
        layout,
        &[(
            0,
            BindGroupEntry::Buffer {
                buffer,
                offset: 0,
                size: None,
            },
        )],
    )
}
