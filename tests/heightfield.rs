//! Height-field resource holder tests against a recording backend

use std::collections::HashSet;
use std::ops::Range;

use terrain_labs::backend::*;
use terrain_labs::labs::{HeightField, HeightFieldLab, Lab};
use terrain_labs::resources::GridMesh;
use terrain_labs::LabError;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    CreateBuffer(BufferHandle, usize),
    CreateTexture(TextureHandle),
    WriteTexture(TextureHandle, u32),
    DestroyBuffer(BufferHandle),
    DestroyTexture(TextureHandle),
    CreateBindGroup(BindGroupHandle, Vec<TextureViewHandle>),
    DestroyBindGroup(BindGroupHandle),
    SetBindGroup(u32, BindGroupHandle),
    SetVertexBuffer(u32, BufferHandle),
    SetIndexBuffer(BufferHandle),
    DrawIndexed(Range<u32>),
    Other(&'static str),
}

/// Backend that records calls and tracks live buffers and textures
#[derive(Default)]
struct RecordingBackend {
    calls: Vec<Call>,
    next_id: u64,
    live_buffers: HashSet<u64>,
    live_textures: HashSet<u64>,
    live_views: HashSet<u64>,
    live_bind_groups: HashSet<u64>,
    /// Fail every buffer creation after this many successes
    fail_buffers_after: Option<usize>,
    buffers_created: usize,
}

impl RecordingBackend {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn gpu_calls(&self) -> usize {
        self.calls.len()
    }

    fn draws(&self) -> Vec<Range<u32>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::DrawIndexed(range) => Some(range.clone()),
                _ => None,
            })
            .collect()
    }

    /// Bind group last set at `index`
    fn bound_group(&self, index: u32) -> BindGroupHandle {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                Call::SetBindGroup(i, group) if *i == index => Some(*group),
                _ => None,
            })
            .unwrap_or_else(|| panic!("nothing bound at group {}", index))
    }

    /// Texture views a bind group was created with
    fn group_views(&self, group: BindGroupHandle) -> Vec<TextureViewHandle> {
        self.calls
            .iter()
            .find_map(|c| match c {
                Call::CreateBindGroup(g, views) if *g == group => Some(views.clone()),
                _ => None,
            })
            .unwrap_or_else(|| panic!("{:?} was never created", group))
    }

    fn position(&self, call: &Call) -> usize {
        self.calls
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("{:?} was never recorded", call))
    }
}

impl GraphicsBackend for RecordingBackend {
    fn resize(&mut self, _width: u32, _height: u32) {}

    fn surface_size(&self) -> (u32, u32) {
        (800, 600)
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        Ok(FrameContext {
            swapchain_view: TextureViewHandle(0),
            width: 800,
            height: 600,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }

    fn create_buffer_init(&mut self, _desc: &BufferDescriptor, data: &[u8]) -> BackendResult<BufferHandle> {
        if self.fail_buffers_after.is_some_and(|limit| self.buffers_created >= limit) {
            return Err(BackendError::BufferCreationFailed("out of buffers".into()));
        }
        self.buffers_created += 1;

        let handle = BufferHandle(self.next());
        self.live_buffers.insert(handle.0);
        self.calls.push(Call::CreateBuffer(handle, data.len()));
        Ok(handle)
    }

    fn write_buffer(&mut self, _buffer: BufferHandle, _offset: u64, _data: &[u8]) {
        self.calls.push(Call::Other("write_buffer"));
    }

    fn create_texture(&mut self, _desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        let handle = TextureHandle(self.next());
        self.live_textures.insert(handle.0);
        self.calls.push(Call::CreateTexture(handle));
        Ok(handle)
    }

    fn create_texture_view(&mut self, _texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        let handle = TextureViewHandle(self.next());
        self.live_views.insert(handle.0);
        Ok(handle)
    }

    fn write_texture(&mut self, texture: TextureHandle, mip_level: u32, _data: &[u8], _width: u32, _height: u32) {
        self.calls.push(Call::WriteTexture(texture, mip_level));
    }

    fn create_sampler(&mut self, _desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        self.calls.push(Call::Other("create_sampler"));
        Ok(SamplerHandle(self.next()))
    }

    fn create_bind_group_layout(&mut self, _entries: &[BindGroupLayoutEntry]) -> BackendResult<BindGroupLayoutHandle> {
        self.calls.push(Call::Other("create_bind_group_layout"));
        Ok(BindGroupLayoutHandle(self.next()))
    }

    fn create_bind_group(
        &mut self,
        _layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        let handle = BindGroupHandle(self.next());
        let views = entries
            .iter()
            .filter_map(|(_, entry)| match entry {
                BindGroupEntry::Texture(view) => Some(*view),
                _ => None,
            })
            .collect();
        self.live_bind_groups.insert(handle.0);
        self.calls.push(Call::CreateBindGroup(handle, views));
        Ok(handle)
    }

    fn create_render_pipeline(&mut self, _desc: &RenderPipelineDescriptor) -> BackendResult<RenderPipelineHandle> {
        self.calls.push(Call::Other("create_render_pipeline"));
        Ok(RenderPipelineHandle(self.next()))
    }

    fn begin_render_pass(&mut self, _desc: &RenderPassDescriptor) {
        self.calls.push(Call::Other("begin_render_pass"));
    }

    fn end_render_pass(&mut self) {
        self.calls.push(Call::Other("end_render_pass"));
    }

    fn set_render_pipeline(&mut self, _pipeline: RenderPipelineHandle) {
        self.calls.push(Call::Other("set_render_pipeline"));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle) {
        self.calls.push(Call::SetBindGroup(index, bind_group));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, _offset: u64) {
        self.calls.push(Call::SetVertexBuffer(slot, buffer));
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, _offset: u64) {
        self.calls.push(Call::SetIndexBuffer(buffer));
    }

    fn set_viewport(&mut self, _x: f32, _y: f32, _width: f32, _height: f32, _min_depth: f32, _max_depth: f32) {
        self.calls.push(Call::Other("set_viewport"));
    }

    fn draw_indexed(&mut self, indices: Range<u32>, _base_vertex: i32, _instances: Range<u32>) {
        self.calls.push(Call::DrawIndexed(indices));
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        assert!(self.live_buffers.remove(&buffer.0), "double free of {:?}", buffer);
        self.calls.push(Call::DestroyBuffer(buffer));
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        assert!(self.live_textures.remove(&texture.0), "double free of {:?}", texture);
        self.calls.push(Call::DestroyTexture(texture));
    }

    fn destroy_texture_view(&mut self, view: TextureViewHandle) {
        assert!(self.live_views.remove(&view.0), "double free of {:?}", view);
    }

    fn destroy_sampler(&mut self, _sampler: SamplerHandle) {}

    fn destroy_bind_group(&mut self, bind_group: BindGroupHandle) {
        assert!(self.live_bind_groups.remove(&bind_group.0), "double free of {:?}", bind_group);
        self.calls.push(Call::DestroyBindGroup(bind_group));
    }
}

#[test]
fn invalid_tessellation_makes_no_gpu_calls() {
    let mut backend = RecordingBackend::default();
    let mut field = HeightField::new();

    for n in [0, -1, i32::MIN] {
        let err = field.generate_mesh(&mut backend, n).unwrap_err();
        assert!(matches!(err, LabError::Mesh(_)));
    }

    assert_eq!(backend.gpu_calls(), 0);
    assert!(field.mesh().is_none());
    assert_eq!(field.mesh_resolution(), 0);
}

#[test]
fn generate_uploads_three_buffers_with_full_index_footprint() {
    let mut backend = RecordingBackend::default();
    let mut field = HeightField::new();

    field.generate_mesh(&mut backend, 4).unwrap();

    let expected = GridMesh::generate(4).unwrap();
    let sizes: Vec<usize> = backend
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::CreateBuffer(_, size) => Some(*size),
            _ => None,
        })
        .collect();
    assert_eq!(
        sizes,
        vec![25 * 8, 25 * 8, expected.triangle_count() * 3 * std::mem::size_of::<u32>()]
    );

    let mesh = field.mesh().unwrap();
    assert_eq!(mesh.index_count, 96);
    assert_eq!(mesh.tessellation, 4);
    assert_eq!(field.mesh_resolution(), 4);
}

#[test]
fn regenerate_destroys_old_buffers_after_creating_new_ones() {
    let mut backend = RecordingBackend::default();
    let mut field = HeightField::new();

    field.generate_mesh(&mut backend, 2).unwrap();
    let old = field.mesh().map(|m| (m.positions, m.uvs, m.indices)).unwrap();
    backend.calls.clear();

    field.generate_mesh(&mut backend, 8).unwrap();
    let new = field.mesh().unwrap();

    let last_create = backend.position(&Call::CreateBuffer(new.indices, 8 * 8 * 2 * 12));
    for buffer in [old.0, old.1, old.2] {
        assert!(backend.position(&Call::DestroyBuffer(buffer)) > last_create);
        assert!(!backend.live_buffers.contains(&buffer.0));
    }
    assert_eq!(backend.live_buffers.len(), 3);
    assert_eq!(field.mesh_resolution(), 8);
}

#[test]
fn invalid_regeneration_keeps_current_mesh() {
    let mut backend = RecordingBackend::default();
    let mut field = HeightField::new();

    field.generate_mesh(&mut backend, 3).unwrap();
    let before = field.mesh().map(|m| m.indices).unwrap();

    assert!(field.generate_mesh(&mut backend, 0).is_err());
    assert_eq!(field.mesh().map(|m| m.indices), Some(before));
    assert_eq!(field.mesh_resolution(), 3);
}

#[test]
fn failed_upload_leaks_nothing_and_keeps_current_mesh() {
    let mut backend = RecordingBackend::default();
    let mut field = HeightField::new();

    field.generate_mesh(&mut backend, 3).unwrap();
    // The second mesh gets its position buffer, then the UV buffer fails.
    backend.fail_buffers_after = Some(4);

    let err = field.generate_mesh(&mut backend, 5).unwrap_err();
    assert!(matches!(err, LabError::Backend(BackendError::BufferCreationFailed(_))));
    assert_eq!(backend.live_buffers.len(), 3);
    assert_eq!(field.mesh_resolution(), 3);
}

#[test]
fn submit_without_mesh_draws_nothing() {
    let mut backend = RecordingBackend::default();
    let field = HeightField::new();

    assert!(!field.submit_triangles(&mut backend));
    assert!(backend.draws().is_empty());
    assert_eq!(backend.gpu_calls(), 0);
}

#[test]
fn submit_binds_buffers_and_draws_every_triangle() {
    let mut backend = RecordingBackend::default();
    let mut field = HeightField::new();

    for n in [1, 2, 7] {
        field.generate_mesh(&mut backend, n).unwrap();
        backend.calls.clear();

        assert!(field.submit_triangles(&mut backend));
        let mesh = field.mesh().unwrap();
        let triangle_count = GridMesh::generate(n).unwrap().triangle_count() as u32;

        assert_eq!(
            backend.calls,
            vec![
                Call::SetVertexBuffer(0, mesh.positions),
                Call::SetVertexBuffer(1, mesh.uvs),
                Call::SetIndexBuffer(mesh.indices),
                Call::DrawIndexed(0..triangle_count * 3),
            ]
        );
    }
}

#[test]
fn missing_images_leave_textures_unset() {
    let mut backend = RecordingBackend::default();
    let mut field = HeightField::new();
    let missing = std::env::temp_dir().join("terrain_labs_missing_height_field.png");

    let err = field.load_height_field(&mut backend, &missing).unwrap_err();
    assert!(matches!(err, LabError::Texture(_)));
    assert!(field.load_diffuse_texture(&mut backend, &missing).is_err());

    assert!(field.height_texture().is_none());
    assert!(field.diffuse_texture().is_none());
    assert_eq!(backend.gpu_calls(), 0);

    // Mesh generation does not depend on the images.
    field.generate_mesh(&mut backend, 2).unwrap();
    assert!(field.mesh().is_some());
}

#[test]
fn loaded_textures_upload_every_mip_level() {
    let mut backend = RecordingBackend::default();
    let mut field = HeightField::new();

    let dir = std::env::temp_dir();
    let height_path = dir.join(format!("terrain_labs_it_height_{}.png", std::process::id()));
    let diffuse_path = dir.join(format!("terrain_labs_it_diffuse_{}.png", std::process::id()));
    image::GrayImage::from_pixel(8, 8, image::Luma([128])).save(&height_path).unwrap();
    image::RgbImage::from_pixel(8, 4, image::Rgb([200, 100, 50])).save(&diffuse_path).unwrap();

    field.load_height_field(&mut backend, &height_path).unwrap();
    field.load_diffuse_texture(&mut backend, &diffuse_path).unwrap();

    let height = field.height_texture().unwrap().handle;
    let diffuse = field.diffuse_texture().unwrap().handle;
    let levels = |texture| {
        backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::WriteTexture(t, _) if *t == texture))
            .count()
    };
    assert_eq!(levels(height), 1);
    assert_eq!(levels(diffuse), 4);
    assert_eq!(field.height_field_path(), Some(height_path.as_path()));

    // Reloading replaces the texture and frees the previous one.
    field.load_height_field(&mut backend, &height_path).unwrap();
    assert!(!backend.live_textures.contains(&height.0));
    assert_eq!(backend.live_textures.len(), 2);

    std::fs::remove_file(height_path).ok();
    std::fs::remove_file(diffuse_path).ok();
}

#[test]
fn release_frees_everything() {
    let mut backend = RecordingBackend::default();
    let mut field = HeightField::new();

    field.use_fallback_textures(&mut backend).unwrap();
    field.generate_mesh(&mut backend, 6).unwrap();
    assert_eq!(backend.live_buffers.len(), 3);
    assert_eq!(backend.live_textures.len(), 2);

    field.release(&mut backend);
    assert!(backend.live_buffers.is_empty());
    assert!(backend.live_textures.is_empty());
    assert!(backend.live_views.is_empty());
    assert!(field.mesh().is_none());
    assert_eq!(field.mesh_resolution(), 0);

    // Releasing twice is a no-op.
    field.release(&mut backend);
}

#[test]
fn lab_renders_with_fallback_textures_and_regenerates_from_settings() {
    let mut backend = RecordingBackend::default();
    let missing = std::env::temp_dir().join("terrain_labs_missing_lab_map.png");
    let mut lab = HeightFieldLab::new(&missing, &missing, 4);

    lab.init(&mut backend, 800, 600).unwrap();
    assert_eq!(lab.height_field().mesh_resolution(), 4);

    let frame = backend.begin_frame().unwrap();
    backend.calls.clear();
    lab.render(&mut backend, &frame);
    assert_eq!(backend.draws(), vec![0..4 * 4 * 6]);

    lab.tessellation = 16;
    lab.update(&mut backend).unwrap();
    assert_eq!(lab.height_field().mesh_resolution(), 16);

    lab.tessellation = 0;
    lab.update(&mut backend).unwrap();
    assert_eq!(lab.tessellation, 16);

    lab.release(&mut backend);
    assert!(backend.live_buffers.is_empty());
    assert!(backend.live_textures.is_empty());
    assert!(backend.live_views.is_empty());
    assert!(backend.live_bind_groups.is_empty());
}

#[test]
fn reloading_maps_rebinds_live_textures() {
    let mut backend = RecordingBackend::default();
    let dir = std::env::temp_dir();
    let missing = dir.join("terrain_labs_missing_reload_map.png");
    let height_path = dir.join(format!("terrain_labs_reload_height_{}.png", std::process::id()));
    let diffuse_path = dir.join(format!("terrain_labs_reload_diffuse_{}.png", std::process::id()));
    image::GrayImage::from_pixel(4, 4, image::Luma([64])).save(&height_path).unwrap();
    image::RgbImage::from_pixel(4, 4, image::Rgb([10, 200, 30])).save(&diffuse_path).unwrap();

    let mut lab = HeightFieldLab::new(&missing, &missing, 2);
    lab.init(&mut backend, 800, 600).unwrap();
    let frame = backend.begin_frame().unwrap();
    lab.render(&mut backend, &frame);
    let fallback_group = backend.bound_group(1);

    lab.reload_height_field(&mut backend, &height_path).unwrap();
    let height_view = lab.height_field().height_texture().unwrap().view;
    lab.render(&mut backend, &frame);
    let height_group = backend.bound_group(1);

    assert_ne!(height_group, fallback_group);
    assert!(!backend.live_bind_groups.contains(&fallback_group.0));
    assert!(
        backend.position(&Call::DestroyBindGroup(fallback_group))
            > backend.position(&Call::CreateBindGroup(height_group, backend.group_views(height_group)))
    );
    assert!(backend.group_views(height_group).contains(&height_view));

    lab.reload_diffuse_texture(&mut backend, &diffuse_path).unwrap();
    let diffuse_view = lab.height_field().diffuse_texture().unwrap().view;
    lab.render(&mut backend, &frame);
    let diffuse_group = backend.bound_group(1);

    let views = backend.group_views(diffuse_group);
    assert_eq!(views, vec![height_view, diffuse_view]);
    assert!(views.iter().all(|view| backend.live_views.contains(&view.0)));

    // A failed reload keeps the current binding.
    assert!(lab.reload_height_field(&mut backend, &missing).is_err());
    assert!(backend.live_bind_groups.contains(&diffuse_group.0));

    lab.release(&mut backend);
    assert!(backend.live_bind_groups.is_empty());
    assert!(backend.live_views.is_empty());

    std::fs::remove_file(height_path).ok();
    std::fs::remove_file(diffuse_path).ok();
}
