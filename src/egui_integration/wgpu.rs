//! wgpu egui integration
//!
//! Draws the lab control panels on top of the rendered frame.

use egui::ViewportId;
use egui_wgpu::ScreenDescriptor;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::backend::traits::{GraphicsBackend, TextureViewHandle};
use crate::backend::wgpu_backend::WgpuBackend;

/// wgpu-specific egui integration
pub struct WgpuEguiIntegration {
    /// egui context (shared state for UI)
    ctx: egui::Context,
    /// egui-winit state for input handling
    winit_state: egui_winit::State,
    /// egui-wgpu renderer for drawing
    renderer: egui_wgpu::Renderer,
    /// Cached paint jobs from last frame
    paint_jobs: Vec<egui::ClippedPrimitive>,
    /// Cached textures delta
    textures_delta: egui::TexturesDelta,
    /// Scale factor for input coordinates (surface size / window size)
    input_scale: f32,
}

impl WgpuEguiIntegration {
    /// Create a new egui integration instance
    pub fn new(backend: &WgpuBackend, window: &Window) -> Self {
        let ctx = egui::Context::default();

        let winit_state = egui_winit::State::new(
            ctx.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );

        let renderer = egui_wgpu::Renderer::new(
            backend.device(),
            backend.wgpu_surface_format(),
            None,
            1,
        );

        Self {
            ctx,
            winit_state,
            renderer,
            paint_jobs: Vec::new(),
            textures_delta: egui::TexturesDelta::default(),
            input_scale: 1.0,
        }
    }

    /// Track how much smaller the surface is than the window.
    ///
    /// The backend may clamp the surface to device limits; pointer
    /// positions are scaled by the same factor.
    pub fn set_surface_scale(
        &mut self,
        window_width: u32,
        window_height: u32,
        surface_width: u32,
        surface_height: u32,
    ) {
        if window_width == 0 || window_height == 0 {
            return;
        }
        let scale_x = surface_width as f32 / window_width as f32;
        let scale_y = surface_height as f32 / window_height as f32;
        self.input_scale = scale_x.min(scale_y);
    }

    /// Handle a winit window event, returning whether egui consumed it
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let scaled_event = match event {
            WindowEvent::CursorMoved {
                device_id,
                position,
            } if self.input_scale != 1.0 => Some(WindowEvent::CursorMoved {
                device_id: *device_id,
                position: winit::dpi::PhysicalPosition::new(
                    position.x * self.input_scale as f64,
                    position.y * self.input_scale as f64,
                ),
            }),
            _ => None,
        };

        let response = self
            .winit_state
            .on_window_event(window, scaled_event.as_ref().unwrap_or(event));
        response.consumed
    }

    /// Run one egui frame, building the UI with `build`
    pub fn run(&mut self, window: &Window, build: impl FnOnce(&egui::Context)) {
        let mut raw_input = self.winit_state.take_egui_input(window);

        if self.input_scale != 1.0 {
            if let Some(rect) = &mut raw_input.screen_rect {
                rect.max.x *= self.input_scale;
                rect.max.y *= self.input_scale;
            }
        }

        let full_output = self.ctx.run(raw_input, |ctx| build(ctx));

        self.winit_state
            .handle_platform_output(window, full_output.platform_output);

        self.paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        self.textures_delta.append(full_output.textures_delta);
    }

    /// Render the last built frame into the swapchain view
    pub fn render(&mut self, backend: &mut WgpuBackend, swapchain_view: TextureViewHandle) {
        let (width, height) = backend.surface_size();
        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: self.ctx.pixels_per_point(),
        };

        let (device, queue, encoder) = backend.device_queue_encoder();

        for (id, image_delta) in &self.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        if let Some(encoder) = encoder {
            self.renderer.update_buffers(
                device,
                queue,
                encoder,
                &self.paint_jobs,
                &screen_descriptor,
            );
        }

        backend.render_egui(
            &self.renderer,
            &self.paint_jobs,
            &screen_descriptor,
            swapchain_view,
        );

        for id in &self.textures_delta.free {
            self.renderer.free_texture(id);
        }

        self.textures_delta = egui::TexturesDelta::default();
        self.paint_jobs.clear();
    }

    /// Check if egui wants keyboard input
    pub fn wants_keyboard_input(&self) -> bool {
        self.ctx.wants_keyboard_input()
    }
}
