//! Main engine orchestrator
//!
//! Owns the window, the wgpu backend, the GUI overlay and one lab, and
//! drives them from the winit event loop.

use crate::backend::traits::*;
use crate::backend::wgpu_backend::WgpuBackend;
use crate::egui_integration::WgpuEguiIntegration;
use crate::labs::Lab;
use crate::state::AppState;
use crate::window::{action_for_event, Window, WindowAction};
use crate::{LabConfig, LabError, LabResult};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
};

/// Runs a single lab inside a window
pub struct Engine<L: Lab<WgpuBackend>> {
    backend: WgpuBackend,
    window: Window,
    egui: WgpuEguiIntegration,
    lab: L,
    state: AppState,
    released: bool,
}

impl<L: Lab<WgpuBackend>> Engine<L> {
    /// Create the backend for `window` and initialize the lab
    pub fn new(window: Window, mut lab: L, vsync: bool) -> LabResult<Self> {
        let mut backend = WgpuBackend::new(window.window_arc(), vsync)?;
        log::info!("Running {} on {}", lab.title(), backend.adapter_name());

        let mut egui = WgpuEguiIntegration::new(&backend, window.window());
        let (window_width, window_height) = window.dimensions();
        let (width, height) = backend.surface_size();
        egui.set_surface_scale(window_width, window_height, width, height);

        lab.init(&mut backend, width, height)?;
        log::info!("Press G to show the controls, Escape to quit");

        Ok(Self {
            backend,
            window,
            egui,
            lab,
            state: AppState::new(),
            released: false,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Handle window resize
    pub fn resize(&mut self, width: u32, height: u32) -> LabResult<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        self.backend.resize(width, height);

        // The surface may be clamped to device limits
        let (actual_width, actual_height) = self.backend.surface_size();
        self.egui
            .set_surface_scale(width, height, actual_width, actual_height);
        self.lab.resize(&mut self.backend, actual_width, actual_height)
    }

    /// Build the GUI, update the lab and present one frame
    pub fn render_frame(&mut self) -> LabResult<()> {
        self.state.tick();

        if self.state.show_ui {
            let Self {
                egui,
                window,
                lab,
                state,
                ..
            } = self;
            egui.run(window.window(), |ctx| lab.gui(ctx, state));
        }

        self.lab.update(&mut self.backend)?;

        let frame = match self.backend.begin_frame() {
            Ok(frame) => frame,
            Err(BackendError::SurfaceLost) => {
                log::debug!("Surface lost, reconfiguring and skipping the frame");
                let (width, height) = self.window.dimensions();
                return self.resize(width, height);
            }
            Err(e) => return Err(e.into()),
        };

        self.lab.render(&mut self.backend, &frame);

        if self.state.show_ui {
            self.egui.render(&mut self.backend, frame.swapchain_view);
        }

        self.backend.end_frame()?;
        Ok(())
    }

    fn handle_window_event(
        &mut self,
        event: &WindowEvent,
        elwt: &EventLoopWindowTarget<()>,
    ) -> LabResult<()> {
        // Pass events to egui first
        let egui_consumed = self.egui.on_window_event(self.window.window(), event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down");
                elwt.exit();
            }
            WindowEvent::Resized(_) => {
                if let Some((width, height)) = self.window.handle_event(event) {
                    self.resize(width, height)?;
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame()?;
            }
            WindowEvent::KeyboardInput { event, .. }
                if !egui_consumed && !self.egui.wants_keyboard_input() =>
            {
                match action_for_event(event) {
                    Some(WindowAction::Quit) => elwt.exit(),
                    Some(WindowAction::ToggleUi) => self.state.toggle_ui(),
                    None => {}
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Destroy the lab's GPU resources
    pub fn release(&mut self) {
        if !self.released {
            self.lab.release(&mut self.backend);
            self.released = true;
        }
    }
}

/// Open a window for `lab` and run it until the window closes
pub fn run<L: Lab<WgpuBackend>>(config: &LabConfig, lab: L) -> LabResult<()> {
    let event_loop = EventLoop::new()?;
    let title = format!("{} - {}", config.title, lab.title());
    let window = Window::new(&event_loop, &title, config.width, config.height)?;
    let mut engine = Engine::new(window, lab, config.vsync)?;

    let mut failure: Option<LabError> = None;

    event_loop.run(|event, elwt: &EventLoopWindowTarget<()>| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => {
                if let Err(e) = engine.handle_window_event(&event, elwt) {
                    log::error!("{}", e);
                    failure = Some(e);
                    elwt.exit();
                }
            }
            Event::AboutToWait => {
                engine.window.request_redraw();
            }
            Event::LoopExiting => {
                engine.release();
            }
            _ => {}
        }
    })?;

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
