//! Per-application state shared by every lab

use std::collections::VecDeque;
use std::time::Instant;

/// Number of frames averaged for the FPS readout
const FRAME_HISTORY: usize = 60;

/// Application state owned by the event loop
#[derive(Debug)]
pub struct AppState {
    /// Whether the GUI overlay is drawn; hidden until `G` is pressed
    pub show_ui: bool,
    frame_times: VecDeque<f32>,
    last_frame: Instant,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            show_ui: false,
            frame_times: VecDeque::with_capacity(FRAME_HISTORY),
            last_frame: Instant::now(),
        }
    }

    pub fn toggle_ui(&mut self) {
        self.show_ui = !self.show_ui;
        log::debug!("GUI overlay {}", if self.show_ui { "shown" } else { "hidden" });
    }

    /// Measure the time since the previous call and record it
    pub fn tick(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.record_frame(dt);
    }

    /// Record one frame duration in seconds
    pub fn record_frame(&mut self, dt: f32) {
        if !dt.is_finite() || dt < 0.0 {
            return;
        }
        if self.frame_times.len() >= FRAME_HISTORY {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(dt);
    }

    /// Average frame time in milliseconds over the recent history
    pub fn average_frame_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        1000.0 * self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
    }

    pub fn fps(&self) -> f32 {
        let ms = self.average_frame_ms();
        if ms > 0.0 {
            1000.0 / ms
        } else {
            0.0
        }
    }

    /// One-line readout used by the lab panels
    pub fn frame_label(&self) -> String {
        format!(
            "Frame time {:.3} ms ({:.1} FPS)",
            self.average_frame_ms(),
            self.fps()
        )
    }
}
