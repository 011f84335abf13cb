//! Window management using winit

use std::sync::Arc;
use winit::{
    dpi::PhysicalSize,
    error::OsError,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window as WinitWindow, WindowBuilder},
};

/// Application-level response to a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    Quit,
    ToggleUi,
}

/// Map a key to the action it triggers.
///
/// Escape quits on press. G toggles the overlay once per press and ignores
/// auto-repeat.
pub fn action_for_key(key: PhysicalKey, state: ElementState, repeat: bool) -> Option<WindowAction> {
    if state != ElementState::Pressed {
        return None;
    }

    match key {
        PhysicalKey::Code(KeyCode::Escape) => Some(WindowAction::Quit),
        PhysicalKey::Code(KeyCode::KeyG) if !repeat => Some(WindowAction::ToggleUi),
        _ => None,
    }
}

/// Shorthand for [`action_for_key`] on a winit key event
pub fn action_for_event(event: &KeyEvent) -> Option<WindowAction> {
    action_for_key(event.physical_key, event.state, event.repeat)
}

/// Wrapper around winit window with additional state
pub struct Window {
    window: Arc<WinitWindow>,
    width: u32,
    height: u32,
}

impl Window {
    /// Create a new window with the given title and dimensions
    pub fn new(event_loop: &EventLoop<()>, title: &str, width: u32, height: u32) -> Result<Self, OsError> {
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(title)
                .with_inner_size(PhysicalSize::new(width, height))
                .build(event_loop)?,
        );

        let size = window.inner_size();
        Ok(Self {
            window,
            width: size.width,
            height: size.height,
        })
    }

    /// Get the raw window
    pub fn window(&self) -> &WinitWindow {
        &self.window
    }

    /// Get arc reference to window for backend initialization
    pub fn window_arc(&self) -> Arc<WinitWindow> {
        Arc::clone(&self.window)
    }

    /// Get current window dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Track size changes, returning the new size on resize
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<(u32, u32)> {
        match event {
            WindowEvent::Resized(size) => {
                self.width = size.width;
                self.height = size.height;
                Some((size.width, size.height))
            }
            _ => None,
        }
    }

    /// Request a redraw
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quits() {
        assert_eq!(
            action_for_key(PhysicalKey::Code(KeyCode::Escape), ElementState::Pressed, false),
            Some(WindowAction::Quit)
        );
        assert_eq!(
            action_for_key(PhysicalKey::Code(KeyCode::Escape), ElementState::Released, false),
            None
        );
    }

    #[test]
    fn test_g_toggles_once_per_press() {
        let g = PhysicalKey::Code(KeyCode::KeyG);
        assert_eq!(action_for_key(g, ElementState::Pressed, false), Some(WindowAction::ToggleUi));
        assert_eq!(action_for_key(g, ElementState::Pressed, true), None);
        assert_eq!(action_for_key(g, ElementState::Released, false), None);
    }

    #[test]
    fn test_other_keys_are_ignored() {
        assert_eq!(
            action_for_key(PhysicalKey::Code(KeyCode::KeyW), ElementState::Pressed, false),
            None
        );
    }
}
