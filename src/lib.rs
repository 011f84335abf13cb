//! Terrain Labs - small wgpu teaching labs built around a height-field grid
//!
//! Two labs ship as binaries:
//! - **textured_quad**: a long ground quad for comparing texture filtering,
//!   mipmapping and anisotropy at runtime
//! - **heightfield**: a tessellated grid displaced by a height map and
//!   coloured by a diffuse map
//!
//! # Features
//! - Height-field grid generation with counter-clockwise triangles
//! - Image loading for float height maps and RGB diffuse maps
//! - CPU mip chain generation
//! - Backend abstraction with a wgpu implementation
//! - egui control panels, toggled with `G`

pub mod backend;
pub mod egui_integration;
pub mod engine;
pub mod labs;
pub mod resources;
pub mod scene;
pub mod state;
pub mod window;

pub use egui_integration::WgpuEguiIntegration;
pub use engine::Engine;
pub use labs::Lab;
pub use state::AppState;
pub use window::Window;

// Re-export wgpu backend for direct access
pub use backend::wgpu_backend::WgpuBackend;

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for running a lab
#[derive(Error, Debug)]
pub enum LabError {
    #[error(transparent)]
    Backend(#[from] backend::BackendError),
    #[error(transparent)]
    Mesh(#[from] resources::MeshError),
    #[error(transparent)]
    Texture(#[from] resources::TextureError),
    #[error("Event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}

pub type LabResult<T> = Result<T, LabError>;

/// Configuration for running a lab
#[derive(Debug, Clone)]
pub struct LabConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Initial height-field tessellation (edges per side)
    pub tessellation: i32,
    /// Height map for the height-field lab
    pub height_field_path: PathBuf,
    /// Diffuse map for the height-field lab
    pub diffuse_path: PathBuf,
    /// Texture for the textured quad lab
    pub texture_path: PathBuf,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            title: "Terrain Labs".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            tessellation: 64,
            height_field_path: PathBuf::from("scenes/nlsFinland/L3123F.png"),
            diffuse_path: PathBuf::from("scenes/nlsFinland/L3123F_downscaled.jpg"),
            texture_path: PathBuf::from("scenes/textures/asphalt.jpg"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LabConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(config.vsync);
        assert!(config.tessellation >= 1);
    }

    #[test]
    fn test_error_conversion() {
        let err: LabError = resources::MeshError::InvalidTessellation(0).into();
        assert!(matches!(err, LabError::Mesh(_)));
        assert_eq!(err.to_string(), "Invalid tessellation factor 0: must be at least 1");

        let err: LabError = backend::BackendError::SurfaceLost.into();
        assert_eq!(err.to_string(), "Surface lost");
    }
}
