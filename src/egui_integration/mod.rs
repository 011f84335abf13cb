//! egui GUI integration
//!
//! Provides egui rendering support for the wgpu backend.

mod wgpu;

pub use self::wgpu::WgpuEguiIntegration;
