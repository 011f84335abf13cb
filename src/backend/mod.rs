//! Backend abstraction layer
//!
//! Provides the traits and types the labs render through, plus the wgpu implementation.

pub mod traits;
pub mod types;
pub mod wgpu_backend;

pub use traits::*;
pub use types::*;
