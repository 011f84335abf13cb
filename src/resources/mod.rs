//! Resource management
//!
//! Grid meshes, textures, and sampler settings.

mod mesh;
mod sampler;
mod texture;

pub use mesh::*;
pub use sampler::*;
pub use texture::*;
