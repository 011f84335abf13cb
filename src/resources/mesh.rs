//! Height-field grid mesh generation
//!
//! A [`GridMesh`] is a regular grid of `N x N` cells over `[-1, 1] x [-1, 1]`,
//! two triangles per cell. Positions and UVs are kept in separate parallel
//! arrays so each can be uploaded as its own vertex buffer.

use crate::backend::types::{VertexAttribute, VertexBufferLayout, VertexFormat};
use glam::Vec2;
use thiserror::Error;

/// Mesh generation error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("Invalid tessellation factor {0}: must be at least 1")]
    InvalidTessellation(i32),
    #[error("Tessellation factor {0} needs more vertices than a u32 index can address")]
    TooLarge(i32),
}

/// CPU-side grid mesh: positions, UVs and CCW triangle indices.
///
/// Vertex `(x, y)` lives at linear index `y * (N + 1) + x`. The second
/// position component is the ground-plane `z`; height is applied later.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMesh {
    tessellation: u32,
    positions: Vec<Vec2>,
    uvs: Vec<Vec2>,
    indices: Vec<[u32; 3]>,
}

impl GridMesh {
    /// Generate a grid with `tessellation` triangle edges per side.
    ///
    /// Starting in the lower left corner, every vertex `v` that has a
    /// neighbour to the right and above owns one cell:
    ///
    /// ```text
    /// v+N+1 +-----+ v+N+2
    ///       |\  B |
    ///       | \   |
    ///       |  \  |
    ///       | A \ |
    ///     v +-----+ v+1
    /// ```
    ///
    /// - A connects `v, v+1, v+N+1`
    /// - B connects `v+1, v+N+2, v+N+1`
    pub fn generate(tessellation: i32) -> Result<Self, MeshError> {
        if tessellation < 1 {
            return Err(MeshError::InvalidTessellation(tessellation));
        }

        let n = tessellation as u32;
        let side = n as u64 + 1;
        let vertex_count = side * side;
        if vertex_count > u32::MAX as u64 || usize::try_from(vertex_count).is_err() {
            return Err(MeshError::TooLarge(tessellation));
        }

        let vertex_count = vertex_count as usize;
        let mut positions = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);
        let mut indices = Vec::with_capacity(2 * n as usize * n as usize);

        let mut v: u32 = 0;
        for y in 0..=n {
            let y_pos = y as f32 / n as f32;
            for x in 0..=n {
                let x_pos = x as f32 / n as f32;

                positions.push(Vec2::new(-1.0 + 2.0 * x_pos, -1.0 + 2.0 * y_pos));
                uvs.push(Vec2::new(x_pos, y_pos));

                // The last column and row have no upper-right neighbour.
                if x < n && y < n {
                    indices.push([v, v + 1, v + n + 1]);
                    indices.push([v + 1, v + n + 2, v + n + 1]);
                }

                v += 1;
            }
        }

        Ok(Self {
            tessellation: n,
            positions,
            uvs,
            indices,
        })
    }

    /// Triangle edges per side
    pub fn tessellation(&self) -> u32 {
        self.tessellation
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    /// Calculate vertex count
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Calculate triangle count
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of indices a draw call must submit
    pub fn index_count(&self) -> usize {
        self.indices.len() * 3
    }

    /// Get position data as bytes
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Get UV data as bytes
    pub fn uv_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uvs)
    }

    /// Get index data as bytes, sized by the full `[u32; 3]` triple
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Vertex buffer layouts: positions in slot 0, UVs in slot 1
    pub fn vertex_layouts() -> Vec<VertexBufferLayout> {
        vec![
            VertexBufferLayout {
                array_stride: std::mem::size_of::<Vec2>() as u64,
                attributes: vec![VertexAttribute {
                    location: 0,
                    format: VertexFormat::Float32x2,
                    offset: 0,
                }],
            },
            VertexBufferLayout {
                array_stride: std::mem::size_of::<Vec2>() as u64,
                attributes: vec![VertexAttribute {
                    location: 1,
                    format: VertexFormat::Float32x2,
                    offset: 0,
                }],
            },
        ]
    }
}
