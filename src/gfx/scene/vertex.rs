//! # Vertex Data Structures
//!
//! This module defines the interleaved position/normal vertex used both as the
//! GPU vertex format and as the key for vertex welding.

use std::hash::{Hash, Hasher};

/// A 3D vertex with position and normal data.
///
/// # Memory Layout
///
/// The `#[repr(C)]` attribute gives the struct a fixed 24-byte layout of six
/// `f32` values (`px, py, pz, nx, ny, nz`), which is what the GPU vertex
/// buffer expects.
///
/// # Equality
///
/// Two vertices are equal only when their bytes are identical. There is no
/// epsilon: `0.0` and `-0.0` are different vertices, and values that differ in
/// the last bit stay distinct after welding.
///
/// # Examples
///
/// ```no_run
/// use weldview::gfx::scene::vertex::Vertex3D;
///
/// let vertex = Vertex3D::new([0.0, 1.0, 0.0], [0.0, 1.0, 0.0]);
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    /// 3D position coordinates [x, y, z]
    pub position: [f32; 3],
    /// 3D normal vector [nx, ny, nz] for lighting calculations
    pub normal: [f32; 3],
}

impl Vertex3D {
    /// Number of `f32` components in one vertex.
    pub const COMPONENTS: usize = 6;

    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }

    /// Returns the vertex buffer layout for wgpu rendering.
    ///
    /// - Attribute 0: Position (Float32x3) at shader location 0
    /// - Attribute 1: Normal (Float32x3) at shader location 1
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

impl PartialEq for Vertex3D {
    fn eq(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

impl Eq for Vertex3D {}

impl Hash for Vertex3D {
    fn hash<H: Hasher>(&self, state: &mut H) {
        bytemuck::bytes_of(self).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_layout_is_six_floats() {
        assert_eq!(std::mem::size_of::<Vertex3D>(), 6 * std::mem::size_of::<f32>());
        assert_eq!(Vertex3D::desc().array_stride, 24);
    }

    #[test]
    fn test_equality_is_bitwise() {
        let a = Vertex3D::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0]);
        let b = Vertex3D::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0]);
        assert_eq!(a, b);

        // Numerically equal, bitwise different
        let negative_zero = Vertex3D::new([1.0, 2.0, 3.0], [-0.0, 1.0, 0.0]);
        assert_ne!(a, negative_zero);

        let nudged = Vertex3D::new([1.0, 2.0, f32::from_bits(3.0f32.to_bits() + 1)], [0.0, 1.0, 0.0]);
        assert_ne!(a, nudged);
    }

    #[test]
    fn test_hash_agrees_with_equality() {
        let mut set = HashSet::new();
        set.insert(Vertex3D::new([0.5, 0.5, 0.5], [0.0, 0.0, 1.0]));
        set.insert(Vertex3D::new([0.5, 0.5, 0.5], [0.0, 0.0, 1.0]));
        set.insert(Vertex3D::new([0.5, 0.5, 0.5], [0.0, 0.0, -1.0]));
        assert_eq!(set.len(), 2);
    }
}
