use cgmath::{Matrix4, SquareMatrix, Vector3};

/// Per-frame shader constants.
///
/// Field order and padding match the `FrameConstants` uniform block in
/// `shader.wgsl`. Positions and colours are widened to four components to
/// satisfy the 16 byte alignment of uniform members.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameConstants {
    /// Object to world transform.
    pub world: [[f32; 4]; 4],
    /// Object to clip space transform.
    pub world_view_projection: [[f32; 4]; 4],
    pub object_color: [f32; 3],
    pub object_shininess: f32,
    pub light_position: [f32; 4],
    pub light_color: [f32; 4],
    pub camera_position: [f32; 4],
}

impl Default for FrameConstants {
    fn default() -> Self {
        let identity = convert_matrix4_to_array(Matrix4::identity());
        Self {
            world: identity,
            world_view_projection: identity,
            object_color: [1.0; 3],
            object_shininess: 1.0,
            light_position: [0.0, 0.0, 0.0, 1.0],
            light_color: [1.0; 4],
            camera_position: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl FrameConstants {
    /// Byte size of the record before any device alignment is applied.
    pub const SIZE: u64 = std::mem::size_of::<FrameConstants>() as u64;

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}

/// Homogeneous point with `w = 1`.
pub fn point_to_array(point: Vector3<f32>) -> [f32; 4] {
    [point.x, point.y, point.z, 1.0]
}
