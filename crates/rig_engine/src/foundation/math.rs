//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the handful of matrix builders the
//! renderer and the animation evaluator share.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix4,
    Quaternion,
    UnitQuaternion,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type (column-major, matching OpenGL uniform layout)
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Build a pure translation matrix
pub fn translation(offset: &Vec3) -> Mat4 {
    Mat4::new_translation(offset)
}

/// Build a pure rotation matrix from a unit quaternion
pub fn rotation(orientation: &Quat) -> Mat4 {
    orientation.to_homogeneous()
}

/// Build a quaternion from raw `[x, y, z, w]` components, normalizing it
pub fn quat_from_xyzw(xyzw: [f32; 4]) -> Quat {
    Quat::from_quaternion(Quaternion::new(xyzw[3], xyzw[0], xyzw[1], xyzw[2]))
}

/// Flatten matrices into the column-major float layout uniform uploads expect
pub fn flatten_matrices(matrices: &[Mat4]) -> Vec<f32> {
    matrices
        .iter()
        .flat_map(|matrix| matrix.as_slice().iter().copied())
        .collect()
}
