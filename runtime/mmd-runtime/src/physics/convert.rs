//! glam and nalgebra conversions at the rapier boundary

use glam::{Mat4, Quat, Vec3};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};

pub fn to_vector(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

pub fn from_vector(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Rigid part of a matrix as an isometry. Scale is dropped; a matrix
/// that does not decompose to finite values becomes identity.
pub fn to_isometry(matrix: Mat4) -> Isometry3<f32> {
    let (_, rotation, translation) = matrix.to_scale_rotation_translation();
    if !rotation.is_finite() || !translation.is_finite() {
        return Isometry3::identity();
    }
    Isometry3::from_parts(
        Translation3::new(translation.x, translation.y, translation.z),
        UnitQuaternion::new_normalize(Quaternion::new(
            rotation.w, rotation.x, rotation.y, rotation.z,
        )),
    )
}

pub fn to_mat4(isometry: &Isometry3<f32>) -> Mat4 {
    let t = isometry.translation.vector;
    let q = isometry.rotation.coords;
    Mat4::from_rotation_translation(Quat::from_xyzw(q.x, q.y, q.z, q.w), Vec3::new(t.x, t.y, t.z))
}

/// Inverse of a matrix, identity when it is not invertible.
pub fn inverse_or_identity(matrix: Mat4) -> Mat4 {
    let determinant = matrix.determinant();
    if determinant.is_finite() && determinant.abs() > f32::EPSILON {
        matrix.inverse()
    } else {
        Mat4::IDENTITY
    }
}
