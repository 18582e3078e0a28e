//! Formatting utilities

use glam::{EulerRot, Quat, Vec3};
use humansize::{DECIMAL, format_size};

/// Format file size in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a vector with fixed precision
pub fn format_vec3(v: Vec3) -> String {
    format!("({:.3}, {:.3}, {:.3})", v.x, v.y, v.z)
}

/// Format a rotation as X, Y, Z Euler angles in degrees
pub fn format_rotation(q: Quat) -> String {
    let (x, y, z) = q.to_euler(EulerRot::XYZ);
    format!(
        "({:.1}°, {:.1}°, {:.1}°)",
        x.to_degrees(),
        y.to_degrees(),
        z.to_degrees()
    )
}

/// Format an optional index, `-` when absent
pub fn format_index(index: Option<usize>) -> String {
    index.map_or_else(|| "-".to_string(), |i| i.to_string())
}

/// Format a duration in seconds
pub fn format_seconds(seconds: f32) -> String {
    format!("{seconds:.2}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1024), "1.02 kB");
        assert_eq!(format_bytes(1048576), "1.05 MB");
    }

    #[test]
    fn test_format_vec3() {
        assert_eq!(format_vec3(Vec3::new(1.0, -2.5, 0.0)), "(1.000, -2.500, 0.000)");
    }

    #[test]
    fn test_format_rotation() {
        let q = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        assert!(format_rotation(q).ends_with(" 90.0°)"));
    }

    #[test]
    fn test_format_index() {
        assert_eq!(format_index(Some(3)), "3");
        assert_eq!(format_index(None), "-");
    }
}
