use glam::{EulerRot, Mat3, Quat, Vec3};

use crate::error::{StageError, StageResult};

/// Rotation pointing a light's facing axis (local −Z) along `direction`.
///
/// Among the one-parameter family of rotations that align −Z with the
/// direction, this picks the one whose local +Y points as close to global +Z
/// as possible; for vertical directions (where that projection degenerates)
/// local +Y falls back to global +Y. Returned as XYZ Euler angles in radians.
pub fn track_rotation(direction: Vec3) -> StageResult<[f32; 3]> {
    let quat = track_quat(direction)?;
    let (x, y, z) = quat.to_euler(EulerRot::XYZ);
    Ok([x, y, z])
}

pub fn track_quat(direction: Vec3) -> StageResult<Quat> {
    let forward = direction
        .try_normalize()
        .ok_or_else(|| StageError::validation("cannot aim a light along a zero-length direction"))?;

    // Local −Z maps to `forward`, so local +Z maps to its opposite.
    let z_axis = -forward;

    let up_hint = Vec3::Z;
    let rejected = up_hint - z_axis * up_hint.dot(z_axis);
    let y_axis = rejected.try_normalize().unwrap_or(Vec3::Y);
    let x_axis = y_axis.cross(z_axis);

    Ok(Quat::from_mat3(&Mat3::from_cols(x_axis, y_axis, z_axis)).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn facing_axis_aligns_with_direction() {
        for dir in [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-2.0, 3.0, 0.5),
            Vec3::new(0.1, 0.1, -5.0),
        ] {
            let q = track_quat(dir).unwrap();
            assert_close(q * Vec3::NEG_Z, dir.normalize());
        }
    }

    #[test]
    fn local_y_points_up_among_the_rotation_family() {
        let q = track_quat(Vec3::new(1.0, 2.0, -0.5)).unwrap();
        let up = q * Vec3::Y;
        // Orthogonal to the facing direction, and tilted toward global +Z.
        assert!(up.dot((q * Vec3::NEG_Z).normalize()).abs() < 1e-5);
        assert!(up.z > 0.9);
    }

    #[test]
    fn straight_down_uses_the_documented_fallback() {
        let q = track_quat(Vec3::NEG_Z).unwrap();
        assert_close(q * Vec3::NEG_Z, Vec3::NEG_Z);
        assert_close(q * Vec3::Y, Vec3::Y);
    }

    #[test]
    fn zero_direction_is_rejected() {
        assert!(track_quat(Vec3::ZERO).is_err());
    }

    #[test]
    fn euler_round_trips_through_the_quaternion() {
        let dir = Vec3::new(0.3, -1.2, 0.7);
        let [x, y, z] = track_rotation(dir).unwrap();
        let q = Quat::from_euler(EulerRot::XYZ, x, y, z);
        assert_close(q * Vec3::NEG_Z, dir.normalize());
    }
}
