//! Conversions between host poses and engine transforms.
//!
//! The host stores rotations as `[w, x, y, z]` in `f64`; Rapier uses
//! nalgebra isometries in `f32` whose quaternions are stored `[i, j, k, w]`.
//! Every crossing between the two goes through this module.

use kinsync_model::{Pose, Vec3};
use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

use crate::error::{PhysicsError, Result};

/// Largest accepted `|‖q‖² - 1|` for an incoming rotation.
pub const ROTATION_TOLERANCE: f64 = 0.01;

/// Convert a host pose to an engine transform.
///
/// Fails with [`PhysicsError::MalformedRotation`] when the rotation is too
/// far from unit length; otherwise the rotation is renormalized.
pub fn to_engine_transform(pose: &Pose) -> Result<Isometry3<f32>> {
    let deviation = (pose.rot_length_sqr() - 1.0).abs();
    // written this way so NaN is rejected too
    if !(deviation <= ROTATION_TOLERANCE) {
        return Err(PhysicsError::MalformedRotation { deviation });
    }
    let [w, x, y, z] = pose.rot;
    let rotation =
        UnitQuaternion::from_quaternion(Quaternion::new(w as f32, x as f32, y as f32, z as f32));
    Ok(Isometry3::from_parts(
        Translation3::from(to_engine_vector(&pose.trans)),
        rotation,
    ))
}

/// Convert an engine transform to a host pose.
pub fn to_host_pose(transform: &Isometry3<f32>) -> Pose {
    let q = &transform.rotation;
    Pose::new(
        [q.w as f64, q.i as f64, q.j as f64, q.k as f64],
        to_host_vector(&transform.translation.vector),
    )
}

/// Convert a host vector to an engine vector.
pub fn to_engine_vector(v: &Vec3) -> Vector3<f32> {
    v.cast::<f32>()
}

/// Convert a host position to an engine point.
pub fn to_engine_point(v: &Vec3) -> Point3<f32> {
    Point3::from(to_engine_vector(v))
}

/// Convert an engine vector to a host vector.
pub fn to_host_vector(v: &Vector3<f32>) -> Vec3 {
    v.cast::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_trip() {
        let poses = [
            Pose::identity(),
            Pose::from_translation(Vec3::new(1.5, -2.0, 0.25)),
            Pose::from_axis_angle(&Vec3::new(1.0, 2.0, 3.0), 2.5)
                * Pose::from_translation(Vec3::new(-4.0, 0.5, 9.0)),
            Pose::from_axis_angle(&Vec3::x(), -3.0),
        ];
        for pose in poses {
            let back = to_host_pose(&to_engine_transform(&pose).unwrap());
            assert!(back.approx_eq(&pose, 1e-5), "{pose:?} -> {back:?}");
        }
    }

    #[test]
    fn test_component_order() {
        // 90 degrees about z: host [w, x, y, z] = [c, 0, 0, s]
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let pose = Pose::new([s, 0.0, 0.0, s], Vec3::zeros());
        let t = to_engine_transform(&pose).unwrap();
        assert_relative_eq!(t.rotation.w, s as f32, epsilon = 1e-6);
        assert_relative_eq!(t.rotation.k, s as f32, epsilon = 1e-6);
        let rotated = t * Point3::new(1.0f32, 0.0, 0.0);
        assert_relative_eq!(rotated, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_slightly_denormalized_rotation_accepted() {
        let pose = Pose::new([1.004, 0.0, 0.0, 0.0], Vec3::zeros());
        let t = to_engine_transform(&pose).unwrap();
        assert_relative_eq!(t.rotation.w, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_malformed_rotation_rejected() {
        let pose = Pose::new([1.1, 0.0, 0.0, 0.0], Vec3::zeros());
        match to_engine_transform(&pose) {
            Err(PhysicsError::MalformedRotation { deviation }) => {
                assert_relative_eq!(deviation, 0.21, epsilon = 1e-9)
            }
            other => panic!("expected malformed rotation, got {other:?}"),
        }
        let nan = Pose::new([f64::NAN, 0.0, 0.0, 0.0], Vec3::zeros());
        assert!(to_engine_transform(&nan).is_err());
    }

    #[test]
    fn test_vectors() {
        let v = Vec3::new(1.0, -2.0, 3.5);
        assert_eq!(to_engine_vector(&v), Vector3::new(1.0f32, -2.0, 3.5));
        assert_eq!(to_host_vector(&to_engine_vector(&v)), v);
        assert_eq!(to_engine_point(&v), Point3::new(1.0f32, -2.0, 3.5));
    }
}
