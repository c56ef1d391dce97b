//! Rigid poses in the host convention.
//!
//! A [`Pose`] stores its rotation as a quaternion laid out `[w, x, y, z]`
//! together with a translation. The quaternion is *not* renormalized on
//! construction; corrupted orientation state stays visible so that
//! consumers can reject it.

use std::ops::Mul;

use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A vector in 3D space (meters).
pub type Vec3 = Vector3<f64>;

/// Rigid transform: rotation quaternion `[w, x, y, z]` plus translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Rotation quaternion, scalar part first.
    #[serde(default = "identity_rotation")]
    pub rot: [f64; 4],
    /// Translation.
    #[serde(default = "Vec3::zeros")]
    pub trans: Vec3,
}

fn identity_rotation() -> [f64; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

impl Pose {
    /// Identity pose.
    pub fn identity() -> Self {
        Self {
            rot: identity_rotation(),
            trans: Vec3::zeros(),
        }
    }

    /// Pose from a raw `[w, x, y, z]` quaternion and a translation.
    pub fn new(rot: [f64; 4], trans: Vec3) -> Self {
        Self { rot, trans }
    }

    /// Pure translation.
    pub fn from_translation(trans: Vec3) -> Self {
        Self {
            rot: identity_rotation(),
            trans,
        }
    }

    /// Rotation of `angle` radians about `axis` (need not be normalized).
    ///
    /// A zero axis yields the identity rotation.
    pub fn from_axis_angle(axis: &Vec3, angle: f64) -> Self {
        let rot = Unit::try_new(*axis, 1e-12)
            .map(|axis| UnitQuaternion::from_axis_angle(&axis, angle))
            .unwrap_or_else(UnitQuaternion::identity);
        Self::from_unit_quaternion(&rot, Vec3::zeros())
    }

    /// Rotation from a rotation vector (axis scaled by angle).
    pub fn from_scaled_axis(rotvec: &Vec3) -> Self {
        Self::from_unit_quaternion(&UnitQuaternion::from_scaled_axis(*rotvec), Vec3::zeros())
    }

    /// Pose from a nalgebra unit quaternion and a translation.
    pub fn from_unit_quaternion(rot: &UnitQuaternion<f64>, trans: Vec3) -> Self {
        Self {
            rot: [rot.w, rot.i, rot.j, rot.k],
            trans,
        }
    }

    /// The rotation as a (possibly non-unit) nalgebra quaternion.
    pub fn quaternion(&self) -> Quaternion<f64> {
        Quaternion::new(self.rot[0], self.rot[1], self.rot[2], self.rot[3])
    }

    /// Squared length of the rotation quaternion.
    pub fn rot_length_sqr(&self) -> f64 {
        self.rot.iter().map(|c| c * c).sum()
    }

    /// Rotate a vector, ignoring translation.
    pub fn rotate(&self, v: &Vec3) -> Vec3 {
        UnitQuaternion::new_unchecked(self.quaternion()) * v
    }

    /// Transform a point.
    pub fn transform_point(&self, p: &Vec3) -> Vec3 {
        self.rotate(p) + self.trans
    }

    /// Inverse pose, assuming a unit rotation.
    pub fn inverse(&self) -> Self {
        let conj = self.quaternion().conjugate();
        let inv = Self {
            rot: [conj.w, conj.i, conj.j, conj.k],
            trans: Vec3::zeros(),
        };
        Self {
            trans: -inv.rotate(&self.trans),
            ..inv
        }
    }

    /// Returns `true` when both poses agree within `eps`, treating `q` and
    /// `-q` as the same rotation.
    pub fn approx_eq(&self, other: &Pose, eps: f64) -> bool {
        let dot: f64 = self.rot.iter().zip(other.rot.iter()).map(|(a, b)| a * b).sum();
        let sign = if dot < 0.0 { -1.0 } else { 1.0 };
        let rot_close = self
            .rot
            .iter()
            .zip(other.rot.iter())
            .all(|(a, b)| (a - sign * b).abs() <= eps);
        rot_close && (self.trans - other.trans).norm() <= eps
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// `a * b` applies `b` first, then `a`.
impl Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        let q = self.quaternion() * rhs.quaternion();
        Pose {
            rot: [q.w, q.i, q.j, q.k],
            trans: self.trans + self.rotate(&rhs.trans),
        }
    }
}

impl Mul<&Pose> for &Pose {
    type Output = Pose;

    fn mul(self, rhs: &Pose) -> Pose {
        *self * *rhs
    }
}
