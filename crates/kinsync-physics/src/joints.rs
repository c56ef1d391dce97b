//! Joint conversion from kinematic joints to Rapier.

use std::f32::consts::{PI, TAU};

use nalgebra::{Isometry3, Point3, UnitQuaternion, UnitVector3, Vector3};
use rapier3d::dynamics::{GenericJoint, GenericJointBuilder, JointAxesMask, JointAxis};

/// Anchor of a joint expressed in each attached body's frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LocalAnchors {
    pub(crate) anchor1: Point3<f32>,
    pub(crate) anchor2: Point3<f32>,
}

impl LocalAnchors {
    /// Express a world anchor in the frames of two bodies.
    pub(crate) fn from_world(
        pose1: &Isometry3<f32>,
        pose2: &Isometry3<f32>,
        anchor: &Point3<f32>,
    ) -> Self {
        Self {
            anchor1: pose1.inverse_transform_point(anchor),
            anchor2: pose2.inverse_transform_point(anchor),
        }
    }
}

/// Express a world axis in the frames of two bodies.
///
/// Returns `None` when the axis has no usable direction.
pub(crate) fn local_axes(
    pose1: &Isometry3<f32>,
    pose2: &Isometry3<f32>,
    axis: &Vector3<f32>,
) -> Option<(UnitVector3<f32>, UnitVector3<f32>)> {
    let axis = UnitVector3::try_new(*axis, 1.0e-6)?;
    Some((
        pose1.inverse_transform_unit_vector(&axis),
        pose2.inverse_transform_unit_vector(&axis),
    ))
}

/// Revolute joint about `axes`.
///
/// Callers pass the negated model axis, so the engine angle runs opposite to
/// the model's; see [`realign_hinge_limits`]. Limits depend on the built
/// frames through [`hinge_angle`] and are set afterwards.
pub(crate) fn revolute_joint(
    anchors: LocalAnchors,
    axes: (UnitVector3<f32>, UnitVector3<f32>),
    contacts_enabled: bool,
) -> GenericJoint {
    GenericJointBuilder::new(JointAxesMask::LOCKED_REVOLUTE_AXES)
        .local_anchor1(anchors.anchor1)
        .local_anchor2(anchors.anchor2)
        .local_axis1(axes.0)
        .local_axis2(axes.1)
        .contacts_enabled(contacts_enabled)
        .build()
}

/// Prismatic joint along `axes`.
pub(crate) fn prismatic_joint(
    anchors: LocalAnchors,
    axes: (UnitVector3<f32>, UnitVector3<f32>),
    limits: Option<[f32; 2]>,
    contacts_enabled: bool,
) -> GenericJoint {
    let mut builder = GenericJointBuilder::new(JointAxesMask::LOCKED_PRISMATIC_AXES)
        .local_anchor1(anchors.anchor1)
        .local_anchor2(anchors.anchor2)
        .local_axis1(axes.0)
        .local_axis2(axes.1)
        .contacts_enabled(contacts_enabled);

    if let Some(limits) = limits {
        builder = builder.limits(JointAxis::LinX, limits);
    }

    builder.build()
}

/// Ball joint at the anchor.
pub(crate) fn spherical_joint(anchors: LocalAnchors, contacts_enabled: bool) -> GenericJoint {
    GenericJointBuilder::new(JointAxesMask::LOCKED_SPHERICAL_AXES)
        .local_anchor1(anchors.anchor1)
        .local_anchor2(anchors.anchor2)
        .contacts_enabled(contacts_enabled)
        .build()
}

/// Current rotation of a revolute joint about its free axis, in `(-π, π]`.
///
/// `rot1` and `rot2` are the world rotations of the two attached bodies.
pub fn hinge_angle(
    joint: &GenericJoint,
    rot1: &UnitQuaternion<f32>,
    rot2: &UnitQuaternion<f32>,
) -> f32 {
    let frame1 = rot1 * joint.local_frame1.rotation;
    let frame2 = rot2 * joint.local_frame2.rotation;
    let rel = frame1.inverse() * frame2;
    wrap_angle(2.0 * rel.i.atan2(rel.w))
}

/// Map model hinge limits into the engine's angle convention.
///
/// The engine angle runs opposite to the model value and may start from a
/// different zero, so with `diff = engine_initial + model_initial` a model
/// value `q` corresponds to engine angle `diff - q`. The bounds swap.
pub fn realign_hinge_limits(engine_initial: f32, model_initial: f64, lower: f64, upper: f64) -> [f32; 2] {
    let diff = engine_initial as f64 + model_initial;
    [(diff - upper) as f32, (diff - lower) as f32]
}

fn wrap_angle(mut a: f32) -> f32 {
    while a > PI {
        a -= TAU;
    }
    while a <= -PI {
        a += TAU;
    }
    a
}

/// Slider limits, or `None` when either bound is infinite.
pub(crate) fn finite_limits(lower: f64, upper: f64) -> Option<[f32; 2]> {
    (lower.is_finite() && upper.is_finite()).then_some([lower as f32, upper as f32])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn z_hinge() -> GenericJoint {
        let pose1 = Isometry3::identity();
        let pose2 = Isometry3::translation(1.0, 0.0, 0.0);
        let anchors = LocalAnchors::from_world(&pose1, &pose2, &Point3::new(0.5, 0.0, 0.0));
        let axes = local_axes(&pose1, &pose2, &-Vector3::z()).unwrap();
        revolute_joint(anchors, axes, false)
    }

    #[test]
    fn test_hinge_limit_realignment() {
        let [lo, hi] = realign_hinge_limits(0.05, 0.2, -1.0, 1.0);
        assert_relative_eq!(lo, -0.75, epsilon = 1e-6);
        assert_relative_eq!(hi, 1.25, epsilon = 1e-6);
    }

    #[test]
    fn test_local_anchors() {
        let joint = z_hinge();
        assert_relative_eq!(joint.local_frame1.translation.vector, Vector3::new(0.5, 0.0, 0.0));
        assert_relative_eq!(joint.local_frame2.translation.vector, Vector3::new(-0.5, 0.0, 0.0));
        assert!(!joint.contacts_enabled);
    }

    #[test]
    fn test_hinge_angle_opposes_model_rotation() {
        let joint = z_hinge();
        let identity = UnitQuaternion::identity();
        assert_relative_eq!(hinge_angle(&joint, &identity, &identity), 0.0, epsilon = 1e-6);

        // child turned +90 degrees about +z reads as -90 about the joint axis
        let turned = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        assert_relative_eq!(hinge_angle(&joint, &identity, &turned), -FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn test_hinge_angle_wraps() {
        assert_relative_eq!(wrap_angle(3.0 * PI / 2.0), -FRAC_PI_2, epsilon = 1e-6);
        assert_relative_eq!(wrap_angle(-PI), PI, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_axis() {
        let pose = Isometry3::identity();
        assert!(local_axes(&pose, &pose, &Vector3::zeros()).is_none());
    }

    #[test]
    fn test_limits_applied() {
        let pose = Isometry3::identity();
        let anchors = LocalAnchors::from_world(&pose, &pose, &Point3::origin());
        let axes = local_axes(&pose, &pose, &Vector3::x()).unwrap();
        let slider = prismatic_joint(anchors, axes, finite_limits(-0.1, 0.3), true);
        let limits = slider.limits(JointAxis::LinX).unwrap();
        assert_eq!([limits.min, limits.max], [-0.1, 0.3]);
        assert!(finite_limits(f64::NEG_INFINITY, 1.0).is_none());

        let ball = spherical_joint(anchors, true);
        assert!(ball.contacts_enabled);
    }
}
