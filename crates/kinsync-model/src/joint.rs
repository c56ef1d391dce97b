//! Joints connecting two links.

use serde::{Deserialize, Serialize};

use crate::env::BodyId;
use crate::pose::{Pose, Vec3};

/// Kind of relative motion a joint allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    /// Rotation about one axis.
    Hinge,
    /// Translation along one axis.
    Slider,
    /// Free rotation about the anchor, parameterized as a rotation vector.
    Spherical,
    /// Two orthogonal rotation axes through the anchor.
    Universal,
    /// Two rotation axes, as found on steered wheels.
    Hinge2,
}

impl JointType {
    /// Number of degrees of freedom.
    pub fn dof(self) -> usize {
        match self {
            JointType::Hinge | JointType::Slider => 1,
            JointType::Universal | JointType::Hinge2 => 2,
            JointType::Spherical => 3,
        }
    }

    /// Number of axes the joint description must supply.
    pub fn axis_count(self) -> usize {
        match self {
            JointType::Spherical => 0,
            other => other.dof(),
        }
    }

    /// Whether the joint's values are angles.
    pub fn is_revolute(self) -> bool {
        !matches!(self, JointType::Slider)
    }
}

/// Declarative description of a joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointInfo {
    /// Unique name within the body.
    pub name: String,
    /// Motion type.
    #[serde(rename = "type")]
    pub kind: JointType,
    /// Name of the first (parent) link; absent means attached to the world.
    #[serde(default)]
    pub link0: Option<String>,
    /// Name of the second (child) link.
    #[serde(default)]
    pub link1: Option<String>,
    /// Anchor point in the body frame at zero configuration.
    #[serde(default = "Vec3::zeros")]
    pub anchor: Vec3,
    /// Motion axes in the body frame at zero configuration.
    #[serde(default)]
    pub axes: Vec<Vec3>,
    /// Lower limit per DOF. Missing entries are unbounded.
    #[serde(default)]
    pub lower: Vec<f64>,
    /// Upper limit per DOF. Missing entries are unbounded.
    #[serde(default)]
    pub upper: Vec<f64>,
    /// Revolute joint without stops.
    #[serde(default)]
    pub circular: bool,
}

impl JointInfo {
    /// Joint of `kind` from `link0` to `link1` with no axes or limits yet.
    pub fn new(
        name: impl Into<String>,
        kind: JointType,
        link0: impl Into<String>,
        link1: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            link0: Some(link0.into()),
            link1: Some(link1.into()),
            anchor: Vec3::zeros(),
            axes: Vec::new(),
            lower: Vec::new(),
            upper: Vec::new(),
            circular: false,
        }
    }

    /// Set the anchor.
    pub fn anchor(mut self, anchor: Vec3) -> Self {
        self.anchor = anchor;
        self
    }

    /// Append a motion axis.
    pub fn axis(mut self, axis: Vec3) -> Self {
        self.axes.push(axis);
        self
    }

    /// Set single-DOF limits.
    pub fn limits(mut self, lower: f64, upper: f64) -> Self {
        self.lower = vec![lower];
        self.upper = vec![upper];
        self
    }

    /// Mark as circular.
    pub fn circular(mut self) -> Self {
        self.circular = true;
        self
    }
}

/// Identity of a joint: owning body, slot, and whether it is passive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointId {
    /// Owning body.
    pub body: BodyId,
    /// Index within the active or passive joint list.
    pub index: usize,
    /// Whether the joint is passive (owns no DOF).
    pub passive: bool,
}

/// A joint of an initialized body.
#[derive(Debug, Clone)]
pub struct Joint {
    pub(crate) info: JointInfo,
    pub(crate) index: usize,
    pub(crate) passive: bool,
    pub(crate) parent: BodyId,
    pub(crate) first: Option<usize>,
    pub(crate) second: Option<usize>,
    pub(crate) dof_index: Option<usize>,
}

impl Joint {
    /// Name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Motion type.
    pub fn kind(&self) -> JointType {
        self.info.kind
    }

    /// Identity key.
    pub fn id(&self) -> JointId {
        JointId {
            body: self.parent,
            index: self.index,
            passive: self.passive,
        }
    }

    /// Identity of the owning body.
    pub fn parent(&self) -> BodyId {
        self.parent
    }

    /// Index of the first attached link.
    pub fn first_attached(&self) -> Option<usize> {
        self.first
    }

    /// Index of the second attached link.
    pub fn second_attached(&self) -> Option<usize> {
        self.second
    }

    /// Start of this joint's values in the body DOF vector; `None` for passive joints.
    pub fn dof_index(&self) -> Option<usize> {
        self.dof_index
    }

    /// Whether the joint is passive.
    pub fn is_passive(&self) -> bool {
        self.passive
    }

    /// Number of degrees of freedom.
    pub fn dof(&self) -> usize {
        self.info.kind.dof()
    }

    /// Anchor in the body frame at zero configuration.
    pub fn anchor(&self) -> Vec3 {
        self.info.anchor
    }

    /// Axis `i` in the body frame at zero configuration.
    pub fn axis(&self, i: usize) -> Vec3 {
        self.info.axes.get(i).copied().unwrap_or_else(Vec3::zeros)
    }

    /// `(lower, upper)` limits of DOF `i`; unbounded when not declared.
    pub fn limits(&self, i: usize) -> (f64, f64) {
        (
            self.info.lower.get(i).copied().unwrap_or(f64::NEG_INFINITY),
            self.info.upper.get(i).copied().unwrap_or(f64::INFINITY),
        )
    }

    /// Whether the joint wraps around without stops.
    pub fn is_circular(&self) -> bool {
        self.info.circular
    }

    /// A joint whose every range collapses to a point never moves.
    pub fn is_static(&self) -> bool {
        (0..self.dof()).all(|i| {
            let (lower, upper) = self.limits(i);
            lower == upper
        })
    }

    /// Relative motion this joint produces for `values`, in the body frame
    /// at zero configuration.
    pub(crate) fn motion(&self, values: &[f64]) -> Pose {
        let value = |i: usize| values.get(i).copied().unwrap_or(0.0);
        let about_anchor = |rot: Pose| {
            Pose::from_translation(self.info.anchor)
                * rot
                * Pose::from_translation(-self.info.anchor)
        };
        match self.info.kind {
            JointType::Hinge => about_anchor(Pose::from_axis_angle(&self.axis(0), value(0))),
            JointType::Slider => {
                let axis = self.axis(0).try_normalize(1e-12).unwrap_or_else(Vec3::zeros);
                Pose::from_translation(axis * value(0))
            }
            JointType::Spherical => {
                about_anchor(Pose::from_scaled_axis(&Vec3::new(value(0), value(1), value(2))))
            }
            JointType::Universal | JointType::Hinge2 => about_anchor(
                Pose::from_axis_angle(&self.axis(0), value(0))
                    * Pose::from_axis_angle(&self.axis(1), value(1)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn joint(info: JointInfo) -> Joint {
        Joint {
            info,
            index: 0,
            passive: false,
            parent: BodyId::default(),
            first: Some(0),
            second: Some(1),
            dof_index: Some(0),
        }
    }

    #[test]
    fn test_dof_counts() {
        assert_eq!(JointType::Hinge.dof(), 1);
        assert_eq!(JointType::Universal.dof(), 2);
        assert_eq!(JointType::Spherical.dof(), 3);
        assert_eq!(JointType::Spherical.axis_count(), 0);
        assert!(!JointType::Slider.is_revolute());
    }

    #[test]
    fn test_hinge_motion_about_anchor() {
        let j = joint(
            JointInfo::new("j", JointType::Hinge, "a", "b")
                .anchor(Vec3::new(1.0, 0.0, 0.0))
                .axis(Vec3::z()),
        );
        let m = j.motion(&[FRAC_PI_2]);
        // the anchor is a fixed point of the motion
        assert_relative_eq!(m.transform_point(&Vec3::x()), Vec3::x(), epsilon = 1e-12);
        assert_relative_eq!(
            m.transform_point(&Vec3::new(2.0, 0.0, 0.0)),
            Vec3::new(1.0, 1.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_slider_motion() {
        let j = joint(JointInfo::new("j", JointType::Slider, "a", "b").axis(Vec3::new(0.0, 2.0, 0.0)));
        let m = j.motion(&[0.5]);
        assert_relative_eq!(m.trans, Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn test_unbounded_limits() {
        let j = joint(JointInfo::new("j", JointType::Hinge, "a", "b").axis(Vec3::z()));
        assert_eq!(j.limits(0), (f64::NEG_INFINITY, f64::INFINITY));
        assert!(!j.is_static());

        let fixed = joint(
            JointInfo::new("f", JointType::Hinge, "a", "b")
                .axis(Vec3::z())
                .limits(0.0, 0.0),
        );
        assert!(fixed.is_static());
    }

    #[test]
    fn test_joint_json() {
        let json = r#"{
            "name": "elbow",
            "type": "hinge",
            "link0": "upper",
            "link1": "lower",
            "anchor": [0.0, 0.0, 1.0],
            "axes": [[0.0, 1.0, 0.0]],
            "lower": [-1.5],
            "upper": [1.5]
        }"#;
        let info: JointInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.kind, JointType::Hinge);
        assert_eq!(info.anchor, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(info.axes, vec![Vec3::y()]);
        assert!(!info.circular);
    }
}
