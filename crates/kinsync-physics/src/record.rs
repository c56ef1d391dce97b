//! Per-body proxy records.

use std::collections::HashMap;

use kinsync_model::{BodyId, ChangeSubscription, JointId};
use rapier3d::dynamics::ImpulseJointHandle;

use crate::error::StructuralError;
use crate::link::LinkProxy;
use crate::world::PhysicsWorld;

/// Engine joint family a kinematic joint was mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Revolute about one axis.
    Hinge,
    /// Prismatic along one axis.
    Slider,
    /// Ball joint.
    Spherical,
}

/// Hinge limit softness triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitSoftness {
    /// Fraction of the limit error corrected softly.
    pub softness: f32,
    /// Error correction bias.
    pub bias: f32,
    /// Bounce-back relaxation.
    pub relaxation: f32,
}

impl From<[f32; 3]> for LimitSoftness {
    fn from([softness, bias, relaxation]: [f32; 3]) -> Self {
        Self {
            softness,
            bias,
            relaxation,
        }
    }
}

/// A joint as mirrored into the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct JointConstraint {
    /// Rapier joint handle.
    pub handle: ImpulseJointHandle,
    /// Engine joint family.
    pub kind: ConstraintKind,
    /// Whether contacts between the two attached links are disabled.
    pub collision_excluded: bool,
    /// Limits in engine units and convention, if any were applied.
    pub limits: Option<[f32; 2]>,
    /// Limit softness, recorded for hinges with limits.
    pub softness: Option<LimitSoftness>,
}

/// Everything the space tracks for one mirrored body.
#[derive(Debug)]
pub struct BodyProxyRecord {
    pub(crate) body: BodyId,
    pub(crate) last_sync_stamp: u64,
    pub(crate) links: Vec<LinkProxy>,
    pub(crate) joint_constraints: HashMap<JointId, JointConstraint>,
    pub(crate) dof_branches: Vec<i32>,
    pub(crate) change_subscription: Option<ChangeSubscription>,
    pub(crate) diagnostics: Vec<StructuralError>,
}

impl BodyProxyRecord {
    pub(crate) fn new(body: BodyId) -> Self {
        Self {
            body,
            last_sync_stamp: 0,
            links: Vec::new(),
            joint_constraints: HashMap::new(),
            dof_branches: Vec::new(),
            change_subscription: None,
            diagnostics: Vec::new(),
        }
    }

    /// The mirrored body.
    pub fn body(&self) -> BodyId {
        self.body
    }

    /// Update stamp of the body at the last synchronization.
    pub fn last_sync_stamp(&self) -> u64 {
        self.last_sync_stamp
    }

    /// Link proxies, index-aligned with the body's links.
    pub fn links(&self) -> &[LinkProxy] {
        &self.links
    }

    /// Constructed joints by identity.
    pub fn joint_constraints(&self) -> &HashMap<JointId, JointConstraint> {
        &self.joint_constraints
    }

    /// DOF branch selectors read at the last synchronization.
    pub fn dof_branches(&self) -> &[i32] {
        &self.dof_branches
    }

    /// Problems found during the last build.
    pub fn diagnostics(&self) -> &[StructuralError] {
        &self.diagnostics
    }

    /// Whether the record listens for geometry changes.
    pub fn is_subscribed(&self) -> bool {
        self.change_subscription.is_some()
    }

    /// Remove every joint and body of this record from `world` and clear it.
    ///
    /// The change subscription survives so a rebuild keeps listening.
    pub(crate) fn reset(&mut self, world: &mut PhysicsWorld) {
        for (_, constraint) in self.joint_constraints.drain() {
            world.remove_joint(constraint.handle);
        }
        for proxy in self.links.drain(..) {
            world.remove_body(proxy.rigid_body);
        }
        self.dof_branches.clear();
        self.diagnostics.clear();
        self.last_sync_stamp = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softness_from_triple() {
        let s = LimitSoftness::from([0.9, 0.8, 1.0]);
        assert_eq!(s.softness, 0.9);
        assert_eq!(s.bias, 0.8);
        assert_eq!(s.relaxation, 1.0);
    }

    #[test]
    fn test_new_record_is_empty() {
        let record = BodyProxyRecord::new(BodyId::default());
        assert!(record.links().is_empty());
        assert!(record.joint_constraints().is_empty());
        assert_eq!(record.last_sync_stamp(), 0);
        assert!(!record.is_subscribed());
    }
}
