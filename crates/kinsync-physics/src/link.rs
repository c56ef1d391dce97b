//! Engine-side proxy for one link.

use kinsync_model::{KinBody, Link, Pose};
use nalgebra::Isometry3;
use rapier3d::dynamics::{RigidBodyHandle, RigidBodySet, RigidBodyType};
use rapier3d::geometry::ColliderHandle;

use crate::bridge::{to_engine_transform, to_host_pose};
use crate::error::Result;
use crate::world::PhysicsWorld;

/// How a mirrored link moves in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMotion {
    /// Fixed to the world; pushed along by synchronization but never
    /// affected by contacts.
    Static,
    /// Collision mirror driven only by synchronization.
    Kinematic,
    /// Simulated by the engine.
    Dynamic,
}

impl LinkMotion {
    /// Rapier body type for this motion.
    pub fn body_type(self) -> RigidBodyType {
        match self {
            LinkMotion::Static | LinkMotion::Kinematic => RigidBodyType::KinematicPositionBased,
            LinkMotion::Dynamic => RigidBodyType::Dynamic,
        }
    }
}

/// A link mirrored as a Rapier rigid body.
///
/// The rigid body is placed at the link's mass frame, so its world pose is
/// `link.transform() ∘ local_mass_frame` rather than the link origin.
#[derive(Debug, Clone)]
pub struct LinkProxy {
    pub(crate) link_index: usize,
    pub(crate) rigid_body: RigidBodyHandle,
    pub(crate) colliders: Vec<ColliderHandle>,
    pub(crate) local_mass_frame: Pose,
    pub(crate) motion: LinkMotion,
}

impl LinkProxy {
    /// Proxy for `link`; the rigid body is registered separately.
    pub(crate) fn new(link: &Link, motion: LinkMotion) -> Self {
        Self {
            link_index: link.index(),
            rigid_body: RigidBodyHandle::invalid(),
            colliders: Vec::new(),
            local_mass_frame: link.local_mass_frame(),
            motion,
        }
    }

    /// Index of the mirrored link in its body.
    pub fn link_index(&self) -> usize {
        self.link_index
    }

    /// Handle of the Rapier rigid body.
    pub fn rigid_body(&self) -> RigidBodyHandle {
        self.rigid_body
    }

    /// Handles of the attached colliders.
    pub fn colliders(&self) -> &[ColliderHandle] {
        &self.colliders
    }

    /// Mass frame relative to the link origin, fixed at construction.
    pub fn local_mass_frame(&self) -> Pose {
        self.local_mass_frame
    }

    /// Motion classification.
    pub fn motion(&self) -> LinkMotion {
        self.motion
    }

    /// Engine pose for a link at `link_pose`.
    pub fn compose(&self, link_pose: &Pose) -> Result<Isometry3<f32>> {
        to_engine_transform(&(*link_pose * self.local_mass_frame))
    }

    /// Engine pose the mirrored link should currently have.
    pub fn world_transform(&self, body: &KinBody) -> Result<Isometry3<f32>> {
        self.compose(&self.link(body).transform())
    }

    /// Move the mirrored link so that its mass frame lands on `transform`.
    ///
    /// Only this link changes.
    pub fn set_world_transform(&self, body: &mut KinBody, transform: &Isometry3<f32>) -> Result<()> {
        let pose = to_host_pose(transform) * self.local_mass_frame.inverse();
        body.set_link_transform(self.link_index, pose)?;
        Ok(())
    }

    /// Current pose of the Rapier body, if it is still registered.
    pub fn engine_transform(&self, world: &PhysicsWorld) -> Option<Isometry3<f32>> {
        world.body_position(self.rigid_body).copied()
    }

    /// Write an already composed engine pose into the Rapier body.
    pub(crate) fn push(&self, bodies: &mut RigidBodySet, transform: &Isometry3<f32>) {
        if let Some(rb) = bodies.get_mut(self.rigid_body) {
            rb.set_position(*transform, true);
        }
    }

    fn link<'a>(&self, body: &'a KinBody) -> &'a Link {
        body.link(self.link_index).unwrap_or_else(|| {
            panic!(
                "consistency violation: link {} missing from body {}",
                self.link_index,
                body.name()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kinsync_model::{KinBodyInfo, LinkInfo, Vec3};
    use nalgebra::Vector3;

    fn offset_body() -> KinBody {
        let mut info = LinkInfo::new("weight");
        info.transform = Pose::from_translation(Vec3::new(0.0, 0.0, 1.0));
        info.mass_frame = Pose::from_translation(Vec3::new(0.1, 0.0, 0.0));
        KinBody::from_info(KinBodyInfo {
            name: "weight".into(),
            links: vec![info],
            joints: vec![],
            passive_joints: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_world_transform_includes_mass_frame() {
        let body = offset_body();
        let proxy = LinkProxy::new(&body.links()[0], LinkMotion::Dynamic);
        let t = proxy.world_transform(&body).unwrap();
        assert_relative_eq!(t.translation.vector, Vector3::new(0.1, 0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_set_world_transform_strips_mass_frame() {
        let mut body = offset_body();
        let proxy = LinkProxy::new(&body.links()[0], LinkMotion::Dynamic);
        let stamp = body.update_stamp();
        proxy
            .set_world_transform(&mut body, &Isometry3::translation(1.1, 2.0, 3.0))
            .unwrap();
        assert_relative_eq!(
            body.links()[0].transform().trans,
            Vec3::new(1.0, 2.0, 3.0),
            epsilon = 1e-6
        );
        assert!(body.update_stamp() > stamp);
    }

    #[test]
    fn test_motion_body_types() {
        assert_eq!(LinkMotion::Dynamic.body_type(), RigidBodyType::Dynamic);
        assert!(LinkMotion::Static.body_type().is_kinematic());
        assert!(LinkMotion::Kinematic.body_type().is_kinematic());
    }

    #[test]
    #[should_panic(expected = "consistency violation")]
    fn test_missing_link_panics() {
        let body = offset_body();
        let mut proxy = LinkProxy::new(&body.links()[0], LinkMotion::Dynamic);
        proxy.link_index = 7;
        let _ = proxy.world_transform(&body);
    }
}
