//! The environment owning every body.

use slotmap::{new_key_type, SlotMap};
use tracing::debug;

use crate::body::KinBody;

new_key_type! {
    /// Identity of a body within an [`Environment`].
    pub struct BodyId;
}

/// Collection of bodies addressed by [`BodyId`].
#[derive(Debug, Default)]
pub struct Environment {
    bodies: SlotMap<BodyId, KinBody>,
}

impl Environment {
    /// Empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body, assigning its identity.
    pub fn add_body(&mut self, mut body: KinBody) -> BodyId {
        let id = self.bodies.insert_with_key(|id| {
            body.set_id(id);
            body
        });
        debug!(?id, "added body to environment");
        id
    }

    /// Remove a body; its identity is never reused.
    pub fn remove_body(&mut self, id: BodyId) -> Option<KinBody> {
        self.bodies.remove(id)
    }

    /// Body by identity.
    pub fn body(&self, id: BodyId) -> Option<&KinBody> {
        self.bodies.get(id)
    }

    /// Mutable body by identity.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut KinBody> {
        self.bodies.get_mut(id)
    }

    /// Whether `id` names a live body.
    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains_key(id)
    }

    /// Identities of every body.
    pub fn body_ids(&self) -> Vec<BodyId> {
        self.bodies.keys().collect()
    }

    /// Iterate over every body.
    pub fn bodies(&self) -> impl Iterator<Item = &KinBody> {
        self.bodies.values()
    }

    /// Number of bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::KinBodyInfo;
    use crate::joint::{JointInfo, JointType};
    use crate::link::LinkInfo;
    use crate::pose::Vec3;

    fn body() -> KinBody {
        KinBody::from_info(KinBodyInfo {
            name: "b".into(),
            links: vec![LinkInfo::new("l0"), LinkInfo::new("l1")],
            joints: vec![JointInfo::new("j", JointType::Slider, "l0", "l1").axis(Vec3::x())],
            passive_joints: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_add_assigns_identity() {
        let mut env = Environment::new();
        let id = env.add_body(body());
        let b = env.body(id).unwrap();
        assert_eq!(b.id(), id);
        assert!(b.links().iter().all(|l| l.parent() == id));
        assert!(b.joints().iter().all(|j| j.id().body == id));
    }

    #[test]
    fn test_removed_identity_not_reused() {
        let mut env = Environment::new();
        let a = env.add_body(body());
        env.remove_body(a);
        let b = env.add_body(body());
        assert_ne!(a, b);
        assert!(!env.contains(a));
        assert_eq!(env.len(), 1);
    }
}
