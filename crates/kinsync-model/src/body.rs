//! Articulated kinematic bodies.

use std::collections::{HashMap, HashSet};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::callback::{BodyProperty, ChangeSubscription, Subscriber};
use crate::env::BodyId;
use crate::error::{ModelError, Result};
use crate::geometry::GeometryInfo;
use crate::joint::{Joint, JointId, JointInfo};
use crate::link::{Link, LinkInfo};
use crate::pose::{Pose, Vec3};

/// Declarative description of a whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinBodyInfo {
    /// Body name.
    pub name: String,
    /// Links; the first link is the base.
    pub links: Vec<LinkInfo>,
    /// Active joints, parents before children.
    #[serde(default)]
    pub joints: Vec<JointInfo>,
    /// Passive joints (no DOF of their own).
    #[serde(default)]
    pub passive_joints: Vec<JointInfo>,
}

/// Pack an unordered link index pair as `min | (max << 16)`.
pub fn pack_link_pair(a: usize, b: usize) -> u32 {
    let (lo, hi) = (a.min(b) as u32, a.max(b) as u32);
    lo | (hi << 16)
}

/// An articulated collection of links connected by joints.
///
/// Every pose- or geometry-affecting mutation increments the
/// [update stamp](KinBody::update_stamp).
pub struct KinBody {
    id: BodyId,
    name: String,
    links: Vec<Link>,
    joints: Vec<Joint>,
    passive_joints: Vec<Joint>,
    transform: Pose,
    dof_values: Vec<f64>,
    adjacent_links: HashSet<u32>,
    update_stamp: u64,
    subscribers: Vec<Subscriber>,
}

impl KinBody {
    /// Build a body from its description.
    pub fn from_info(info: KinBodyInfo) -> Result<Self> {
        if info.links.is_empty() {
            return Err(ModelError::EmptyBody(info.name));
        }

        let names: HashMap<&str, usize> = info
            .links
            .iter()
            .enumerate()
            .map(|(i, l)| (l.name.as_str(), i))
            .collect();

        let mut dof = 0;
        let mut joints = Vec::with_capacity(info.joints.len());
        for (index, joint) in info.joints.iter().enumerate() {
            let mut joint = Self::init_joint(&names, joint.clone(), index, false)?;
            joint.dof_index = Some(dof);
            dof += joint.dof();
            joints.push(joint);
        }
        let passive_joints = info
            .passive_joints
            .iter()
            .enumerate()
            .map(|(index, joint)| Self::init_joint(&names, joint.clone(), index, true))
            .collect::<Result<Vec<_>>>()?;

        let links = info
            .links
            .into_iter()
            .enumerate()
            .map(|(i, l)| Link::new(l, i))
            .collect();

        let mut body = Self {
            id: BodyId::default(),
            name: info.name,
            links,
            joints,
            passive_joints,
            transform: Pose::identity(),
            dof_values: vec![0.0; dof],
            adjacent_links: HashSet::new(),
            update_stamp: 1,
            subscribers: Vec::new(),
        };
        body.adjacent_links = body
            .all_joints()
            .filter_map(|j| Some(pack_link_pair(j.first?, j.second?)))
            .collect();
        body.update_link_transforms();
        debug!(
            body = %body.name,
            links = body.links.len(),
            dof = body.dof(),
            "initialized kinematic body"
        );
        Ok(body)
    }

    /// Parse a JSON [`KinBodyInfo`] and build the body.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_info(serde_json::from_str(json)?)
    }

    fn init_joint(
        names: &HashMap<&str, usize>,
        info: JointInfo,
        index: usize,
        passive: bool,
    ) -> Result<Joint> {
        let resolve = |name: &Option<String>| -> Result<Option<usize>> {
            match name {
                None => Ok(None),
                Some(n) => names
                    .get(n.as_str())
                    .copied()
                    .map(Some)
                    .ok_or_else(|| ModelError::UnknownLink {
                        joint: info.name.clone(),
                        link: n.clone(),
                    }),
            }
        };
        let first = resolve(&info.link0)?;
        let second = resolve(&info.link1)?;
        if info.axes.len() < info.kind.axis_count() {
            return Err(ModelError::AxisCount {
                joint: info.name,
                expected: info.kind.axis_count(),
                actual: info.axes.len(),
            });
        }
        Ok(Joint {
            info,
            index,
            passive,
            parent: BodyId::default(),
            first,
            second,
            dof_index: None,
        })
    }

    pub(crate) fn set_id(&mut self, id: BodyId) {
        self.id = id;
        for link in &mut self.links {
            link.parent = id;
        }
        for joint in self.joints.iter_mut().chain(self.passive_joints.iter_mut()) {
            joint.parent = id;
        }
    }

    /// Identity assigned by the environment.
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Links in index order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Link `index`.
    pub fn link(&self, index: usize) -> Option<&Link> {
        self.links.get(index)
    }

    /// Active joints.
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Passive joints.
    pub fn passive_joints(&self) -> &[Joint] {
        &self.passive_joints
    }

    /// Active joints followed by passive joints.
    pub fn all_joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter().chain(self.passive_joints.iter())
    }

    /// Look up a joint by identity.
    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        if id.body != self.id {
            return None;
        }
        if id.passive {
            self.passive_joints.get(id.index)
        } else {
            self.joints.get(id.index)
        }
    }

    /// Total degrees of freedom of the active joints.
    pub fn dof(&self) -> usize {
        self.dof_values.len()
    }

    /// Current DOF values.
    pub fn dof_values(&self) -> &[f64] {
        &self.dof_values
    }

    /// Value of DOF `axis` of `joint`; passive joints report zero.
    pub fn joint_value(&self, joint: &Joint, axis: usize) -> f64 {
        joint
            .dof_index
            .and_then(|start| self.dof_values.get(start + axis))
            .copied()
            .unwrap_or(0.0)
    }

    /// Base transform.
    pub fn transform(&self) -> Pose {
        self.transform
    }

    /// Counter incremented on every state change.
    pub fn update_stamp(&self) -> u64 {
        self.update_stamp
    }

    /// Packed index pairs of links connected by a joint, see [`pack_link_pair`].
    pub fn adjacent_links(&self) -> &HashSet<u32> {
        &self.adjacent_links
    }

    /// Whether two links are adjacent.
    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        self.adjacent_links.contains(&pack_link_pair(a, b))
    }

    /// Whether two links are connected through joints that cannot move.
    ///
    /// Out-of-range indices are never attached.
    pub fn are_rigidly_attached(&self, a: usize, b: usize) -> bool {
        if a >= self.links.len() || b >= self.links.len() {
            return false;
        }
        if a == b {
            return true;
        }
        let mut visited = vec![false; self.links.len()];
        let mut stack = vec![a];
        while let Some(i) = stack.pop() {
            if i == b {
                return true;
            }
            if std::mem::replace(&mut visited[i], true) {
                continue;
            }
            for joint in self.all_joints().filter(|j| j.is_static()) {
                match (joint.first, joint.second) {
                    (Some(x), Some(y)) if x == i => stack.push(y),
                    (Some(x), Some(y)) if y == i => stack.push(x),
                    _ => {}
                }
            }
        }
        false
    }

    /// Link transforms and DOF branch selectors read in one pass.
    ///
    /// Circular revolute DOFs report how many full turns their value spans;
    /// every other DOF reports zero.
    pub fn link_transformations(&self) -> (Vec<Pose>, Vec<i32>) {
        let transforms = self.links.iter().map(Link::transform).collect();
        let mut branches = vec![0; self.dof()];
        for joint in &self.joints {
            let Some(start) = joint.dof_index else { continue };
            if !(joint.is_circular() && joint.kind().is_revolute()) {
                continue;
            }
            for i in start..start + joint.dof() {
                branches[i] = ((self.dof_values[i] + PI) / TAU).floor() as i32;
            }
        }
        (transforms, branches)
    }

    /// World anchor of `joint`, following its first link.
    pub fn joint_world_anchor(&self, joint: &Joint) -> Vec3 {
        self.joint_frame(joint).transform_point(&joint.anchor())
    }

    /// World direction of axis `i` of `joint`, following its first link.
    pub fn joint_world_axis(&self, joint: &Joint, i: usize) -> Vec3 {
        self.joint_frame(joint).rotate(&joint.axis(i))
    }

    // maps the body frame at zero configuration onto the first link's current placement
    fn joint_frame(&self, joint: &Joint) -> Pose {
        match joint.first.and_then(|i| self.links.get(i)) {
            Some(link) => link.transform * link.info.transform.inverse(),
            None => self.transform,
        }
    }

    /// Set the base transform and recompute every link.
    pub fn set_transform(&mut self, transform: Pose) {
        self.transform = transform;
        self.update_link_transforms();
        self.changed(BodyProperty::LinkTransforms);
    }

    /// Set all DOF values and recompute every link.
    pub fn set_dof_values(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.dof_values.len() {
            return Err(ModelError::DofMismatch {
                expected: self.dof_values.len(),
                actual: values.len(),
            });
        }
        self.dof_values.copy_from_slice(values);
        self.update_link_transforms();
        self.changed(BodyProperty::LinkTransforms);
        Ok(())
    }

    /// Override one link's world transform without touching the others.
    pub fn set_link_transform(&mut self, index: usize, transform: Pose) -> Result<()> {
        let link = self
            .links
            .get_mut(index)
            .ok_or(ModelError::LinkIndex(index))?;
        link.transform = transform;
        self.changed(BodyProperty::LinkTransforms);
        Ok(())
    }

    /// Replace the geometry of a link.
    pub fn set_link_geometries(&mut self, index: usize, geometries: Vec<GeometryInfo>) -> Result<()> {
        let link = self
            .links
            .get_mut(index)
            .ok_or(ModelError::LinkIndex(index))?;
        link.info.geometries = geometries;
        self.changed(BodyProperty::LinkGeometry);
        Ok(())
    }

    /// Enable or disable collision for a link.
    pub fn set_link_enabled(&mut self, index: usize, enabled: bool) -> Result<()> {
        let link = self
            .links
            .get_mut(index)
            .ok_or(ModelError::LinkIndex(index))?;
        if link.enabled != enabled {
            link.enabled = enabled;
            self.changed(BodyProperty::LinkEnable);
        }
        Ok(())
    }

    /// Call `callback` with this body's id whenever `property` changes.
    ///
    /// The callback stays registered until the returned subscription is dropped.
    pub fn register_change_callback<F>(
        &mut self,
        property: BodyProperty,
        callback: F,
    ) -> ChangeSubscription
    where
        F: Fn(BodyId) + Send + Sync + 'static,
    {
        let (subscription, token) = ChangeSubscription::new();
        self.subscribers.retain(Subscriber::is_alive);
        self.subscribers.push(Subscriber {
            property,
            token,
            callback: Arc::new(callback),
        });
        subscription
    }

    /// Number of live change callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|s| s.is_alive()).count()
    }

    fn changed(&mut self, property: BodyProperty) {
        self.update_stamp += 1;
        self.subscribers.retain(Subscriber::is_alive);
        for subscriber in self.subscribers.iter().filter(|s| s.property == property) {
            (subscriber.callback)(self.id);
        }
    }

    fn update_link_transforms(&mut self) {
        let mut motion: Vec<Option<Pose>> = vec![None; self.links.len()];
        for joint in &self.joints {
            let Some(child) = joint.second else { continue };
            let base = joint
                .first
                .and_then(|p| motion[p])
                .unwrap_or_else(Pose::identity);
            let start = joint.dof_index.unwrap_or(0);
            let values = &self.dof_values[start..start + joint.dof()];
            motion[child] = Some(base * joint.motion(values));
        }
        for joint in &self.passive_joints {
            if let (Some(parent), Some(child)) = (joint.first, joint.second) {
                if motion[child].is_none() {
                    motion[child] = motion[parent];
                }
            }
        }
        for (link, m) in self.links.iter_mut().zip(motion) {
            link.transform = self.transform * m.unwrap_or_else(Pose::identity) * link.info.transform;
        }
    }
}

impl fmt::Debug for KinBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinBody")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("links", &self.links.len())
            .field("dof", &self.dof())
            .field("update_stamp", &self.update_stamp)
            .finish_non_exhaustive()
    }
}

/// Snapshot of a body's pose state, restored when the saver is dropped.
///
/// The saver dereferences to the body so it can be mutated while the
/// snapshot is held.
pub struct KinBodyStateSaver<'a> {
    body: &'a mut KinBody,
    transform: Pose,
    dof_values: Vec<f64>,
    link_transforms: Vec<Pose>,
}

impl<'a> KinBodyStateSaver<'a> {
    /// Snapshot `body`.
    pub fn new(body: &'a mut KinBody) -> Self {
        Self {
            transform: body.transform,
            dof_values: body.dof_values.clone(),
            link_transforms: body.links.iter().map(Link::transform).collect(),
            body,
        }
    }

    fn restore(&mut self) {
        let body = &mut *self.body;
        body.transform = self.transform;
        body.dof_values.clone_from(&self.dof_values);
        for (link, t) in body.links.iter_mut().zip(&self.link_transforms) {
            link.transform = *t;
        }
        body.changed(BodyProperty::LinkTransforms);
    }
}

impl Deref for KinBodyStateSaver<'_> {
    type Target = KinBody;

    fn deref(&self) -> &KinBody {
        &*self.body
    }
}

impl DerefMut for KinBodyStateSaver<'_> {
    fn deref_mut(&mut self) -> &mut KinBody {
        &mut *self.body
    }
}

impl Drop for KinBodyStateSaver<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
