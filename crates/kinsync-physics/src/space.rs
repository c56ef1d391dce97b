//! The space registry: owns every proxy record and the attached world.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};

use kinsync_model::{BodyId, BodyProperty, Environment, Joint, KinBody, Link};
use nalgebra::Vector3;
use tracing::{debug, warn};

use crate::builder;
use crate::config::SpaceConfig;
use crate::error::{PhysicsError, Result};
use crate::link::{LinkMotion, LinkProxy};
use crate::record::{BodyProxyRecord, JointConstraint};
use crate::sync::{synchronize_record, SyncCallback};
use crate::world::PhysicsWorld;

/// Mirrors the bodies of an [`Environment`] into a [`PhysicsWorld`].
///
/// Records are built lazily the first time a body is synchronized, rebuilt
/// when its geometry changes, and dropped when the body leaves the
/// environment or the world is detached. Every engine object a record
/// created is removed before the record goes away.
pub struct PhysicsSpace {
    config: SpaceConfig,
    world: Option<PhysicsWorld>,
    records: HashMap<BodyId, BodyProxyRecord>,
    sync_callback: Option<SyncCallback>,
    geometry_tx: Sender<BodyId>,
    geometry_rx: Receiver<BodyId>,
    pending_rebuilds: HashSet<BodyId>,
}

impl PhysicsSpace {
    /// Detached space with the given configuration.
    pub fn new(config: SpaceConfig) -> Self {
        let (geometry_tx, geometry_rx) = mpsc::channel();
        Self {
            config,
            world: None,
            records: HashMap::new(),
            sync_callback: None,
            geometry_tx,
            geometry_rx,
            pending_rebuilds: HashSet::new(),
        }
    }

    /// Space attached to a fresh world using the configured gravity.
    pub fn with_new_world(config: SpaceConfig) -> Self {
        let [x, y, z] = config.gravity;
        let mut space = Self::new(config);
        space.attach(PhysicsWorld::with_gravity(Vector3::new(x, y, z)));
        space
    }

    /// Configuration.
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// Bind `world`. A previously attached world is detached and dropped.
    pub fn attach(&mut self, world: PhysicsWorld) {
        if self.world.is_some() {
            warn!("attaching a physics world while another is attached, detaching the old one");
            self.detach();
        }
        self.world = Some(world);
        debug!("attached physics world");
    }

    /// Remove every mirrored body and joint, drop all records, and hand
    /// back the world.
    pub fn detach(&mut self) -> Option<PhysicsWorld> {
        let mut world = self.world.take()?;
        for (_, mut record) in self.records.drain() {
            record.reset(&mut world);
        }
        // pending rebuilds refer to records that no longer exist
        self.geometry_rx.try_iter().for_each(drop);
        self.pending_rebuilds.clear();
        debug!(bodies = world.body_count(), "detached physics world");
        Some(world)
    }

    /// Whether a world is attached.
    pub fn is_initialized(&self) -> bool {
        self.world.is_some()
    }

    /// The attached world.
    pub fn world(&self) -> Option<&PhysicsWorld> {
        self.world.as_ref()
    }

    /// The attached world, mutably.
    pub fn world_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.world.as_mut()
    }

    /// Record of `body`, if one has been built.
    pub fn record(&self, body: BodyId) -> Option<&BodyProxyRecord> {
        self.records.get(&body)
    }

    /// All records.
    pub fn records(&self) -> impl Iterator<Item = &BodyProxyRecord> {
        self.records.values()
    }

    /// Observe every synchronization pass.
    pub fn set_synchronization_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&BodyProxyRecord) + 'static,
    {
        self.sync_callback = Some(Box::new(callback));
    }

    /// Stop observing synchronization passes.
    pub fn clear_synchronization_callback(&mut self) {
        self.sync_callback = None;
    }

    /// Build, or fully rebuild, the proxy of `body` and synchronize it once.
    pub fn build_proxy(&mut self, body: &mut KinBody) -> Result<&BodyProxyRecord> {
        let id = body.id();
        self.collect_geometry_changes();
        self.pending_rebuilds.remove(&id);
        let world = self.world.as_mut().ok_or(PhysicsError::NotInitialized)?;
        let existing = self.records.remove(&id);
        let mut record = builder::build_proxy(world, body, existing, &self.config)?;

        if record.change_subscription.is_none() {
            let tx = self.geometry_tx.clone();
            record.change_subscription = Some(body.register_change_callback(
                BodyProperty::LinkGeometry,
                move |id| {
                    // the space may already be gone
                    let _ = tx.send(id);
                },
            ));
        }

        if let Err(e) = synchronize_record(world, &mut record, body, self.sync_callback.as_mut()) {
            record.reset(world);
            return Err(e);
        }
        Ok(&*self.records.entry(id).or_insert(record))
    }

    /// Bring the proxy of `body` up to date, building it first if needed.
    ///
    /// A body whose geometry changed since its last build is rebuilt.
    /// Otherwise nothing is pushed when the body has not changed since the
    /// last pass.
    pub fn synchronize_one(&mut self, body: &mut KinBody) -> Result<()> {
        self.collect_geometry_changes();
        let tracked = self.records.contains_key(&body.id());
        if !tracked || self.pending_rebuilds.contains(&body.id()) {
            if tracked {
                debug!(body = %body.name(), "geometry changed, rebuilding physics proxy");
            }
            self.build_proxy(body)?;
            return Ok(());
        }
        let world = self.world.as_mut().ok_or(PhysicsError::NotInitialized)?;
        let record = self
            .records
            .get_mut(&body.id())
            .ok_or(PhysicsError::UnknownBody(body.id()))?;
        check_identity(record, body.id());
        if record.last_sync_stamp != body.update_stamp() {
            synchronize_record(world, record, body, self.sync_callback.as_mut())?;
        }
        Ok(())
    }

    /// Rebuild bodies whose geometry changed, drop records of bodies that
    /// left `env`, then synchronize every body in `env`.
    pub fn synchronize_all(&mut self, env: &mut Environment) -> Result<()> {
        if !self.is_initialized() {
            return Err(PhysicsError::NotInitialized);
        }
        self.process_geometry_changes(env)?;

        let orphans: Vec<BodyId> = self
            .records
            .keys()
            .filter(|id| !env.contains(**id))
            .copied()
            .collect();
        for id in orphans {
            self.remove_proxy(id);
        }

        for id in env.body_ids() {
            if let Some(body) = env.body_mut(id) {
                self.synchronize_one(body)?;
            }
        }
        Ok(())
    }

    /// Rebuild every tracked body that reported a geometry change.
    ///
    /// Every pending body is attempted even when an earlier rebuild fails;
    /// the first failure is returned afterwards and the failed body is left
    /// without a record, to be built again on its next synchronization.
    /// Returns the number of rebuilt proxies.
    pub fn process_geometry_changes(&mut self, env: &mut Environment) -> Result<usize> {
        self.collect_geometry_changes();
        let pending = std::mem::take(&mut self.pending_rebuilds);
        let mut rebuilt = 0;
        let mut first_error = None;
        for id in pending {
            if !self.records.contains_key(&id) {
                continue;
            }
            match env.body_mut(id) {
                Some(body) => {
                    debug!(body = %body.name(), "geometry changed, rebuilding physics proxy");
                    match self.build_proxy(body) {
                        Ok(_) => rebuilt += 1,
                        Err(e) => {
                            warn!(body = %body.name(), error = %e, "physics proxy rebuild failed");
                            first_error.get_or_insert(e);
                        }
                    }
                }
                None => {
                    self.remove_proxy(id);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(rebuilt),
        }
    }

    /// Move queued change notifications into the pending set.
    fn collect_geometry_changes(&mut self) {
        self.pending_rebuilds.extend(self.geometry_rx.try_iter());
    }

    /// Remove the proxy of `body` from the world and forget it.
    ///
    /// Returns whether a record existed.
    pub fn remove_proxy(&mut self, body: BodyId) -> bool {
        self.pending_rebuilds.remove(&body);
        let Some(mut record) = self.records.remove(&body) else {
            return false;
        };
        if let Some(world) = self.world.as_mut() {
            record.reset(world);
        }
        debug!(body = ?body, "removed physics proxy");
        true
    }

    /// Proxy of `link`.
    ///
    /// # Panics
    ///
    /// When the record found for the link's body mirrors a different body or
    /// is not index-aligned with it.
    pub fn lookup_link(&self, link: &Link) -> Result<&LinkProxy> {
        let record = self
            .records
            .get(&link.parent())
            .ok_or(PhysicsError::UnknownBody(link.parent()))?;
        check_identity(record, link.parent());
        match record.links.get(link.index()) {
            Some(proxy) if proxy.link_index == link.index() => Ok(proxy),
            _ => panic!(
                "consistency violation: no proxy aligned with link {} ({})",
                link.index(),
                link.name()
            ),
        }
    }

    /// Engine constraint of `joint`, or `None` when it was not constructed.
    ///
    /// # Panics
    ///
    /// When the record found for the joint's body mirrors a different body.
    pub fn lookup_joint_constraint(&self, joint: &Joint) -> Result<Option<&JointConstraint>> {
        let record = self
            .records
            .get(&joint.parent())
            .ok_or(PhysicsError::UnknownBody(joint.parent()))?;
        check_identity(record, joint.parent());
        Ok(record.joint_constraints.get(&joint.id()))
    }

    /// Copy the engine pose of every dynamic link back into `body`.
    ///
    /// The record is marked synchronized afterwards, so the next pass does
    /// not push the same poses back.
    pub fn pull_from_engine(&mut self, body: &mut KinBody) -> Result<()> {
        let world = self.world.as_ref().ok_or(PhysicsError::NotInitialized)?;
        let record = self
            .records
            .get_mut(&body.id())
            .ok_or(PhysicsError::UnknownBody(body.id()))?;
        check_identity(record, body.id());

        for proxy in record.links.iter().filter(|p| p.motion == LinkMotion::Dynamic) {
            if let Some(transform) = proxy.engine_transform(world) {
                proxy.set_world_transform(body, &transform)?;
            }
        }
        record.last_sync_stamp = body.update_stamp();
        Ok(())
    }

    /// Advance the attached world by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> Result<()> {
        self.world
            .as_mut()
            .ok_or(PhysicsError::NotInitialized)?
            .step(dt);
        Ok(())
    }
}

impl Default for PhysicsSpace {
    fn default() -> Self {
        Self::new(SpaceConfig::default())
    }
}

fn check_identity(record: &BodyProxyRecord, body: BodyId) {
    if record.body != body {
        panic!(
            "consistency violation: record for {:?} mirrors {:?}",
            body, record.body
        );
    }
}
