//! Physics world management using Rapier3d.

use nalgebra::{Isometry3, Vector3};
use rapier3d::dynamics::{
    CCDSolver, GenericJoint, ImpulseJointHandle, ImpulseJointSet, IntegrationParameters,
    IslandManager, MultibodyJointSet, RigidBody, RigidBodyHandle, RigidBodySet,
};
use rapier3d::geometry::{BroadPhaseMultiSap, Collider, ColliderHandle, ColliderSet, NarrowPhase};
use rapier3d::pipeline::{PhysicsPipeline, QueryPipeline};

/// A Rapier simulation world that proxies are mirrored into.
///
/// Bodies and joints are inserted and removed by the space; callers read
/// the sets and step the pipeline.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector3<f32>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    pub(crate) impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    /// Create an empty world with z-up gravity.
    pub fn new() -> Self {
        Self::with_gravity(Vector3::new(0.0, 0.0, -9.81))
    }

    /// Create an empty world with the given gravity.
    pub fn with_gravity(gravity: Vector3<f32>) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity,
            integration_params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Step the physics simulation by dt seconds.
    pub fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt;

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Set gravity vector.
    pub fn set_gravity(&mut self, x: f32, y: f32, z: f32) {
        self.gravity = Vector3::new(x, y, z);
    }

    /// Current gravity.
    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    /// All rigid bodies.
    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    /// All colliders.
    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    /// All impulse joints.
    pub fn impulse_joints(&self) -> &ImpulseJointSet {
        &self.impulse_joints
    }

    /// Pose of a rigid body, if it exists.
    pub fn body_position(&self, handle: RigidBodyHandle) -> Option<&Isometry3<f32>> {
        self.bodies.get(handle).map(RigidBody::position)
    }

    /// Number of rigid bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of impulse joints.
    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    /// Number of colliders.
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub(crate) fn insert_body(
        &mut self,
        body: RigidBody,
        colliders: Vec<Collider>,
    ) -> (RigidBodyHandle, Vec<ColliderHandle>) {
        let handle = self.bodies.insert(body);
        let colliders = colliders
            .into_iter()
            .map(|c| self.colliders.insert_with_parent(c, handle, &mut self.bodies))
            .collect();
        (handle, colliders)
    }

    /// Remove a body along with its colliders and attached joints.
    pub(crate) fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub(crate) fn insert_joint(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        joint: GenericJoint,
    ) -> ImpulseJointHandle {
        self.impulse_joints.insert(body1, body2, joint, true)
    }

    pub(crate) fn remove_joint(&mut self, handle: ImpulseJointHandle) {
        self.impulse_joints.remove(handle, true);
    }

    pub(crate) fn set_colliders_enabled(&mut self, handles: &[ColliderHandle], enabled: bool) {
        for &handle in handles {
            if let Some(collider) = self.colliders.get_mut(handle) {
                if collider.is_enabled() != enabled {
                    collider.set_enabled(enabled);
                }
            }
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
