#![warn(missing_docs)]

//! Rapier mirror for kinsync kinematic bodies.
//!
//! A [`PhysicsSpace`] keeps one proxy per body of a
//! [`kinsync_model::Environment`]: every link becomes a Rapier rigid body
//! with colliders, every supported joint becomes an impulse joint, and an
//! update-stamp check decides when link poses need pushing again.
//!
//! # Features
//!
//! - Lazy proxy construction, full rebuild on geometry change
//! - Hinge, slider and ball joints with limit realignment
//! - Bounding-box or per-geometry collision shapes
//! - Collision-only mirrors with every link kinematic
//! - Engine poses pulled back into the model after a dynamics step
//!
//! # Example
//!
//! ```
//! use kinsync_model::{Environment, JointInfo, JointType, KinBody, KinBodyInfo, LinkInfo, Vec3};
//! use kinsync_physics::{PhysicsSpace, SpaceConfig};
//!
//! let mut env = Environment::new();
//! let id = env.add_body(
//!     KinBody::from_info(KinBodyInfo {
//!         name: "arm".into(),
//!         links: vec![LinkInfo::new("base"), LinkInfo::new("forearm")],
//!         joints: vec![JointInfo::new("elbow", JointType::Hinge, "base", "forearm").axis(Vec3::z())],
//!         passive_joints: vec![],
//!     })
//!     .unwrap(),
//! );
//!
//! let mut space = PhysicsSpace::with_new_world(SpaceConfig::collision_only());
//! space.synchronize_all(&mut env).unwrap();
//! assert_eq!(space.record(id).unwrap().links().len(), 2);
//!
//! env.body_mut(id).unwrap().set_dof_values(&[0.5]).unwrap();
//! space.synchronize_all(&mut env).unwrap();
//! ```

pub mod bridge;
mod builder;
mod colliders;
mod config;
mod error;
mod joints;
mod link;
mod record;
mod space;
mod sync;
mod world;

pub use config::{ShapeStrategy, SpaceConfig};
pub use error::{PhysicsError, Result, StructuralError};
pub use joints::{hinge_angle, realign_hinge_limits};
pub use link::{LinkMotion, LinkProxy};
pub use record::{BodyProxyRecord, ConstraintKind, JointConstraint, LimitSoftness};
pub use space::PhysicsSpace;
pub use sync::SyncCallback;
pub use world::PhysicsWorld;
