#![warn(missing_docs)]

//! Articulated kinematic bodies for kinsync.
//!
//! This crate models the host side of the mirror: bodies made of rigid
//! links connected by joints, with forward kinematics, an update stamp
//! that moves on every state change, and change notifications.
//!
//! # Example
//!
//! ```
//! use kinsync_model::{Environment, JointInfo, JointType, KinBody, KinBodyInfo, LinkInfo, Vec3};
//!
//! let body = KinBody::from_info(KinBodyInfo {
//!     name: "arm".into(),
//!     links: vec![LinkInfo::new("base"), LinkInfo::new("forearm")],
//!     joints: vec![JointInfo::new("elbow", JointType::Hinge, "base", "forearm").axis(Vec3::z())],
//!     passive_joints: vec![],
//! })
//! .unwrap();
//!
//! let mut env = Environment::new();
//! let id = env.add_body(body);
//! let stamp = env.body(id).unwrap().update_stamp();
//! env.body_mut(id).unwrap().set_dof_values(&[0.5]).unwrap();
//! assert!(env.body(id).unwrap().update_stamp() > stamp);
//! ```

mod body;
mod callback;
mod env;
mod error;
mod geometry;
mod joint;
mod link;
mod pose;

pub use body::{pack_link_pair, KinBody, KinBodyInfo, KinBodyStateSaver};
pub use callback::{BodyProperty, ChangeSubscription};
pub use env::{BodyId, Environment};
pub use error::{ModelError, Result};
pub use geometry::{Aabb, GeometryInfo, GeometryKind};
pub use joint::{Joint, JointId, JointInfo, JointType};
pub use link::{Link, LinkInfo};
pub use pose::{Pose, Vec3};
