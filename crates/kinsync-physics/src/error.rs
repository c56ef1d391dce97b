//! Error types for the physics mirror.

use kinsync_model::{BodyId, JointType, ModelError};
use thiserror::Error;

/// Errors that abort a build, synchronization or lookup.
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Rotation quaternion too far from unit length to trust.
    #[error("malformed rotation: squared quaternion norm deviates from 1 by {deviation}")]
    MalformedRotation {
        /// `|‖q‖² - 1|`.
        deviation: f64,
    },

    /// No physics world is attached.
    #[error("no physics world attached")]
    NotInitialized,

    /// Body has no proxy record.
    #[error("body {0:?} has no physics proxy")]
    UnknownBody(BodyId),

    /// Failed to create collision shape.
    #[error("Failed to create collision shape for {name}: {reason}")]
    CollisionShape {
        /// Link name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// The kinematic model rejected an update.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Malformed space configuration.
    #[error("invalid space configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Non-fatal problems found while building a proxy.
///
/// They are logged and kept on the record; the build continues at
/// reduced fidelity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    /// Joint type has no engine counterpart.
    #[error("joint {joint}: {kind:?} joints are not supported")]
    UnsupportedJoint {
        /// Joint name.
        joint: String,
        /// Joint type.
        kind: JointType,
    },

    /// Joint is not attached to two mirrored links.
    #[error("joint {joint} needs to be attached to two bodies")]
    MissingJointEndpoint {
        /// Joint name.
        joint: String,
    },

    /// Joint axis has zero length.
    #[error("joint {joint} has a degenerate axis")]
    DegenerateAxis {
        /// Joint name.
        joint: String,
    },

    /// Non-positive mass replaced with a dummy value.
    #[error("link {link} mass is {mass}, using dummy mass")]
    DummyMass {
        /// Link name.
        link: String,
        /// Declared mass.
        mass: f64,
    },

    /// Degenerate inertia replaced with a dummy tensor.
    #[error("link {link} has degenerate inertia, using dummy inertia")]
    DummyInertia {
        /// Link name.
        link: String,
    },

    /// Geometry approximated by its bounding box.
    #[error("link {link}: {reason}, using bounding box")]
    ShapeFallback {
        /// Link name.
        link: String,
        /// Why the requested shape could not be built.
        reason: String,
    },
}

/// Result type for physics mirror operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;
