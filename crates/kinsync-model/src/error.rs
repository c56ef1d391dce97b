//! Error types for the kinematic model.

use thiserror::Error;

/// Errors raised while building or mutating a kinematic body.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Body description without links.
    #[error("body {0} has no links")]
    EmptyBody(String),

    /// Joint names a link the body does not have.
    #[error("joint {joint} references unknown link {link}")]
    UnknownLink {
        /// Joint name.
        joint: String,
        /// Missing link name.
        link: String,
    },

    /// Joint declares fewer axes than its type needs.
    #[error("joint {joint} needs {expected} axes, got {actual}")]
    AxisCount {
        /// Joint name.
        joint: String,
        /// Axes required by the joint type.
        expected: usize,
        /// Axes supplied.
        actual: usize,
    },

    /// Wrong number of DOF values.
    #[error("expected {expected} DOF values, got {actual}")]
    DofMismatch {
        /// Body DOF.
        expected: usize,
        /// Values supplied.
        actual: usize,
    },

    /// Link index out of range.
    #[error("link index {0} out of range")]
    LinkIndex(usize),

    /// Malformed JSON body description.
    #[error("invalid body description: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
