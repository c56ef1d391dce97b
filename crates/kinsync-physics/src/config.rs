//! Space configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How link collision shapes are approximated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeStrategy {
    /// One box sized from the link's local bounding box.
    #[default]
    BoundingBox,
    /// One collider per geometry: box, sphere, cylinder, or mesh.
    ///
    /// Meshes become convex hulls when physics is enabled and triangle
    /// meshes for a collision-only mirror.
    PerGeometry,
}

/// Tunables for a [`PhysicsSpace`](crate::PhysicsSpace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    /// Simulate dynamics; when false every link is a kinematic collision mirror.
    pub physics: bool,
    /// Minimum half extent of a collision box.
    pub margin: f32,
    /// Collision shape approximation.
    pub shape_strategy: ShapeStrategy,
    /// Hinge limit softness, bias and relaxation.
    pub hinge_softness: [f32; 3],
    /// Mass substituted for non-positive link masses.
    pub dummy_mass: f32,
    /// Principal moment substituted on each axis for degenerate inertia.
    pub dummy_inertia: f32,
    /// Collider friction.
    pub friction: f32,
    /// Collider restitution.
    pub restitution: f32,
    /// World gravity.
    pub gravity: [f32; 3],
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            physics: true,
            margin: 0.0005,
            shape_strategy: ShapeStrategy::BoundingBox,
            hinge_softness: [0.9, 0.9, 1.0],
            dummy_mass: 1e-7,
            dummy_inertia: 1e-7,
            friction: 0.5,
            restitution: 0.1,
            gravity: [0.0, 0.0, -9.81],
        }
    }
}

impl SpaceConfig {
    /// Configuration for a pure collision mirror.
    pub fn collision_only() -> Self {
        Self {
            physics: false,
            ..Self::default()
        }
    }

    /// Parse from TOML; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
