//! Rigid links.

use serde::{Deserialize, Serialize};

use crate::env::BodyId;
use crate::geometry::{Aabb, GeometryInfo};
use crate::pose::{Pose, Vec3};

/// Declarative description of a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInfo {
    /// Unique name within the body.
    pub name: String,
    /// Pose relative to the body frame when every DOF is zero.
    #[serde(default)]
    pub transform: Pose,
    /// Attached geometries, in the link frame.
    #[serde(default)]
    pub geometries: Vec<GeometryInfo>,
    /// Mass in kg.
    #[serde(default)]
    pub mass: f64,
    /// Frame in which the inertia tensor is diagonal, relative to the link origin.
    #[serde(default)]
    pub mass_frame: Pose,
    /// Principal moments of inertia about `mass_frame`.
    #[serde(default = "Vec3::zeros")]
    pub inertia_moments: Vec3,
    /// Static links never move relative to the world.
    #[serde(default)]
    pub is_static: bool,
}

impl LinkInfo {
    /// Link with no geometry, unit mass and inertia centered at its origin.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Pose::identity(),
            geometries: Vec::new(),
            mass: 1.0,
            mass_frame: Pose::identity(),
            inertia_moments: Vec3::repeat(1.0),
            is_static: false,
        }
    }
}

/// A link of an initialized body.
#[derive(Debug, Clone)]
pub struct Link {
    pub(crate) info: LinkInfo,
    pub(crate) index: usize,
    pub(crate) parent: BodyId,
    pub(crate) transform: Pose,
    pub(crate) enabled: bool,
}

impl Link {
    pub(crate) fn new(info: LinkInfo, index: usize) -> Self {
        Self {
            info,
            index,
            parent: BodyId::default(),
            transform: Pose::identity(),
            enabled: true,
        }
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Position in the parent body's link list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Identity of the owning body.
    pub fn parent(&self) -> BodyId {
        self.parent
    }

    /// Current world transform.
    pub fn transform(&self) -> Pose {
        self.transform
    }

    /// Declarative description this link was built from.
    pub fn info(&self) -> &LinkInfo {
        &self.info
    }

    /// Attached geometries.
    pub fn geometries(&self) -> &[GeometryInfo] {
        &self.info.geometries
    }

    /// Mass in kg.
    pub fn mass(&self) -> f64 {
        self.info.mass
    }

    /// Mass frame relative to the link origin.
    pub fn local_mass_frame(&self) -> Pose {
        self.info.mass_frame
    }

    /// Principal moments of inertia about the mass frame.
    pub fn principal_moments_of_inertia(&self) -> Vec3 {
        self.info.inertia_moments
    }

    /// Whether the link is fixed to the world.
    pub fn is_static(&self) -> bool {
        self.info.is_static
    }

    /// Whether the link participates in collision.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Bounding box of all geometries in the link frame.
    ///
    /// A link without geometry yields a zero-size box at its origin.
    pub fn compute_local_aabb(&self) -> Aabb {
        self.info
            .geometries
            .iter()
            .filter_map(GeometryInfo::compute_aabb)
            .reduce(|a, b| a.union(&b))
            .unwrap_or(Aabb {
                pos: Vec3::zeros(),
                extents: Vec3::zeros(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryKind;
    use approx::assert_relative_eq;

    #[test]
    fn test_local_aabb_unions_geometries() {
        let mut info = LinkInfo::new("arm");
        info.geometries = vec![
            GeometryInfo::new(GeometryKind::Box {
                extents: Vec3::new(0.5, 0.1, 0.1),
            }),
            GeometryInfo::with_transform(
                GeometryKind::Sphere { radius: 0.2 },
                Pose::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            ),
        ];
        let link = Link::new(info, 0);
        let bb = link.compute_local_aabb();
        assert_relative_eq!(bb.min(), Vec3::new(-0.5, -0.2, -0.2));
        assert_relative_eq!(bb.max(), Vec3::new(1.2, 0.2, 0.2));
    }

    #[test]
    fn test_empty_link_aabb() {
        let link = Link::new(LinkInfo::new("empty"), 3);
        let bb = link.compute_local_aabb();
        assert_eq!(bb.extents, Vec3::zeros());
        assert_eq!(link.index(), 3);
        assert!(link.is_enabled());
    }
}
