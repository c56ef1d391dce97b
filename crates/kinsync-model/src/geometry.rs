//! Link geometry descriptions and bounding boxes.

use serde::{Deserialize, Serialize};

use crate::pose::{Pose, Vec3};

/// Geometry primitive attached to a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryKind {
    /// Placeholder with no extent.
    None,
    /// Box centered at the geometry origin.
    Box {
        /// Half extents along each axis.
        extents: Vec3,
    },
    /// Sphere centered at the geometry origin.
    Sphere {
        /// Radius.
        radius: f64,
    },
    /// Cylinder along the local Z axis, centered at the geometry origin.
    Cylinder {
        /// Radius.
        radius: f64,
        /// Full height.
        height: f64,
    },
    /// Triangle mesh in the geometry frame.
    TriMesh {
        /// Vertex positions.
        vertices: Vec<Vec3>,
        /// Triangle indices, three per face.
        indices: Vec<u32>,
    },
}

/// A geometry placed in its link's frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryInfo {
    /// Pose of the geometry relative to the link origin.
    #[serde(default)]
    pub transform: Pose,
    /// Shape.
    pub kind: GeometryKind,
}

impl GeometryInfo {
    /// Geometry at the link origin.
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            transform: Pose::identity(),
            kind,
        }
    }

    /// Geometry placed at `transform` in the link frame.
    pub fn with_transform(kind: GeometryKind, transform: Pose) -> Self {
        Self { transform, kind }
    }

    /// Bounding box of this geometry expressed in the link frame.
    ///
    /// Returns `None` for geometry without extent.
    pub fn compute_aabb(&self) -> Option<Aabb> {
        let corners = |half: Vec3| {
            let mut pts = Vec::with_capacity(8);
            for sx in [-1.0, 1.0] {
                for sy in [-1.0, 1.0] {
                    for sz in [-1.0, 1.0] {
                        let local = Vec3::new(sx * half.x, sy * half.y, sz * half.z);
                        pts.push(self.transform.transform_point(&local));
                    }
                }
            }
            pts
        };

        match &self.kind {
            GeometryKind::None => None,
            GeometryKind::Box { extents } => Aabb::from_points(corners(*extents)),
            GeometryKind::Sphere { radius } => Some(Aabb {
                pos: self.transform.trans,
                extents: Vec3::repeat(*radius),
            }),
            GeometryKind::Cylinder { radius, height } => {
                Aabb::from_points(corners(Vec3::new(*radius, *radius, height * 0.5)))
            }
            GeometryKind::TriMesh { vertices, .. } => Aabb::from_points(
                vertices.iter().map(|v| self.transform.transform_point(v)),
            ),
        }
    }
}

/// Axis-aligned bounding box stored as center plus half extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Center.
    pub pos: Vec3,
    /// Half extents.
    pub extents: Vec3,
}

impl Aabb {
    /// Smallest box containing every point, or `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p)));
        Some(Self::from_min_max(min, max))
    }

    /// Box from its min and max corners.
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            pos: (min + max) * 0.5,
            extents: (max - min) * 0.5,
        }
    }

    /// Min corner.
    pub fn min(&self) -> Vec3 {
        self.pos - self.extents
    }

    /// Max corner.
    pub fn max(&self) -> Vec3 {
        self.pos + self.extents
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Self::from_min_max(self.min().inf(&other.min()), self.max().sup(&other.max()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_box_aabb_rotated() {
        let geom = GeometryInfo::with_transform(
            GeometryKind::Box {
                extents: Vec3::new(1.0, 2.0, 3.0),
            },
            Pose::from_axis_angle(&Vec3::z(), FRAC_PI_2),
        );
        let bb = geom.compute_aabb().unwrap();
        assert_relative_eq!(bb.extents, Vec3::new(2.0, 1.0, 3.0), epsilon = 1e-12);
        assert_relative_eq!(bb.pos, Vec3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_aabb_offset() {
        let geom = GeometryInfo::with_transform(
            GeometryKind::Sphere { radius: 0.5 },
            Pose::from_translation(Vec3::new(0.0, 0.0, 1.0)),
        );
        let bb = geom.compute_aabb().unwrap();
        assert_relative_eq!(bb.min(), Vec3::new(-0.5, -0.5, 0.5));
        assert_relative_eq!(bb.max(), Vec3::new(0.5, 0.5, 1.5));
    }

    #[test]
    fn test_cylinder_aabb() {
        let geom = GeometryInfo::new(GeometryKind::Cylinder {
            radius: 0.1,
            height: 1.0,
        });
        let bb = geom.compute_aabb().unwrap();
        assert_relative_eq!(bb.extents, Vec3::new(0.1, 0.1, 0.5));
    }

    #[test]
    fn test_none_has_no_aabb() {
        assert!(GeometryInfo::new(GeometryKind::None).compute_aabb().is_none());
        let empty_mesh = GeometryInfo::new(GeometryKind::TriMesh {
            vertices: vec![],
            indices: vec![],
        });
        assert!(empty_mesh.compute_aabb().is_none());
    }

    #[test]
    fn test_union() {
        let a = Aabb::from_min_max(Vec3::zeros(), Vec3::repeat(1.0));
        let b = Aabb::from_min_max(Vec3::repeat(-1.0), Vec3::new(0.5, 0.5, 2.0));
        let u = a.union(&b);
        assert_relative_eq!(u.min(), Vec3::repeat(-1.0));
        assert_relative_eq!(u.max(), Vec3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn test_geometry_json() {
        let json = r#"{"kind": {"type": "sphere", "radius": 0.25}}"#;
        let geom: GeometryInfo = serde_json::from_str(json).unwrap();
        assert_eq!(geom.kind, GeometryKind::Sphere { radius: 0.25 });
        assert_eq!(geom.transform, Pose::identity());
    }
}
