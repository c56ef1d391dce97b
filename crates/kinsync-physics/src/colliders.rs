//! Collision shape generation from link geometry.

use std::f32::consts::FRAC_PI_2;

use kinsync_model::{GeometryInfo, GeometryKind, Link, Pose, Vec3};
use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use parry3d::shape::{ConvexPolyhedron, SharedShape, TriMesh};
use rapier3d::geometry::{Collider, ColliderBuilder};
use tracing::warn;

use crate::bridge::{to_engine_point, to_engine_transform, to_engine_vector};
use crate::config::{ShapeStrategy, SpaceConfig};
use crate::error::{PhysicsError, Result, StructuralError};

/// Colliders for one link, plus any shape approximations made on the way.
#[derive(Default)]
pub(crate) struct LinkColliders {
    pub(crate) colliders: Vec<Collider>,
    pub(crate) fallbacks: Vec<StructuralError>,
}

/// Build the colliders of `link`, placed in the frame of its rigid body.
///
/// The rigid body sits at the link's mass frame, so every shape is offset by
/// the inverse of that frame. Only a malformed pose is an error; shapes that
/// cannot be built fall back to their bounding box.
pub(crate) fn link_colliders(link: &Link, config: &SpaceConfig) -> Result<LinkColliders> {
    let body_from_link = link.local_mass_frame().inverse();
    let mut out = LinkColliders::default();

    match config.shape_strategy {
        ShapeStrategy::BoundingBox => {
            let aabb = link.compute_local_aabb();
            let shape = cuboid(&aabb.extents, config.margin);
            let position =
                to_engine_transform(&(body_from_link * Pose::from_translation(aabb.pos)))?;
            out.colliders.push(collider(shape, position, link, config));
        }
        ShapeStrategy::PerGeometry => {
            for geometry in link.geometries() {
                let position = to_engine_transform(&(body_from_link * geometry.transform))?;
                let shape = match geometry_shape(geometry, link.name(), config) {
                    Ok(Some(shape)) => shape,
                    Ok(None) => continue,
                    Err(PhysicsError::CollisionShape { reason, .. }) => {
                        warn!(link = %link.name(), %reason, "collision shape fell back to bounding box");
                        out.fallbacks.push(StructuralError::ShapeFallback {
                            link: link.name().to_string(),
                            reason,
                        });
                        let Some(aabb) = geometry.compute_aabb() else { continue };
                        let position = to_engine_transform(
                            &(body_from_link * Pose::from_translation(aabb.pos)),
                        )?;
                        out.colliders
                            .push(collider(cuboid(&aabb.extents, config.margin), position, link, config));
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                let position = match geometry.kind {
                    // host cylinders run along z, parry's along y
                    GeometryKind::Cylinder { .. } => {
                        position * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2)
                    }
                    _ => position,
                };
                out.colliders.push(collider(shape, position, link, config));
            }
        }
    }

    Ok(out)
}

fn collider(
    shape: SharedShape,
    position: Isometry3<f32>,
    link: &Link,
    config: &SpaceConfig,
) -> Collider {
    // mass comes from the link, not from shape volume
    ColliderBuilder::new(shape)
        .position(position)
        .density(0.0)
        .friction(config.friction)
        .restitution(config.restitution)
        .enabled(link.is_enabled())
        .build()
}

fn cuboid(half_extents: &Vec3, margin: f32) -> SharedShape {
    let h = to_engine_vector(half_extents).map(|e| e.max(margin));
    SharedShape::cuboid(h.x, h.y, h.z)
}

/// Shape for a single geometry in its own frame; `None` for empty geometry.
fn geometry_shape(
    geometry: &GeometryInfo,
    name: &str,
    config: &SpaceConfig,
) -> Result<Option<SharedShape>> {
    let shape = match &geometry.kind {
        GeometryKind::None => return Ok(None),
        GeometryKind::Box { extents } => cuboid(extents, config.margin),
        GeometryKind::Sphere { radius } => SharedShape::ball((*radius as f32).max(config.margin)),
        GeometryKind::Cylinder { radius, height } => SharedShape::cylinder(
            (*height as f32 * 0.5).max(config.margin),
            (*radius as f32).max(config.margin),
        ),
        GeometryKind::TriMesh { vertices, indices } => {
            let points: Vec<Point3<f32>> = vertices.iter().map(to_engine_point).collect();
            if config.physics {
                create_convex_hull(&points, name)?
            } else {
                create_trimesh(points, indices, name)?
            }
        }
    };
    Ok(Some(shape))
}

fn create_convex_hull(points: &[Point3<f32>], name: &str) -> Result<SharedShape> {
    if points.len() < 4 {
        return Err(shape_error(name, "Need at least 4 points for convex hull"));
    }

    ConvexPolyhedron::from_convex_hull(points)
        .map(SharedShape::new)
        .ok_or_else(|| shape_error(name, "degenerate convex hull"))
}

fn create_trimesh(points: Vec<Point3<f32>>, indices: &[u32], name: &str) -> Result<SharedShape> {
    let triangles: Vec<[u32; 3]> = indices
        .chunks_exact(3)
        .map(|i| [i[0], i[1], i[2]])
        .collect();

    if triangles.is_empty() {
        return Err(shape_error(name, "No triangles in mesh"));
    }
    if let Some(bad) = triangles.iter().flatten().find(|&&i| i as usize >= points.len()) {
        return Err(shape_error(name, &format!("triangle index {bad} out of range")));
    }

    match TriMesh::new(points, triangles) {
        Ok(trimesh) => Ok(SharedShape::new(trimesh)),
        Err(e) => Err(shape_error(name, &format!("Failed to create trimesh: {:?}", e))),
    }
}

fn shape_error(name: &str, reason: &str) -> PhysicsError {
    PhysicsError::CollisionShape {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kinsync_model::{KinBody, KinBodyInfo, LinkInfo};
    use parry3d::shape::ShapeType;

    fn link_with(geometries: Vec<GeometryInfo>, mass_frame: Pose) -> KinBody {
        let mut info = LinkInfo::new("part");
        info.geometries = geometries;
        info.mass_frame = mass_frame;
        KinBody::from_info(KinBodyInfo {
            name: "part".into(),
            links: vec![info],
            joints: vec![],
            passive_joints: vec![],
        })
        .unwrap()
    }

    fn tetrahedron() -> GeometryKind {
        GeometryKind::TriMesh {
            vertices: vec![
                Vec3::zeros(),
                Vec3::x(),
                Vec3::y(),
                Vec3::z(),
            ],
            indices: vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3],
        }
    }

    #[test]
    fn test_bounding_box_offset_by_mass_frame() {
        let body = link_with(
            vec![GeometryInfo::with_transform(
                GeometryKind::Box {
                    extents: Vec3::new(0.5, 0.25, 0.1),
                },
                Pose::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            )],
            Pose::from_translation(Vec3::new(0.25, 0.0, 0.0)),
        );
        let built = link_colliders(&body.links()[0], &SpaceConfig::default()).unwrap();
        assert_eq!(built.colliders.len(), 1);
        let c = &built.colliders[0];
        let cuboid = c.shape().as_cuboid().unwrap();
        assert_relative_eq!(cuboid.half_extents, Vector3::new(0.5, 0.25, 0.1));
        assert_relative_eq!(
            c.position_wrt_parent().unwrap().translation.vector,
            Vector3::new(0.75, 0.0, 0.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_empty_link_gets_margin_box() {
        let body = link_with(vec![], Pose::identity());
        let config = SpaceConfig::default();
        let built = link_colliders(&body.links()[0], &config).unwrap();
        let cuboid = built.colliders[0].shape().as_cuboid().unwrap();
        assert_relative_eq!(cuboid.half_extents, Vector3::repeat(config.margin));
    }

    #[test]
    fn test_per_geometry_shapes() {
        let body = link_with(
            vec![
                GeometryInfo::new(GeometryKind::Sphere { radius: 0.3 }),
                GeometryInfo::new(GeometryKind::Cylinder {
                    radius: 0.1,
                    height: 2.0,
                }),
                GeometryInfo::new(GeometryKind::None),
                GeometryInfo::new(tetrahedron()),
            ],
            Pose::identity(),
        );
        let config = SpaceConfig {
            shape_strategy: ShapeStrategy::PerGeometry,
            ..SpaceConfig::default()
        };
        let built = link_colliders(&body.links()[0], &config).unwrap();
        let kinds: Vec<ShapeType> = built.colliders.iter().map(|c| c.shape().shape_type()).collect();
        assert_eq!(
            kinds,
            vec![ShapeType::Ball, ShapeType::Cylinder, ShapeType::ConvexPolyhedron]
        );
        assert!(built.fallbacks.is_empty());

        // the cylinder axis ends up along z
        let cyl = &built.colliders[1];
        let axis = cyl.position_wrt_parent().unwrap().rotation * Vector3::y();
        assert_relative_eq!(axis, Vector3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_collision_only_mesh_is_trimesh() {
        let body = link_with(vec![GeometryInfo::new(tetrahedron())], Pose::identity());
        let config = SpaceConfig {
            shape_strategy: ShapeStrategy::PerGeometry,
            ..SpaceConfig::collision_only()
        };
        let built = link_colliders(&body.links()[0], &config).unwrap();
        assert_eq!(built.colliders[0].shape().shape_type(), ShapeType::TriMesh);
    }

    #[test]
    fn test_degenerate_mesh_falls_back() {
        let flat = GeometryKind::TriMesh {
            vertices: vec![Vec3::zeros(), Vec3::x(), Vec3::y()],
            indices: vec![0, 1, 2],
        };
        let body = link_with(vec![GeometryInfo::new(flat)], Pose::identity());
        let config = SpaceConfig {
            shape_strategy: ShapeStrategy::PerGeometry,
            ..SpaceConfig::default()
        };
        let built = link_colliders(&body.links()[0], &config).unwrap();
        assert_eq!(built.colliders.len(), 1);
        assert_eq!(built.colliders[0].shape().shape_type(), ShapeType::Cuboid);
        assert!(matches!(
            built.fallbacks.as_slice(),
            [StructuralError::ShapeFallback { link, .. }] if link == "part"
        ));
    }

    #[test]
    fn test_disabled_link_collider_disabled() {
        let mut body = link_with(vec![], Pose::identity());
        body.set_link_enabled(0, false).unwrap();
        let built = link_colliders(&body.links()[0], &SpaceConfig::default()).unwrap();
        assert!(!built.colliders[0].is_enabled());
    }
}
