//! Construction of per-body proxies.

use kinsync_model::{JointType, KinBody, KinBodyStateSaver, Link, Pose};
use nalgebra::{Point3, Vector3};
use rapier3d::dynamics::{JointAxis, MassProperties, RigidBodyBuilder};
use tracing::{debug, error, warn};

use crate::bridge::{to_engine_point, to_engine_vector};
use crate::colliders::link_colliders;
use crate::config::SpaceConfig;
use crate::error::{PhysicsError, Result, StructuralError};
use crate::joints::{
    finite_limits, hinge_angle, local_axes, prismatic_joint, realign_hinge_limits,
    revolute_joint, spherical_joint, LocalAnchors,
};
use crate::link::{LinkMotion, LinkProxy};
use crate::record::{BodyProxyRecord, ConstraintKind, JointConstraint, LimitSoftness};
use crate::world::PhysicsWorld;

/// Build (or fully rebuild) the proxy of `body` in `world`.
///
/// The body is mirrored at its zero configuration: base at identity and
/// every DOF at zero. Its pose is restored before this returns, on every
/// path. A reused record is emptied first, and on error every partial
/// engine object is removed again.
///
/// The returned record has not been synchronized yet.
pub(crate) fn build_proxy(
    world: &mut PhysicsWorld,
    body: &mut KinBody,
    existing: Option<BodyProxyRecord>,
    config: &SpaceConfig,
) -> Result<BodyProxyRecord> {
    let mut record = match existing {
        Some(mut record) => {
            if record.body != body.id() {
                panic!(
                    "consistency violation: rebuilding record of {:?} for body {}",
                    record.body,
                    body.name()
                );
            }
            record.reset(world);
            record
        }
        None => BodyProxyRecord::new(body.id()),
    };

    let mut saver = KinBodyStateSaver::new(body);
    saver.set_transform(Pose::identity());
    let zeros = vec![0.0; saver.dof()];
    let built = saver
        .set_dof_values(&zeros)
        .map_err(PhysicsError::from)
        .and_then(|()| build_links(world, &saver, &mut record, config))
        .and_then(|()| build_joints(world, &saver, &mut record, config));

    if let Err(e) = built {
        record.reset(world);
        return Err(e);
    }

    debug!(
        body = %saver.name(),
        links = record.links.len(),
        joints = record.joint_constraints.len(),
        diagnostics = record.diagnostics.len(),
        "built physics proxy"
    );
    Ok(record)
}

fn link_motion(link: &Link, config: &SpaceConfig) -> LinkMotion {
    if link.is_static() {
        LinkMotion::Static
    } else if !config.physics {
        LinkMotion::Kinematic
    } else {
        LinkMotion::Dynamic
    }
}

fn build_links(
    world: &mut PhysicsWorld,
    body: &KinBody,
    record: &mut BodyProxyRecord,
    config: &SpaceConfig,
) -> Result<()> {
    for link in body.links() {
        let motion = link_motion(link, config);
        let mut proxy = LinkProxy::new(link, motion);
        let shapes = link_colliders(link, config)?;
        record.diagnostics.extend(shapes.fallbacks);

        let mut builder = RigidBodyBuilder::new(motion.body_type())
            .position(proxy.world_transform(body)?)
            .enabled(true);
        if motion == LinkMotion::Dynamic {
            let props = mass_properties(body, link, config, &mut record.diagnostics);
            builder = builder.additional_mass_properties(props);
        }

        let (handle, colliders) = world.insert_body(builder.build(), shapes.colliders);
        proxy.rigid_body = handle;
        proxy.colliders = colliders;
        record.links.push(proxy);
    }
    Ok(())
}

/// Mass and principal moments about the mass frame, with dummy values
/// substituted for degenerate input.
fn mass_properties(
    body: &KinBody,
    link: &Link,
    config: &SpaceConfig,
    diagnostics: &mut Vec<StructuralError>,
) -> MassProperties {
    let mut mass = link.mass() as f32;
    if !(mass > 0.0 && mass.is_finite()) {
        report(
            body,
            diagnostics,
            StructuralError::DummyMass {
                link: link.name().to_string(),
                mass: link.mass(),
            },
        );
        mass = config.dummy_mass;
    }

    let mut moments = to_engine_vector(&link.principal_moments_of_inertia());
    let norm_sqr = moments.norm_squared();
    if !(norm_sqr > 0.0 && norm_sqr.is_finite()) {
        report(
            body,
            diagnostics,
            StructuralError::DummyInertia {
                link: link.name().to_string(),
            },
        );
        moments = Vector3::repeat(config.dummy_inertia);
    }

    MassProperties::new(Point3::origin(), mass, moments)
}

fn build_joints(
    world: &mut PhysicsWorld,
    body: &KinBody,
    record: &mut BodyProxyRecord,
    config: &SpaceConfig,
) -> Result<()> {
    // kinematic links ignore impulse joints
    if !config.physics {
        debug!(body = %body.name(), "collision mirror, joints not constructed");
        return Ok(());
    }
    for joint in body.all_joints() {
        let endpoints = joint
            .first_attached()
            .zip(joint.second_attached())
            .and_then(|(i1, i2)| Some(((i1, record.links.get(i1)?), (i2, record.links.get(i2)?))));
        let Some(((i1, proxy1), (i2, proxy2))) = endpoints else {
            report(
                body,
                &mut record.diagnostics,
                StructuralError::MissingJointEndpoint {
                    joint: joint.name().to_string(),
                },
            );
            continue;
        };

        let kind = match joint.kind() {
            JointType::Hinge => ConstraintKind::Hinge,
            JointType::Slider => ConstraintKind::Slider,
            JointType::Spherical => ConstraintKind::Spherical,
            other => {
                report(
                    body,
                    &mut record.diagnostics,
                    StructuralError::UnsupportedJoint {
                        joint: joint.name().to_string(),
                        kind: other,
                    },
                );
                continue;
            }
        };

        let (rb1, rb2) = (proxy1.rigid_body, proxy2.rigid_body);
        let pose1 = proxy1.world_transform(body)?;
        let pose2 = proxy2.world_transform(body)?;
        let collision_excluded = body.are_adjacent(i1, i2) || body.are_rigidly_attached(i1, i2);
        let contacts = !collision_excluded;
        let anchors =
            LocalAnchors::from_world(&pose1, &pose2, &to_engine_point(&body.joint_world_anchor(joint)));

        let axis = to_engine_vector(&body.joint_world_axis(joint, 0));
        let axes = match kind {
            // engine hinge angles run opposite to model values
            ConstraintKind::Hinge => local_axes(&pose1, &pose2, &-axis),
            ConstraintKind::Slider => local_axes(&pose1, &pose2, &axis),
            ConstraintKind::Spherical => None,
        };
        if kind != ConstraintKind::Spherical && axes.is_none() {
            report(
                body,
                &mut record.diagnostics,
                StructuralError::DegenerateAxis {
                    joint: joint.name().to_string(),
                },
            );
            continue;
        }

        let (lower, upper) = joint.limits(0);
        let (data, limits, softness) = match (kind, axes) {
            (ConstraintKind::Hinge, Some(axes)) => {
                let mut data = revolute_joint(anchors, axes, contacts);
                let limited = !joint.is_circular() && lower.is_finite() && upper.is_finite();
                let limits = limited.then(|| {
                    let engine_initial = hinge_angle(&data, &pose1.rotation, &pose2.rotation);
                    realign_hinge_limits(engine_initial, body.joint_value(joint, 0), lower, upper)
                });
                if let Some(limits) = limits {
                    data.set_limits(JointAxis::AngX, limits);
                }
                let softness = limits.map(|_| LimitSoftness::from(config.hinge_softness));
                (data, limits, softness)
            }
            (ConstraintKind::Slider, Some(axes)) => {
                let limits = finite_limits(lower, upper);
                (prismatic_joint(anchors, axes, limits, contacts), limits, None)
            }
            _ => (spherical_joint(anchors, contacts), None, None),
        };

        let handle = world.insert_joint(rb1, rb2, data);
        record.joint_constraints.insert(
            joint.id(),
            JointConstraint {
                handle,
                kind,
                collision_excluded,
                limits,
                softness,
            },
        );
    }
    Ok(())
}

fn report(body: &KinBody, diagnostics: &mut Vec<StructuralError>, err: StructuralError) {
    match &err {
        StructuralError::DummyMass { .. }
        | StructuralError::DummyInertia { .. }
        | StructuralError::ShapeFallback { .. } => {
            warn!(body = %body.name(), %err, "degraded physics proxy");
        }
        _ => error!(body = %body.name(), %err, "joint not mirrored"),
    }
    diagnostics.push(err);
}
