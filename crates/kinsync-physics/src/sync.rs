//! Pushing kinematic state into the engine.

use kinsync_model::KinBody;
use tracing::trace;

use crate::error::Result;
use crate::record::BodyProxyRecord;
use crate::world::PhysicsWorld;

/// Observer invoked after every synchronization pass.
pub type SyncCallback = Box<dyn FnMut(&BodyProxyRecord)>;

/// Push the current link transforms of `body` into its proxy.
///
/// Every pose is converted before any is written, so a malformed rotation
/// leaves the engine untouched. Collider enabled flags follow the links.
pub(crate) fn synchronize_record(
    world: &mut PhysicsWorld,
    record: &mut BodyProxyRecord,
    body: &KinBody,
    callback: Option<&mut SyncCallback>,
) -> Result<()> {
    let (transforms, branches) = body.link_transformations();
    if transforms.len() != record.links.len() {
        panic!(
            "consistency violation: body {} has {} links but its proxy has {}",
            body.name(),
            transforms.len(),
            record.links.len()
        );
    }

    let poses = record
        .links
        .iter()
        .zip(&transforms)
        .map(|(proxy, t)| proxy.compose(t))
        .collect::<Result<Vec<_>>>()?;

    record.last_sync_stamp = body.update_stamp();
    record.dof_branches = branches;
    for ((proxy, pose), link) in record.links.iter().zip(&poses).zip(body.links()) {
        proxy.push(&mut world.bodies, pose);
        world.set_colliders_enabled(&proxy.colliders, link.is_enabled());
    }

    trace!(body = %body.name(), stamp = record.last_sync_stamp, "synchronized physics proxy");
    if let Some(callback) = callback {
        callback(&*record);
    }
    Ok(())
}
