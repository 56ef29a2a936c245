use uuid::Uuid;

use sluice_core::config::SchedulingConfig;
use sluice_core::types::{
    JobDescriptor, ResourceDescriptor, ResourceKind, ResourceMap, ResourceTopology,
    TaskDescriptor, TaskId,
};

use crate::scheduler::FlowScheduler;

/// Stable uuid derived from a name, so repeated constructors describe the
/// same entity.
fn stable_id(name: &str) -> Uuid {
    let bits = name
        .bytes()
        .fold(0x5123_9def_u128, |h, b| h.wrapping_mul(0x100_0000_01b3).wrapping_add(b as u128));
    Uuid::from_u128(bits)
}

pub fn make_machine(name: &str, num_pus: usize) -> ResourceTopology {
    let pus = (0..num_pus)
        .map(|i| {
            let pu_name = format!("{}_pu{}", name, i);
            ResourceTopology::leaf(ResourceDescriptor::new(
                stable_id(&pu_name),
                pu_name.clone(),
                ResourceKind::Pu,
            ))
        })
        .collect();
    ResourceTopology::with_children(
        ResourceDescriptor::new(stable_id(name), name, ResourceKind::Machine),
        pus,
    )
}

pub fn resource_map_of(topology: &ResourceTopology) -> ResourceMap {
    let mut map = ResourceMap::new();
    for rd in topology.descriptors() {
        map.insert(rd.id, rd.clone());
    }
    map
}

pub fn make_job(name: &str) -> JobDescriptor {
    JobDescriptor::new(stable_id(name), name)
}

pub fn make_task(uid: TaskId, jd: &JobDescriptor) -> TaskDescriptor {
    TaskDescriptor::new(uid, jd.id, format!("{}_t{}", jd.name, uid))
}

/// A scheduler on the built-in solver with the flat cost model.
pub fn trivial_scheduler() -> FlowScheduler {
    FlowScheduler::new(SchedulingConfig::default())
}
