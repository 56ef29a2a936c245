//! Shared constructors for graph tests.

use uuid::Uuid;

use sluice_core::types::{
    EquivClassId, JobDescriptor, JobId, ResourceDescriptor, ResourceId, ResourceKind,
    ResourceMap, ResourceTopology, TaskDescriptor, TaskId,
};

use crate::cost::CostModel;

pub(crate) fn machine_id(seed: u128) -> ResourceId {
    Uuid::from_u128(seed * 1000)
}

pub(crate) fn pu_id(seed: u128, index: u128) -> ResourceId {
    Uuid::from_u128(seed * 1000 + 1 + index)
}

/// A machine with `num_pus` processing units and stable ids, so repeated
/// calls describe the same hardware.
pub(crate) fn machine(seed: u128, num_pus: usize) -> ResourceTopology {
    let pus = (0..num_pus)
        .map(|i| {
            ResourceTopology::leaf(ResourceDescriptor::new(
                pu_id(seed, i as u128),
                format!("m{}_pu{}", seed, i),
                ResourceKind::Pu,
            ))
        })
        .collect();
    ResourceTopology::with_children(
        ResourceDescriptor::new(machine_id(seed), format!("m{}", seed), ResourceKind::Machine),
        pus,
    )
}

pub(crate) fn resource_map(topologies: &[ResourceTopology]) -> ResourceMap {
    let mut map = ResourceMap::new();
    for topo in topologies {
        for rd in topo.descriptors() {
            map.insert(rd.id, rd.clone());
        }
    }
    map
}

pub(crate) fn job(seed: u128) -> JobDescriptor {
    JobDescriptor::new(JobId::from_u128(seed), format!("job{}", seed))
}

pub(crate) fn task(uid: TaskId, jd: &JobDescriptor) -> TaskDescriptor {
    TaskDescriptor::new(uid, jd.id, format!("task{}", uid))
}

/// Flat-cost model: staying unscheduled costs 100, everything else is free.
pub(crate) struct ZeroCostModel;

impl CostModel for ZeroCostModel {
    fn task_to_unscheduled_aggregator_cost(&self, _task: &TaskDescriptor) -> i64 {
        100
    }
    fn unscheduled_aggregator_to_sink_cost(&self, _job: &JobDescriptor) -> i64 {
        0
    }
    fn task_to_cluster_aggregator_cost(&self, _task: &TaskDescriptor) -> i64 {
        0
    }
    fn task_to_resource_cost(&self, _task: &TaskDescriptor, _resource: &ResourceDescriptor) -> i64 {
        0
    }
    fn task_to_equivalence_class_cost(&self, _task: &TaskDescriptor, _ec: EquivClassId) -> i64 {
        0
    }
    fn equivalence_class_to_resource_cost(
        &self,
        _ec: EquivClassId,
        _resource: &ResourceDescriptor,
    ) -> i64 {
        0
    }
    fn resource_to_resource_cost(
        &self,
        _src: &ResourceDescriptor,
        _dst: &ResourceDescriptor,
    ) -> i64 {
        0
    }
    fn leaf_resource_to_sink_cost(&self, _resource: &ResourceDescriptor) -> i64 {
        0
    }
    fn task_continuation_cost(&self, _task: &TaskDescriptor) -> i64 {
        0
    }
}

/// Like [`ZeroCostModel`], but every task belongs to class 7 and class 7
/// chains into class 8.
pub(crate) struct ClassedCostModel;

impl CostModel for ClassedCostModel {
    fn task_to_unscheduled_aggregator_cost(&self, _task: &TaskDescriptor) -> i64 {
        100
    }
    fn unscheduled_aggregator_to_sink_cost(&self, _job: &JobDescriptor) -> i64 {
        0
    }
    fn task_to_cluster_aggregator_cost(&self, _task: &TaskDescriptor) -> i64 {
        0
    }
    fn task_to_resource_cost(&self, _task: &TaskDescriptor, _resource: &ResourceDescriptor) -> i64 {
        0
    }
    fn task_to_equivalence_class_cost(&self, _task: &TaskDescriptor, _ec: EquivClassId) -> i64 {
        0
    }
    fn equivalence_class_to_resource_cost(
        &self,
        _ec: EquivClassId,
        _resource: &ResourceDescriptor,
    ) -> i64 {
        0
    }
    fn resource_to_resource_cost(
        &self,
        _src: &ResourceDescriptor,
        _dst: &ResourceDescriptor,
    ) -> i64 {
        0
    }
    fn leaf_resource_to_sink_cost(&self, _resource: &ResourceDescriptor) -> i64 {
        0
    }
    fn task_continuation_cost(&self, _task: &TaskDescriptor) -> i64 {
        0
    }
    fn task_equivalence_classes(&self, _task: &TaskDescriptor) -> Vec<EquivClassId> {
        vec![7]
    }
    fn equivalence_class_to_equivalence_class_arcs(&self, ec: EquivClassId) -> Vec<EquivClassId> {
        if ec == 7 {
            vec![8]
        } else {
            Vec::new()
        }
    }
}
