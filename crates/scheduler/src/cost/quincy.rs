use sluice_core::types::{
    EquivClassId, JobDescriptor, ResourceDescriptor, ResourceId, ResourceTopology,
    TaskDescriptor,
};
use sluice_graph::cost::CostModel;

use crate::cost::{runtime_estimate_us, LeafRegistry};

/// Baseline cost of staying unscheduled.
const OMEGA: i64 = 100;
/// Per-millisecond-of-wait growth of the unscheduled cost.
const WAIT_TIME_FACTOR: i64 = 1;
/// Base cost of routing through the cluster-wide wildcard.
const WILDCARD_BASE: i64 = 50;
/// Base cost of a direct placement.
const PLACEMENT_BASE: i64 = 10;

/// Locality-style cost model: the cost of staying unscheduled grows with a
/// task's wait time, the wildcard path is priced by the worst-case transfer
/// a placement anywhere could incur, and direct preference arcs are cheap.
///
/// Wait time is measured against a logical clock that advances to the
/// newest submission seen, keeping costs a pure function of graph state.
#[derive(Default)]
pub struct QuincyCostModel {
    registry: LeafRegistry,
    newest_submit_us: u64,
}

impl QuincyCostModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn wait_ms(&self, task: &TaskDescriptor) -> i64 {
        (self.newest_submit_us.saturating_sub(task.submit_time_us) / 1000) as i64
    }
}

impl CostModel for QuincyCostModel {
    fn task_to_unscheduled_aggregator_cost(&self, task: &TaskDescriptor) -> i64 {
        OMEGA + WAIT_TIME_FACTOR * self.wait_ms(task)
    }

    fn unscheduled_aggregator_to_sink_cost(&self, _job: &JobDescriptor) -> i64 {
        0
    }

    fn task_to_cluster_aggregator_cost(&self, task: &TaskDescriptor) -> i64 {
        WILDCARD_BASE + (runtime_estimate_us(task) / 10_000) as i64
    }

    fn task_to_resource_cost(&self, _task: &TaskDescriptor, _resource: &ResourceDescriptor) -> i64 {
        PLACEMENT_BASE
    }

    fn task_to_equivalence_class_cost(&self, _task: &TaskDescriptor, _ec: EquivClassId) -> i64 {
        PLACEMENT_BASE
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
        PLACEMENT_BASE / 2
    }

    fn task_preference_leaves(&self, _task: &TaskDescriptor) -> Vec<ResourceId> {
        self.registry.leaves()
    }

    fn add_task(&mut self, task: &TaskDescriptor) {
        if task.submit_time_us > self.newest_submit_us {
            self.newest_submit_us = task.submit_time_us;
        }
    }

    fn add_machine(&mut self, topology: &ResourceTopology) {
        self.registry.add(topology);
    }

    fn remove_machine(&mut self, resource_id: ResourceId) {
        self.registry.remove(resource_id);
    }
}
