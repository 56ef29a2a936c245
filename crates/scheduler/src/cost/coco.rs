use sluice_core::types::{
    EquivClassId, JobDescriptor, ResourceDescriptor, ResourceId, ResourceState,
    ResourceTopology, TaskDescriptor,
};
use sluice_graph::cost::CostModel;

use crate::cost::{runtime_estimate_us, LeafRegistry};

const OMEGA: i64 = 100;
const WAIT_TIME_FACTOR: i64 = 1;
const PLACEMENT_BASE: i64 = 10;
const INTERFERENCE_PENALTY: i64 = 40;
const WILDCARD_BASE: i64 = 40;

/// Coordinated cost model: combines the wait-time-driven urgency of the
/// locality model with the interference avoidance of the Whare model.
#[derive(Default)]
pub struct CocoCostModel {
    registry: LeafRegistry,
    newest_submit_us: u64,
}

impl CocoCostModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn wait_ms(&self, task: &TaskDescriptor) -> i64 {
        (self.newest_submit_us.saturating_sub(task.submit_time_us) / 1000) as i64
    }

    fn interference(resource: &ResourceDescriptor) -> i64 {
        if resource.state == ResourceState::Busy {
            INTERFERENCE_PENALTY
        } else {
            0
        }
    }
}

impl CostModel for CocoCostModel {
    fn task_to_unscheduled_aggregator_cost(&self, task: &TaskDescriptor) -> i64 {
        OMEGA + WAIT_TIME_FACTOR * self.wait_ms(task)
    }

    fn unscheduled_aggregator_to_sink_cost(&self, _job: &JobDescriptor) -> i64 {
        0
    }

    fn task_to_cluster_aggregator_cost(&self, task: &TaskDescriptor) -> i64 {
        WILDCARD_BASE + (runtime_estimate_us(task) / 10_000) as i64
    }

    fn task_to_resource_cost(&self, _task: &TaskDescriptor, resource: &ResourceDescriptor) -> i64 {
        PLACEMENT_BASE + Self::interference(resource)
    }

    fn task_to_equivalence_class_cost(&self, _task: &TaskDescriptor, _ec: EquivClassId) -> i64 {
        PLACEMENT_BASE
    }

    fn equivalence_class_to_resource_cost(
        &self,
        _ec: EquivClassId,
        resource: &ResourceDescriptor,
    ) -> i64 {
        Self::interference(resource)
    }

    fn resource_to_resource_cost(
        &self,
        _src: &ResourceDescriptor,
        dst: &ResourceDescriptor,
    ) -> i64 {
        Self::interference(dst)
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
