use sluice_core::types::{
    EquivClassId, JobDescriptor, ResourceDescriptor, ResourceId, ResourceState,
    ResourceTopology, TaskDescriptor,
};
use sluice_graph::cost::CostModel;

use crate::cost::LeafRegistry;

const UNSCHEDULED_COST: i64 = 200;
const PLACEMENT_BASE: i64 = 10;
/// Added to placements onto resources that are already running work.
const INTERFERENCE_PENALTY: i64 = 50;
/// The wildcard cannot see per-resource interference; price it in between.
const WILDCARD_COST: i64 = 30;

/// Interference-aware cost model: co-locating work on a busy resource is
/// penalised, steering tasks towards idle processing units first.
#[derive(Default)]
pub struct WhareCostModel {
    registry: LeafRegistry,
}

impl WhareCostModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn interference(resource: &ResourceDescriptor) -> i64 {
        if resource.state == ResourceState::Busy {
            INTERFERENCE_PENALTY
        } else {
            0
        }
    }
}

impl CostModel for WhareCostModel {
    fn task_to_unscheduled_aggregator_cost(&self, _task: &TaskDescriptor) -> i64 {
        UNSCHEDULED_COST
    }

    fn unscheduled_aggregator_to_sink_cost(&self, _job: &JobDescriptor) -> i64 {
        0
    }

    fn task_to_cluster_aggregator_cost(&self, _task: &TaskDescriptor) -> i64 {
        WILDCARD_COST
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
        0
    }

    fn task_preference_leaves(&self, _task: &TaskDescriptor) -> Vec<ResourceId> {
        self.registry.leaves()
    }

    fn add_machine(&mut self, topology: &ResourceTopology) {
        self.registry.add(topology);
    }

    fn remove_machine(&mut self, resource_id: ResourceId) {
        self.registry.remove(resource_id);
    }
}
