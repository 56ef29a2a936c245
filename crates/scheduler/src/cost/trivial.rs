use sluice_core::types::{
    EquivClassId, JobDescriptor, ResourceDescriptor, ResourceId, ResourceTopology,
    TaskDescriptor,
};
use sluice_graph::cost::CostModel;

use crate::cost::LeafRegistry;

/// Cost of leaving a task unscheduled for another round.
const UNSCHEDULED_COST: i64 = 100;

/// Flat cost model: every placement is free, staying unscheduled is not,
/// and every leaf in the cluster is a candidate for every task.
#[derive(Default)]
pub struct TrivialCostModel {
    registry: LeafRegistry,
}

impl TrivialCostModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CostModel for TrivialCostModel {
    fn task_to_unscheduled_aggregator_cost(&self, _task: &TaskDescriptor) -> i64 {
        UNSCHEDULED_COST
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_common::{make_job, make_machine, make_task};

    #[test]
    fn test_unscheduled_is_the_only_priced_arc() {
        let model = TrivialCostModel::new();
        let jd = make_job("j");
        let td = make_task(1, &jd);
        let machine = make_machine("m0", 1);

        assert_eq!(model.task_to_unscheduled_aggregator_cost(&td), UNSCHEDULED_COST);
        assert_eq!(model.task_to_cluster_aggregator_cost(&td), 0);
        assert_eq!(model.task_to_resource_cost(&td, &machine.descriptor), 0);
        assert_eq!(model.task_continuation_cost(&td), 0);
    }

    #[test]
    fn test_every_leaf_is_a_candidate() {
        let mut model = TrivialCostModel::new();
        let jd = make_job("j");
        let td = make_task(1, &jd);
        assert!(model.task_preference_leaves(&td).is_empty());

        let machine = make_machine("m0", 4);
        model.add_machine(&machine);
        assert_eq!(model.task_preference_leaves(&td).len(), 4);

        model.remove_machine(machine.descriptor.id);
        assert!(model.task_preference_leaves(&td).is_empty());
    }
}
