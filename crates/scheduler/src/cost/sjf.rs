use sluice_core::types::{
    EquivClassId, JobDescriptor, ResourceDescriptor, TaskDescriptor,
};
use sluice_graph::cost::CostModel;

use crate::cost::runtime_estimate_us;

const UNSCHEDULED_BASE: i64 = 100;
/// Numerator of the shortness bonus; a 1ms task earns ~half of it.
const URGENCY_SCALE: i64 = 1_000_000;

/// Shortest-job-first: the shorter a task's runtime estimate, the more it
/// costs to leave it unscheduled, so short tasks drain first when slots are
/// scarce. Placement itself is priced by the estimate, which mildly favors
/// keeping long tasks off the wildcard path.
#[derive(Default)]
pub struct SjfCostModel;

impl SjfCostModel {
    pub fn new() -> Self {
        Self
    }

    fn urgency(task: &TaskDescriptor) -> i64 {
        let estimate_ms = (runtime_estimate_us(task) / 1000) as i64;
        URGENCY_SCALE / (1 + estimate_ms)
    }
}

impl CostModel for SjfCostModel {
    fn task_to_unscheduled_aggregator_cost(&self, task: &TaskDescriptor) -> i64 {
        UNSCHEDULED_BASE + Self::urgency(task)
    }

    fn unscheduled_aggregator_to_sink_cost(&self, _job: &JobDescriptor) -> i64 {
        0
    }

    fn task_to_cluster_aggregator_cost(&self, task: &TaskDescriptor) -> i64 {
        (runtime_estimate_us(task) / 1000) as i64
    }

    fn task_to_resource_cost(&self, task: &TaskDescriptor, _resource: &ResourceDescriptor) -> i64 {
        (runtime_estimate_us(task) / 2000) as i64
    }

    fn task_to_equivalence_class_cost(&self, task: &TaskDescriptor, _ec: EquivClassId) -> i64 {
        (runtime_estimate_us(task) / 2000) as i64
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_common::{make_job, make_task};

    #[test]
    fn test_short_tasks_are_more_urgent() {
        let model = SjfCostModel::new();
        let jd = make_job("j");
        let short = make_task(1, &jd).with_runtime_estimate_us(100_000);
        let long = make_task(2, &jd).with_runtime_estimate_us(60_000_000);

        assert!(
            model.task_to_unscheduled_aggregator_cost(&short)
                > model.task_to_unscheduled_aggregator_cost(&long)
        );
    }

    #[test]
    fn test_unknown_estimate_uses_the_default() {
        let model = SjfCostModel::new();
        let jd = make_job("j");
        let unknown = make_task(1, &jd);
        let default = make_task(2, &jd)
            .with_runtime_estimate_us(crate::cost::DEFAULT_RUNTIME_ESTIMATE_US);

        assert_eq!(
            model.task_to_unscheduled_aggregator_cost(&unknown),
            model.task_to_unscheduled_aggregator_cost(&default)
        );
    }
}
