use sluice_core::types::{
    EquivClassId, JobDescriptor, ResourceDescriptor, ResourceId, ResourceTopology,
    TaskDescriptor, TaskId,
};

/// Pricing oracle for candidate arcs. The graph manager is parameterized
/// over one implementation, selected at construction.
///
/// Cost methods must be deterministic for a given graph state: randomized
/// models derive per-call randomness from their seed rather than from shared
/// mutable state, so the same graph always lowers to the same flow problem.
pub trait CostModel: Send {
    /// Cost of leaving the task unscheduled for another round.
    fn task_to_unscheduled_aggregator_cost(&self, task: &TaskDescriptor) -> i64;

    fn unscheduled_aggregator_to_sink_cost(&self, job: &JobDescriptor) -> i64;

    /// Cost of the wildcard arc that lets a task reach any machine through
    /// the cluster aggregator.
    fn task_to_cluster_aggregator_cost(&self, task: &TaskDescriptor) -> i64;

    /// Cost of a direct preference arc from a task to a resource leaf.
    fn task_to_resource_cost(&self, task: &TaskDescriptor, resource: &ResourceDescriptor) -> i64;

    fn task_to_equivalence_class_cost(&self, task: &TaskDescriptor, ec: EquivClassId) -> i64;

    fn equivalence_class_to_resource_cost(
        &self,
        ec: EquivClassId,
        resource: &ResourceDescriptor,
    ) -> i64;

    /// Cost of an interior topology arc from a parent resource to a child.
    fn resource_to_resource_cost(
        &self,
        src: &ResourceDescriptor,
        dst: &ResourceDescriptor,
    ) -> i64;

    fn leaf_resource_to_sink_cost(&self, resource: &ResourceDescriptor) -> i64;

    /// Cost of keeping an already-placed task on its resource.
    fn task_continuation_cost(&self, task: &TaskDescriptor) -> i64;

    /// Equivalence classes this task aggregates into.
    fn task_equivalence_classes(&self, _task: &TaskDescriptor) -> Vec<EquivClassId> {
        Vec::new()
    }

    /// Outgoing class-to-class arcs for `ec`.
    fn equivalence_class_to_equivalence_class_arcs(&self, _ec: EquivClassId) -> Vec<EquivClassId> {
        Vec::new()
    }

    /// Leaves the task should get direct preference arcs to.
    fn task_preference_leaves(&self, _task: &TaskDescriptor) -> Vec<ResourceId> {
        Vec::new()
    }

    fn add_task(&mut self, _task: &TaskDescriptor) {}

    fn remove_task(&mut self, _task_id: TaskId) {}

    fn add_machine(&mut self, _topology: &ResourceTopology) {}

    fn remove_machine(&mut self, _resource_id: ResourceId) {}
}
