use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sluice_core::types::{
    EquivClassId, JobDescriptor, ResourceDescriptor, ResourceId, ResourceTopology,
    TaskDescriptor,
};
use sluice_graph::cost::CostModel;

use crate::cost::LeafRegistry;

/// Upper bound (exclusive) on randomized arc costs.
const MAX_ARC_COST: i64 = 100;
/// Staying unscheduled always dominates any placement cost.
const UNSCHEDULED_BASE: i64 = 1000;

/// Randomized cost model. Every cost is drawn from an RNG seeded by the
/// configured seed and the identities on the arc, so a given graph state
/// always lowers to the same flow problem.
pub struct RandomCostModel {
    seed: u64,
    registry: LeafRegistry,
}

impl RandomCostModel {
    pub fn new(seed: u64) -> Self {
        Self { seed, registry: LeafRegistry::default() }
    }

    fn rng(&self, a: u64, b: u64) -> StdRng {
        StdRng::seed_from_u64(
            self.seed ^ a.rotate_left(17) ^ b.wrapping_mul(0x9E37_79B9_7F4A_7C15),
        )
    }

    fn draw(&self, a: u64, b: u64) -> i64 {
        self.rng(a, b).gen_range(0..MAX_ARC_COST)
    }
}

fn resource_key(id: &ResourceId) -> u64 {
    let bits = id.as_u128();
    (bits as u64) ^ ((bits >> 64) as u64)
}

impl CostModel for RandomCostModel {
    fn task_to_unscheduled_aggregator_cost(&self, task: &TaskDescriptor) -> i64 {
        UNSCHEDULED_BASE + self.draw(task.uid, 0)
    }

    fn unscheduled_aggregator_to_sink_cost(&self, _job: &JobDescriptor) -> i64 {
        0
    }

    fn task_to_cluster_aggregator_cost(&self, task: &TaskDescriptor) -> i64 {
        self.draw(task.uid, 1)
    }

    fn task_to_resource_cost(&self, task: &TaskDescriptor, resource: &ResourceDescriptor) -> i64 {
        self.draw(task.uid, resource_key(&resource.id))
    }

    fn task_to_equivalence_class_cost(&self, task: &TaskDescriptor, ec: EquivClassId) -> i64 {
        self.draw(task.uid, ec)
    }

    fn equivalence_class_to_resource_cost(
        &self,
        ec: EquivClassId,
        resource: &ResourceDescriptor,
    ) -> i64 {
        self.draw(ec, resource_key(&resource.id))
    }

    fn resource_to_resource_cost(
        &self,
        src: &ResourceDescriptor,
        dst: &ResourceDescriptor,
    ) -> i64 {
        self.draw(resource_key(&src.id), resource_key(&dst.id))
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
