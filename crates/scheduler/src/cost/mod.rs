pub mod coco;
pub mod quincy;
pub mod random;
pub mod sjf;
pub mod trivial;
pub mod whare;

use std::collections::HashMap;

use tracing::info;

use sluice_core::config::{CostModelKind, SchedulingConfig};
use sluice_core::types::{ResourceId, ResourceTopology, TaskDescriptor};
use sluice_graph::cost::CostModel;

pub use coco::CocoCostModel;
pub use quincy::QuincyCostModel;
pub use random::RandomCostModel;
pub use sjf::SjfCostModel;
pub use trivial::TrivialCostModel;
pub use whare::WhareCostModel;

/// Runtime assumed for tasks that have never run (microseconds).
pub(crate) const DEFAULT_RUNTIME_ESTIMATE_US: u64 = 5_000_000;

pub(crate) fn runtime_estimate_us(task: &TaskDescriptor) -> u64 {
    task.runtime_estimate_us.unwrap_or(DEFAULT_RUNTIME_ESTIMATE_US)
}

/// Instantiates the cost model selected by the configuration.
pub fn create_cost_model(config: &SchedulingConfig) -> Box<dyn CostModel> {
    let model: Box<dyn CostModel> = match config.cost_model {
        CostModelKind::Trivial => Box::new(TrivialCostModel::new()),
        CostModelKind::Random => Box::new(RandomCostModel::new(config.random_seed)),
        CostModelKind::Sjf => Box::new(SjfCostModel::new()),
        CostModelKind::Quincy => Box::new(QuincyCostModel::new()),
        CostModelKind::Whare => Box::new(WhareCostModel::new()),
        CostModelKind::Coco => Box::new(CocoCostModel::new()),
    };
    info!("using the {:?} cost model", config.cost_model);
    model
}

/// Tracks the leaves of every registered machine so models can hand out
/// preference arcs over the whole cluster.
#[derive(Default)]
pub(crate) struct LeafRegistry {
    machines: HashMap<ResourceId, Vec<ResourceId>>,
}

impl LeafRegistry {
    pub fn add(&mut self, topology: &ResourceTopology) {
        let leaves = topology.leaves().iter().map(|rd| rd.id).collect();
        self.machines.insert(topology.descriptor.id, leaves);
    }

    pub fn remove(&mut self, resource_id: ResourceId) {
        self.machines.remove(&resource_id);
    }

    /// All known leaves, in a stable order.
    pub fn leaves(&self) -> Vec<ResourceId> {
        let mut all: Vec<ResourceId> = self.machines.values().flatten().copied().collect();
        all.sort();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_common::make_machine;

    #[test]
    fn test_create_each_model_kind() {
        for selector in 0..=5 {
            let config = SchedulingConfig {
                cost_model: CostModelKind::from_selector(selector).unwrap(),
                ..SchedulingConfig::default()
            };
            // Construction must not panic for any valid selector.
            let _ = create_cost_model(&config);
        }
    }

    #[test]
    fn test_leaf_registry_tracks_machines() {
        let mut registry = LeafRegistry::default();
        let m0 = make_machine("m0", 2);
        let m1 = make_machine("m1", 3);
        registry.add(&m0);
        registry.add(&m1);
        assert_eq!(registry.leaves().len(), 5);

        registry.remove(m0.descriptor.id);
        assert_eq!(registry.leaves().len(), 3);
    }
}
