use std::collections::HashMap;

use tracing::{debug, warn};

use sluice_core::error::SluiceError;
use sluice_core::types::{ResourceId, TaskId};
use sluice_graph::manager::FlowGraphManager;
use sluice_graph::node::FlowNode;

use crate::delta::{DeltaKind, SchedulingDelta};
use crate::solver::FlowSolver;

/// Runs the solver over the current graph and lifts the optimal flow back
/// into task-to-leaf placements.
pub struct Dispatcher {
    solver: Box<dyn FlowSolver>,
}

impl Dispatcher {
    pub fn new(solver: Box<dyn FlowSolver>) -> Self {
        Self { solver }
    }

    /// One solver round. Returns a `(task_node, leaf_node)` pair for every
    /// task whose flow reaches a resource leaf; tasks draining through an
    /// unscheduled aggregator stay unmapped. On success the change log is
    /// consumed; on failure it is retained so the next round can retry.
    pub fn run(&mut self, graph: &mut FlowGraphManager) -> Result<Vec<(u64, u64)>, SluiceError> {
        let flows = self.solver.solve(graph)?;

        let mut remaining: HashMap<(u64, u64), u64> = HashMap::new();
        for edge in &flows {
            let line = || format!("f {} {} {}", edge.src, edge.dst, edge.flow);
            let arc = graph
                .arc(edge.src, edge.dst)
                .ok_or_else(|| SluiceError::MalformedSolverOutput { line: line() })?;
            if edge.flow > arc.cap_upper {
                return Err(SluiceError::MalformedSolverOutput { line: line() });
            }
            if edge.flow > 0 {
                remaining.insert((edge.src, edge.dst), edge.flow);
            }
        }
        graph.clear_changes();

        let task_nodes: Vec<u64> = graph
            .nodes()
            .filter(|n| n.is_task_node())
            .map(|n| n.id)
            .collect();
        let mut mappings = Vec::new();
        for task_nid in task_nodes {
            if let Some(leaf) = follow_flow_path(graph, &mut remaining, task_nid) {
                mappings.push((task_nid, leaf));
            }
        }
        debug!("dispatcher mapped {} tasks to leaves", mappings.len());
        Ok(mappings)
    }

    /// Turns a solved task-to-leaf pair into the action it implies: a fresh
    /// placement, or a no-op when the flow merely confirms the existing
    /// binding.
    pub fn node_binding_to_scheduling_delta(
        task_node: &FlowNode,
        leaf_node: &FlowNode,
        bindings: &HashMap<TaskId, ResourceId>,
    ) -> SchedulingDelta {
        let task_id = task_node
            .task_id
            .unwrap_or_else(|| panic!("node {} is not a task node", task_node.id));
        let resource_id = leaf_node
            .resource_id
            .unwrap_or_else(|| panic!("node {} is not a resource node", leaf_node.id));
        let kind = if bindings.get(&task_id) == Some(&resource_id) {
            DeltaKind::Noop
        } else {
            DeltaKind::Place
        };
        SchedulingDelta { kind, task_id, resource_id, actioned: false }
    }
}

/// Walks the unit of flow leaving `task_nid` towards the sink, consuming
/// one unit per hop so interior arcs shared between tasks decompose
/// correctly. Returns the first resource leaf on the path, if any.
fn follow_flow_path(
    graph: &mut FlowGraphManager,
    remaining: &mut HashMap<(u64, u64), u64>,
    task_nid: u64,
) -> Option<u64> {
    let epoch = graph.begin_visit();
    let sink = graph.sink_id();
    let mut current = task_nid;
    let mut first_leaf = None;
    loop {
        if current == sink {
            return first_leaf;
        }
        if !graph.visit(current, epoch) {
            warn!("cycle in flow decomposition at node {}", current);
            return None;
        }
        let node = graph.node(current)?;
        let next = node
            .outgoing
            .iter()
            .copied()
            .find(|&dst| remaining.get(&(current, dst)).copied().unwrap_or(0) > 0)?;
        *remaining.get_mut(&(current, next)).unwrap() -= 1;
        if first_leaf.is_none() && graph.is_leaf(next) {
            first_leaf = Some(next);
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::TrivialCostModel;
    use crate::solver::SspSolver;
    use crate::tests_common::*;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Box::new(SspSolver::new()))
    }

    #[test]
    fn test_unscheduled_task_yields_no_mapping() {
        let mut graph = FlowGraphManager::new(Box::new(TrivialCostModel::new()));
        let jd = make_job("j");
        graph.add_or_update_job_nodes(&jd, &[make_task(1, &jd)], &Default::default());

        let mappings = dispatcher().run(&mut graph).unwrap();
        assert!(mappings.is_empty());
        // A consumed round clears the log.
        assert!(graph.changes().is_empty());
    }

    #[test]
    fn test_task_maps_to_its_leaf() {
        let mut graph = FlowGraphManager::new(Box::new(TrivialCostModel::new()));
        let machine = make_machine("m0", 1);
        graph.add_resource_topology(&machine);
        let jd = make_job("j");
        graph.add_or_update_job_nodes(&jd, &[make_task(1, &jd)], &resource_map_of(&machine));

        let mappings = dispatcher().run(&mut graph).unwrap();
        let task_nid = graph.task_node_id(1).unwrap();
        let pu_nid = graph.resource_node_id(machine.leaves()[0].id).unwrap();
        assert_eq!(mappings, vec![(task_nid, pu_nid)]);
    }

    #[test]
    fn test_shared_interior_arcs_decompose_per_task() {
        let mut graph = FlowGraphManager::new(Box::new(TrivialCostModel::new()));
        let machine = make_machine("m0", 2);
        graph.add_resource_topology(&machine);
        let jd = make_job("j");
        graph.add_or_update_job_nodes(
            &jd,
            &[make_task(1, &jd), make_task(2, &jd)],
            &resource_map_of(&machine),
        );

        let mappings = dispatcher().run(&mut graph).unwrap();
        assert_eq!(mappings.len(), 2);
        // Both tasks land on distinct leaves.
        assert_ne!(mappings[0].1, mappings[1].1);
        for (_, leaf) in &mappings {
            assert!(graph.is_leaf(*leaf));
        }
    }

    #[test]
    fn test_delta_kinds_track_bindings() {
        let mut graph = FlowGraphManager::new(Box::new(TrivialCostModel::new()));
        let machine = make_machine("m0", 1);
        graph.add_resource_topology(&machine);
        let jd = make_job("j");
        let td = make_task(1, &jd);
        graph.add_or_update_job_nodes(&jd, &[td.clone()], &resource_map_of(&machine));

        let task_node = graph.node(graph.task_node_id(1).unwrap()).unwrap().clone();
        let leaf_node = graph
            .node(graph.resource_node_id(machine.leaves()[0].id).unwrap())
            .unwrap()
            .clone();

        let empty = HashMap::new();
        let delta = Dispatcher::node_binding_to_scheduling_delta(&task_node, &leaf_node, &empty);
        assert_eq!(delta.kind, DeltaKind::Place);
        assert!(!delta.actioned);

        let mut bound = HashMap::new();
        bound.insert(td.uid, machine.leaves()[0].id);
        let delta = Dispatcher::node_binding_to_scheduling_delta(&task_node, &leaf_node, &bound);
        assert_eq!(delta.kind, DeltaKind::Noop);
    }
}
