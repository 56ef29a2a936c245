use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, info};

use sluice_core::types::{
    EquivClassId, JobDescriptor, JobId, ResourceId, ResourceKind, ResourceMap,
    ResourceTopology, TaskDescriptor, TaskId,
};

use crate::arc::{ArcKind, FlowArc};
use crate::change::{ChangeLog, GraphChange};
use crate::cost::CostModel;
use crate::node::{FlowNode, NodeType};

/// Effectively unbounded capacity for class-to-class arcs.
const EC_ARC_CAPACITY: u64 = 1 << 20;

/// Owns the nodes, the arcs and the id allocator of the scheduling flow
/// network, and keeps its structural invariants intact across mutations.
///
/// Arcs are stored arena-style, keyed by their `(src, dst)` endpoints; node
/// adjacency sets carry only peer ids. Every structural edit appends a
/// change record, so an incremental solver can be fed deltas instead of the
/// full graph.
///
/// Mutations that would leave the structure inconsistent (removing an
/// absent node, inserting a duplicate arc, touching an unknown id) panic
/// with the offending ids: they indicate a bug in the caller, not a
/// runtime condition to recover from.
pub struct FlowGraphManager {
    nodes: BTreeMap<u64, FlowNode>,
    arcs: BTreeMap<(u64, u64), FlowArc>,
    next_id: u64,
    sink_id: u64,
    cluster_agg_id: u64,
    task_nodes: BTreeMap<TaskId, u64>,
    resource_nodes: HashMap<ResourceId, u64>,
    job_aggs: HashMap<JobId, u64>,
    ec_nodes: BTreeMap<EquivClassId, u64>,
    machines: BTreeSet<u64>,
    leaves: BTreeSet<u64>,
    changes: ChangeLog,
    cost_model: Box<dyn CostModel>,
    visit_epoch: u64,
}

impl FlowGraphManager {
    pub fn new(cost_model: Box<dyn CostModel>) -> Self {
        let mut manager = Self {
            nodes: BTreeMap::new(),
            arcs: BTreeMap::new(),
            next_id: 1,
            sink_id: 0,
            cluster_agg_id: 0,
            task_nodes: BTreeMap::new(),
            resource_nodes: HashMap::new(),
            job_aggs: HashMap::new(),
            ec_nodes: BTreeMap::new(),
            machines: BTreeSet::new(),
            leaves: BTreeSet::new(),
            changes: ChangeLog::new(),
            cost_model,
            visit_epoch: 0,
        };
        manager.sink_id = manager.add_node(NodeType::Sink, 0, Some("SINK".to_string()));
        manager.cluster_agg_id =
            manager.add_node(NodeType::JobAggregator, 0, Some("CLUSTER_AGG".to_string()));
        info!(
            "flow graph initialised: sink={} cluster_agg={}",
            manager.sink_id, manager.cluster_agg_id
        );
        manager
    }

    // ---- node/arc primitives -------------------------------------------

    fn add_node(&mut self, kind: NodeType, excess: i64, comment: Option<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let mut node = FlowNode::new(id, kind);
        node.excess = excess;
        node.comment = comment.clone();
        self.nodes.insert(id, node);
        self.changes.record(GraphChange::AddNode { id, excess, comment });
        id
    }

    fn set_excess(&mut self, id: u64, excess: i64) {
        let node = self
            .nodes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("set_excess: unknown node {}", id));
        if node.excess == excess {
            return;
        }
        node.excess = excess;
        let comment = node.comment.clone();
        self.changes.record(GraphChange::AddNode { id, excess, comment });
    }

    fn add_arc(&mut self, src: u64, dst: u64, cap_lower: u64, cap_upper: u64, cost: i64, kind: ArcKind) {
        assert!(
            self.nodes.contains_key(&src),
            "add_arc: unknown source node {}",
            src
        );
        assert!(
            self.nodes.contains_key(&dst),
            "add_arc: unknown destination node {}",
            dst
        );
        assert!(
            !self.arcs.contains_key(&(src, dst)),
            "add_arc: duplicate arc {}->{}",
            src,
            dst
        );
        let arc = FlowArc::new(src, dst, cap_lower, cap_upper, cost, kind);
        self.changes.record(GraphChange::add_arc(&arc));
        self.arcs.insert((src, dst), arc);
        self.nodes.get_mut(&src).unwrap().outgoing.insert(dst);
        self.nodes.get_mut(&dst).unwrap().incoming.insert(src);
    }

    fn change_arc(&mut self, src: u64, dst: u64, cap_lower: u64, cap_upper: u64, cost: i64, kind: ArcKind) {
        let arc = self
            .arcs
            .get_mut(&(src, dst))
            .unwrap_or_else(|| panic!("change_arc: no arc {}->{}", src, dst));
        if arc.cap_lower == cap_lower
            && arc.cap_upper == cap_upper
            && arc.cost == cost
            && arc.kind == kind
        {
            return;
        }
        let old_cost = arc.cost;
        arc.cap_lower = cap_lower;
        arc.cap_upper = cap_upper;
        arc.cost = cost;
        arc.kind = kind;
        let snapshot = arc.clone();
        self.changes.record(GraphChange::change_arc(&snapshot, old_cost));
    }

    fn remove_arc(&mut self, src: u64, dst: u64) {
        if self.arcs.remove(&(src, dst)).is_none() {
            panic!("remove_arc: no arc {}->{}", src, dst);
        }
        self.nodes
            .get_mut(&src)
            .unwrap_or_else(|| panic!("remove_arc: unknown source node {}", src))
            .outgoing
            .remove(&dst);
        self.nodes
            .get_mut(&dst)
            .unwrap_or_else(|| panic!("remove_arc: unknown destination node {}", dst))
            .incoming
            .remove(&src);
        self.changes.record(GraphChange::RemoveArc { src, dst });
    }

    fn remove_node(&mut self, id: u64) {
        let (out_peers, in_peers) = {
            let node = self
                .nodes
                .get(&id)
                .unwrap_or_else(|| panic!("remove_node: unknown node {}", id));
            (
                node.outgoing.iter().copied().collect::<Vec<_>>(),
                node.incoming.iter().copied().collect::<Vec<_>>(),
            )
        };
        for dst in out_peers {
            self.remove_arc(id, dst);
        }
        for src in in_peers {
            self.remove_arc(src, id);
        }
        self.nodes.remove(&id);
        self.changes.record(GraphChange::RemoveNode { id });
    }

    // ---- traversal support ---------------------------------------------

    /// Starts a traversal; pass the returned epoch to [`visit`](Self::visit).
    pub fn begin_visit(&mut self) -> u64 {
        self.visit_epoch += 1;
        self.visit_epoch
    }

    /// Marks `id` visited in the given epoch. Returns false if it already was.
    pub fn visit(&mut self, id: u64, epoch: u64) -> bool {
        let node = self
            .nodes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("visit: unknown node {}", id));
        if node.visited == epoch {
            false
        } else {
            node.visited = epoch;
            true
        }
    }

    // ---- resource topology ---------------------------------------------

    /// Lowers a machine topology onto the graph: one node per resource,
    /// parent-to-child arcs sized by subtree slot counts, a sink arc per
    /// leaf, and an attachment arc from the cluster aggregator to the root.
    pub fn add_resource_topology(&mut self, root: &ResourceTopology) {
        info!(
            "adding resource topology rooted at {} ({} slots)",
            root.descriptor.id,
            root.task_slots()
        );
        let root_id = self.add_resource_subtree(root);
        let cap = root.task_slots();
        if self.arcs.contains_key(&(self.cluster_agg_id, root_id)) {
            self.change_arc(self.cluster_agg_id, root_id, 0, cap, 0, ArcKind::Other);
        } else {
            self.add_arc(self.cluster_agg_id, root_id, 0, cap, 0, ArcKind::Other);
        }
        self.wire_equivalence_classes_to_machines(root);
        self.cost_model.add_machine(root);
    }

    /// Diffs `root` against the current resource subgraph: vanished
    /// resources are removed, new ones inserted, and capacities along the
    /// ancestor chains of changed leaves recomputed.
    pub fn update_resource_topology(&mut self, root: &ResourceTopology) {
        let root_nid = match self.resource_nodes.get(&root.descriptor.id) {
            // Unknown root (or a bare graph): treat as initial addition.
            None => {
                self.add_resource_topology(root);
                return;
            }
            Some(&nid) => nid,
        };
        debug!("refreshing resource topology rooted at {}", root.descriptor.id);

        let fresh: HashSet<ResourceId> = root.descriptors().iter().map(|d| d.id).collect();
        for nid in self.collect_resource_subtree(root_nid) {
            let (res_id, is_machine) = {
                let node = &self.nodes[&nid];
                (node.resource_id, node.kind == NodeType::Machine)
            };
            let res_id = res_id.unwrap_or_else(|| panic!("resource node {} has no resource id", nid));
            if fresh.contains(&res_id) {
                continue;
            }
            self.leaves.remove(&nid);
            self.machines.remove(&nid);
            self.resource_nodes.remove(&res_id);
            self.remove_node(nid);
            if is_machine {
                self.cost_model.remove_machine(res_id);
            }
            debug!("deregistered resource {} (node {})", res_id, nid);
        }

        self.add_resource_subtree(root);
        let cap = root.task_slots();
        self.change_arc(self.cluster_agg_id, root_nid, 0, cap, 0, ArcKind::Other);
        self.wire_equivalence_classes_to_machines(root);
        self.cost_model.add_machine(root);
    }

    fn add_resource_subtree(&mut self, topo: &ResourceTopology) -> u64 {
        let desc = &topo.descriptor;
        let node_id = match self.resource_nodes.get(&desc.id) {
            Some(&id) => id,
            None => {
                let kind = NodeType::from_resource(desc.kind);
                let id = self.add_node(kind, 0, Some(desc.friendly_name.clone()));
                self.nodes.get_mut(&id).unwrap().resource_id = Some(desc.id);
                self.resource_nodes.insert(desc.id, id);
                if kind == NodeType::Machine {
                    self.machines.insert(id);
                }
                id
            }
        };
        if topo.is_leaf() {
            self.leaves.insert(node_id);
            let cost = self.cost_model.leaf_resource_to_sink_cost(desc);
            if self.arcs.contains_key(&(node_id, self.sink_id)) {
                self.change_arc(node_id, self.sink_id, 0, desc.task_slots, cost, ArcKind::ResToSink);
            } else {
                self.add_arc(node_id, self.sink_id, 0, desc.task_slots, cost, ArcKind::ResToSink);
            }
        } else {
            for child in &topo.children {
                let child_id = self.add_resource_subtree(child);
                let cap = child.task_slots();
                let cost = self
                    .cost_model
                    .resource_to_resource_cost(desc, &child.descriptor);
                if self.arcs.contains_key(&(node_id, child_id)) {
                    self.change_arc(node_id, child_id, 0, cap, cost, ArcKind::ResToRes);
                } else {
                    self.add_arc(node_id, child_id, 0, cap, cost, ArcKind::ResToRes);
                }
            }
        }
        node_id
    }

    /// Resource node ids reachable from `root_nid` through topology arcs.
    fn collect_resource_subtree(&mut self, root_nid: u64) -> Vec<u64> {
        let epoch = self.begin_visit();
        let sink = self.sink_id;
        let mut out = Vec::new();
        let mut stack = vec![root_nid];
        while let Some(id) = stack.pop() {
            if !self.visit(id, epoch) {
                continue;
            }
            let node = &self.nodes[&id];
            if !node.is_resource_node() {
                continue;
            }
            out.push(id);
            stack.extend(node.outgoing.iter().copied().filter(|&d| d != sink));
        }
        out
    }

    fn wire_equivalence_classes_to_machines(&mut self, root: &ResourceTopology) {
        if self.ec_nodes.is_empty() {
            return;
        }
        let mut stack = vec![root];
        while let Some(topo) = stack.pop() {
            if topo.descriptor.kind == ResourceKind::Machine {
                if let Some(&m_nid) = self.resource_nodes.get(&topo.descriptor.id) {
                    let cap = topo.task_slots();
                    let ecs: Vec<(EquivClassId, u64)> =
                        self.ec_nodes.iter().map(|(&ec, &nid)| (ec, nid)).collect();
                    for (ec, ec_nid) in ecs {
                        let cost = self
                            .cost_model
                            .equivalence_class_to_resource_cost(ec, &topo.descriptor);
                        if self.arcs.contains_key(&(ec_nid, m_nid)) {
                            self.change_arc(ec_nid, m_nid, 0, cap, cost, ArcKind::Other);
                        } else {
                            self.add_arc(ec_nid, m_nid, 0, cap, cost, ArcKind::Other);
                        }
                    }
                }
            }
            stack.extend(topo.children.iter());
        }
    }

    // ---- job and task nodes --------------------------------------------

    /// Installs (or refreshes) the nodes and arcs for a job's runnable
    /// tasks: the per-job unscheduled aggregator, one supply node per task,
    /// the unscheduled and wildcard arcs, class arcs, and preference arcs
    /// to candidate leaves.
    pub fn add_or_update_job_nodes(
        &mut self,
        job: &JobDescriptor,
        tasks: &[TaskDescriptor],
        resources: &ResourceMap,
    ) {
        let agg_id = self.ensure_job_aggregator(job);
        for td in tasks {
            if !td.is_runnable() {
                continue;
            }
            if let Some(&nid) = self.task_nodes.get(&td.uid) {
                self.refresh_task_arcs(nid, td, resources);
            } else {
                self.add_task_node(td, agg_id, resources);
            }
        }
        // Aggregator drain capacity tracks the job's unscheduled task count.
        let unscheduled = self.nodes[&agg_id].incoming.len() as u64;
        let cost = self.cost_model.unscheduled_aggregator_to_sink_cost(job);
        self.change_arc(agg_id, self.sink_id, 0, unscheduled, cost, ArcKind::UnschedAggToSink);
    }

    fn ensure_job_aggregator(&mut self, job: &JobDescriptor) -> u64 {
        if let Some(&id) = self.job_aggs.get(&job.id) {
            return id;
        }
        let id = self.add_node(
            NodeType::JobAggregator,
            0,
            Some(format!("UNSCHED_AGG_{}", job.id)),
        );
        self.nodes.get_mut(&id).unwrap().job_id = Some(job.id);
        self.job_aggs.insert(job.id, id);
        let cost = self.cost_model.unscheduled_aggregator_to_sink_cost(job);
        self.add_arc(id, self.sink_id, 0, 0, cost, ArcKind::UnschedAggToSink);
        debug!("created unscheduled aggregator {} for job {}", id, job.id);
        id
    }

    fn job_has_root_task(&self, job_id: JobId) -> bool {
        self.task_nodes.values().any(|&nid| {
            let node = &self.nodes[&nid];
            node.job_id == Some(job_id) && node.kind == NodeType::RootTask
        })
    }

    fn add_task_node(&mut self, td: &TaskDescriptor, agg_id: u64, resources: &ResourceMap) {
        let kind = if self.job_has_root_task(td.job_id) {
            NodeType::UnscheduledTask
        } else {
            NodeType::RootTask
        };
        let nid = self.add_node(kind, 1, Some(td.name.clone()));
        {
            let node = self.nodes.get_mut(&nid).unwrap();
            node.task_id = Some(td.uid);
            node.job_id = Some(td.job_id);
        }
        self.task_nodes.insert(td.uid, nid);
        // The sink absorbs the new unit of supply.
        let sink_excess = self.nodes[&self.sink_id].excess - 1;
        self.set_excess(self.sink_id, sink_excess);
        self.cost_model.add_task(td);

        let cost = self.cost_model.task_to_unscheduled_aggregator_cost(td);
        self.add_arc(nid, agg_id, 0, 1, cost, ArcKind::TaskToUnsched);
        let cost = self.cost_model.task_to_cluster_aggregator_cost(td);
        self.add_arc(nid, self.cluster_agg_id, 0, 1, cost, ArcKind::Other);

        for ec in self.cost_model.task_equivalence_classes(td) {
            let ec_nid = self.ensure_equivalence_class_node(ec, resources);
            if !self.arcs.contains_key(&(nid, ec_nid)) {
                let cost = self.cost_model.task_to_equivalence_class_cost(td, ec);
                self.add_arc(nid, ec_nid, 0, 1, cost, ArcKind::TaskToEquiv);
            }
        }

        for res_id in self.cost_model.task_preference_leaves(td) {
            let Some(&leaf_nid) = self.resource_nodes.get(&res_id) else {
                continue;
            };
            if !self.leaves.contains(&leaf_nid) {
                continue;
            }
            let Some(rd) = resources.get(&res_id) else {
                continue;
            };
            let cost = self.cost_model.task_to_resource_cost(td, rd);
            if !self.arcs.contains_key(&(nid, leaf_nid)) {
                self.add_arc(nid, leaf_nid, 0, 1, cost, ArcKind::TaskToRes);
            }
        }
        debug!("added task node {} for task {}", nid, td.uid);
    }

    /// Re-prices the outgoing arcs of an existing unscheduled task from the
    /// current cost model. A bound task keeps its running arc untouched.
    fn refresh_task_arcs(&mut self, nid: u64, td: &TaskDescriptor, resources: &ResourceMap) {
        if self.nodes[&nid].kind == NodeType::ScheduledTask {
            return;
        }
        let outgoing: Vec<u64> = self.nodes[&nid].outgoing.iter().copied().collect();
        for dst in outgoing {
            let (kind, lo, hi) = {
                let arc = &self.arcs[&(nid, dst)];
                (arc.kind, arc.cap_lower, arc.cap_upper)
            };
            let cost = if dst == self.cluster_agg_id {
                self.cost_model.task_to_cluster_aggregator_cost(td)
            } else {
                match kind {
                    ArcKind::TaskToUnsched => {
                        self.cost_model.task_to_unscheduled_aggregator_cost(td)
                    }
                    ArcKind::TaskToEquiv => {
                        let ec = self.nodes[&dst]
                            .ec_id
                            .unwrap_or_else(|| panic!("node {} is not a class node", dst));
                        self.cost_model.task_to_equivalence_class_cost(td, ec)
                    }
                    ArcKind::TaskToRes => {
                        let res_id = self.nodes[&dst]
                            .resource_id
                            .unwrap_or_else(|| panic!("node {} is not a resource node", dst));
                        match resources.get(&res_id) {
                            Some(rd) => self.cost_model.task_to_resource_cost(td, rd),
                            None => continue,
                        }
                    }
                    _ => continue,
                }
            };
            self.change_arc(nid, dst, lo, hi, cost, kind);
        }
    }

    fn ensure_equivalence_class_node(&mut self, ec: EquivClassId, resources: &ResourceMap) -> u64 {
        if let Some(&id) = self.ec_nodes.get(&ec) {
            return id;
        }
        let id = self.add_node(NodeType::EquivalenceClass, 0, Some(format!("EC_{}", ec)));
        self.nodes.get_mut(&id).unwrap().ec_id = Some(ec);
        self.ec_nodes.insert(ec, id);

        let machines: Vec<u64> = self.machines.iter().copied().collect();
        for m_nid in machines {
            let Some(res_id) = self.nodes[&m_nid].resource_id else {
                continue;
            };
            let Some(rd) = resources.get(&res_id) else {
                continue;
            };
            let cap = self.subtree_slots(m_nid);
            let cost = self.cost_model.equivalence_class_to_resource_cost(ec, rd);
            self.add_arc(id, m_nid, 0, cap, cost, ArcKind::Other);
        }

        for dst_ec in self.cost_model.equivalence_class_to_equivalence_class_arcs(ec) {
            let dst_nid = self.ensure_equivalence_class_node(dst_ec, resources);
            if !self.arcs.contains_key(&(id, dst_nid)) {
                self.add_arc(id, dst_nid, 0, EC_ARC_CAPACITY, 0, ArcKind::Other);
            }
        }
        id
    }

    fn subtree_slots(&self, nid: u64) -> u64 {
        if self.leaves.contains(&nid) {
            return self
                .arcs
                .get(&(nid, self.sink_id))
                .map(|a| a.cap_upper)
                .unwrap_or(0);
        }
        self.nodes[&nid]
            .outgoing
            .iter()
            .filter_map(|&dst| self.arcs.get(&(nid, dst)))
            .filter(|a| a.kind == ArcKind::ResToRes)
            .map(|a| a.cap_upper)
            .sum()
    }

    // ---- binding and removal -------------------------------------------

    /// Locks a placement in: every outgoing arc of the task except the one
    /// to the chosen leaf is removed, and the surviving arc becomes the
    /// running arc with capacity one and the continuation cost. This also
    /// forgoes preemption and migration of the task.
    pub fn update_arcs_for_bound_task(
        &mut self,
        task_id: TaskId,
        resource_id: ResourceId,
        td: &TaskDescriptor,
    ) {
        let nid = *self
            .task_nodes
            .get(&task_id)
            .unwrap_or_else(|| panic!("bound task {} has no graph node", task_id));
        let leaf = *self
            .resource_nodes
            .get(&resource_id)
            .unwrap_or_else(|| panic!("bound resource {} has no graph node", resource_id));

        // The task no longer drains through its job aggregator.
        if let Some(job_id) = self.nodes[&nid].job_id {
            if let Some(&agg) = self.job_aggs.get(&job_id) {
                if self.arcs.contains_key(&(nid, agg)) {
                    self.decrement_aggregator_capacity(agg);
                }
            }
        }

        let outgoing: Vec<u64> = self.nodes[&nid].outgoing.iter().copied().collect();
        for dst in outgoing {
            if dst != leaf {
                self.remove_arc(nid, dst);
            }
        }
        let cost = self.cost_model.task_continuation_cost(td);
        if self.arcs.contains_key(&(nid, leaf)) {
            self.change_arc(nid, leaf, 0, 1, cost, ArcKind::Running);
        } else {
            // Placed through the wildcard aggregator; materialise the arc.
            self.add_arc(nid, leaf, 0, 1, cost, ArcKind::Running);
        }
        self.nodes.get_mut(&nid).unwrap().kind = NodeType::ScheduledTask;
        info!("task {} bound to resource {}", task_id, resource_id);
    }

    fn decrement_aggregator_capacity(&mut self, agg: u64) {
        let (cap, cost, kind) = {
            let arc = self
                .arcs
                .get(&(agg, self.sink_id))
                .unwrap_or_else(|| panic!("aggregator {} has no sink arc", agg));
            (arc.cap_upper, arc.cost, arc.kind)
        };
        self.change_arc(agg, self.sink_id, 0, cap.saturating_sub(1), cost, kind);
    }

    /// Removes a completed or failed task from the graph along with all its
    /// incident arcs, returning its unit of supply to the sink.
    pub fn delete_task_node(&mut self, task_id: TaskId) {
        let nid = self
            .task_nodes
            .remove(&task_id)
            .unwrap_or_else(|| panic!("delete_task_node: task {} not in graph", task_id));
        let job_id = self.nodes[&nid].job_id;
        if let Some(agg) = job_id.and_then(|j| self.job_aggs.get(&j).copied()) {
            if self.arcs.contains_key(&(nid, agg)) {
                self.decrement_aggregator_capacity(agg);
            }
        }
        self.remove_node(nid);
        let sink_excess = self.nodes[&self.sink_id].excess + 1;
        self.set_excess(self.sink_id, sink_excess);
        self.cost_model.remove_task(task_id);
        self.prune_orphaned_equivalence_classes();
        debug!("deleted task node {} for task {}", nid, task_id);
    }

    /// Removes every task node of the job and the job's unscheduled
    /// aggregator.
    pub fn delete_nodes_for_job(&mut self, job_id: JobId) {
        let tasks: Vec<TaskId> = self
            .task_nodes
            .iter()
            .filter(|(_, &nid)| self.nodes[&nid].job_id == Some(job_id))
            .map(|(&task_id, _)| task_id)
            .collect();
        for task_id in tasks {
            self.delete_task_node(task_id);
        }
        if let Some(agg) = self.job_aggs.remove(&job_id) {
            self.remove_node(agg);
        }
        info!("removed all nodes for job {}", job_id);
    }

    /// Equivalence classes no task feeds any more are dropped, including
    /// chains that become orphaned transitively.
    fn prune_orphaned_equivalence_classes(&mut self) {
        loop {
            let orphaned: Vec<(EquivClassId, u64)> = self
                .ec_nodes
                .iter()
                .filter(|(_, &nid)| self.nodes[&nid].incoming.is_empty())
                .map(|(&ec, &nid)| (ec, nid))
                .collect();
            if orphaned.is_empty() {
                return;
            }
            for (ec, nid) in orphaned {
                self.ec_nodes.remove(&ec);
                self.remove_node(nid);
            }
        }
    }

    // ---- accessors -------------------------------------------------------

    pub fn node(&self, id: u64) -> Option<&FlowNode> {
        self.nodes.get(&id)
    }

    pub fn arc(&self, src: u64, dst: u64) -> Option<&FlowArc> {
        self.arcs.get(&(src, dst))
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Highest id handed out so far; ids are dense but deletions leave gaps.
    pub fn max_node_id(&self) -> u64 {
        self.next_id - 1
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> {
        self.nodes.values()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &FlowArc> {
        self.arcs.values()
    }

    pub fn sink_id(&self) -> u64 {
        self.sink_id
    }

    pub fn cluster_aggregator_id(&self) -> u64 {
        self.cluster_agg_id
    }

    pub fn task_node_id(&self, task_id: TaskId) -> Option<u64> {
        self.task_nodes.get(&task_id).copied()
    }

    pub fn resource_node_id(&self, resource_id: ResourceId) -> Option<u64> {
        self.resource_nodes.get(&resource_id).copied()
    }

    pub fn job_aggregator_id(&self, job_id: JobId) -> Option<u64> {
        self.job_aggs.get(&job_id).copied()
    }

    pub fn is_leaf(&self, id: u64) -> bool {
        self.leaves.contains(&id)
    }

    pub fn has_resource_nodes(&self) -> bool {
        !self.resource_nodes.is_empty()
    }

    pub fn changes(&self) -> &[GraphChange] {
        self.changes.as_slice()
    }

    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }

    /// Sum of all node excesses; zero iff the network is flow-feasible.
    pub fn total_excess(&self) -> i64 {
        self.nodes.values().map(|n| n.excess).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn assert_adjacency_symmetry(m: &FlowGraphManager) {
        for arc in m.arcs() {
            assert!(
                m.node(arc.src).unwrap().outgoing.contains(&arc.dst),
                "arc {}->{} missing from source adjacency",
                arc.src,
                arc.dst
            );
            assert!(
                m.node(arc.dst).unwrap().incoming.contains(&arc.src),
                "arc {}->{} missing from destination adjacency",
                arc.src,
                arc.dst
            );
        }
        for node in m.nodes() {
            for &dst in &node.outgoing {
                assert!(m.arc(node.id, dst).is_some(), "dangling outgoing entry {}->{}", node.id, dst);
            }
            for &src in &node.incoming {
                assert!(m.arc(src, node.id).is_some(), "dangling incoming entry {}->{}", src, node.id);
            }
        }
    }

    #[test]
    fn test_construction_singletons() {
        let m = FlowGraphManager::new(Box::new(ZeroCostModel));
        assert_eq!(m.num_nodes(), 2);
        assert_eq!(m.node(m.sink_id()).unwrap().kind, NodeType::Sink);
        assert_eq!(
            m.node(m.cluster_aggregator_id()).unwrap().kind,
            NodeType::JobAggregator
        );
        assert_eq!(m.total_excess(), 0);
    }

    #[test]
    fn test_add_resource_topology_shape() {
        let mut m = FlowGraphManager::new(Box::new(ZeroCostModel));
        m.add_resource_topology(&machine(1, 2));

        // sink + cluster agg + machine + 2 PUs
        assert_eq!(m.num_nodes(), 5);
        let machine_nid = m.resource_node_id(machine_id(1)).unwrap();
        assert_eq!(m.node(machine_nid).unwrap().kind, NodeType::Machine);

        for i in 0..2 {
            let pu_nid = m.resource_node_id(pu_id(1, i)).unwrap();
            assert!(m.is_leaf(pu_nid));
            let to_sink = m.arc(pu_nid, m.sink_id()).unwrap();
            assert_eq!(to_sink.kind, ArcKind::ResToSink);
            assert_eq!(to_sink.cap_upper, 1);
            let from_machine = m.arc(machine_nid, pu_nid).unwrap();
            assert_eq!(from_machine.kind, ArcKind::ResToRes);
        }
        let attach = m.arc(m.cluster_aggregator_id(), machine_nid).unwrap();
        assert_eq!(attach.cap_upper, 2);
        assert_adjacency_symmetry(&m);
    }

    #[test]
    fn test_update_topology_grows_machine_incrementally() {
        let mut m = FlowGraphManager::new(Box::new(ZeroCostModel));
        m.add_resource_topology(&machine(1, 2));
        m.clear_changes();

        m.update_resource_topology(&machine(1, 3));

        let machine_nid = m.resource_node_id(machine_id(1)).unwrap();
        let new_pu = m.resource_node_id(pu_id(1, 2)).unwrap();
        let changes = m.changes().to_vec();
        assert_eq!(
            changes,
            vec![
                GraphChange::AddNode { id: new_pu, excess: 0, comment: Some("m1_pu2".to_string()) },
                GraphChange::AddArc {
                    src: new_pu,
                    dst: m.sink_id(),
                    cap_lower: 0,
                    cap_upper: 1,
                    cost: 0,
                    kind: ArcKind::ResToSink,
                },
                GraphChange::AddArc {
                    src: machine_nid,
                    dst: new_pu,
                    cap_lower: 0,
                    cap_upper: 1,
                    cost: 0,
                    kind: ArcKind::ResToRes,
                },
                GraphChange::ChangeArc {
                    src: m.cluster_aggregator_id(),
                    dst: machine_nid,
                    cap_lower: 0,
                    cap_upper: 3,
                    cost: 0,
                    kind: ArcKind::Other,
                    old_cost: 0,
                },
            ]
        );
        assert_adjacency_symmetry(&m);
    }

    #[test]
    fn test_update_topology_removes_vanished_leaves() {
        let mut m = FlowGraphManager::new(Box::new(ZeroCostModel));
        m.add_resource_topology(&machine(1, 3));
        m.update_resource_topology(&machine(1, 2));

        assert!(m.resource_node_id(pu_id(1, 2)).is_none());
        assert!(m.resource_node_id(pu_id(1, 0)).is_some());
        let machine_nid = m.resource_node_id(machine_id(1)).unwrap();
        assert_eq!(m.arc(m.cluster_aggregator_id(), machine_nid).unwrap().cap_upper, 2);
        assert_adjacency_symmetry(&m);
    }

    #[test]
    fn test_add_job_nodes_shape_and_feasibility() {
        let mut m = FlowGraphManager::new(Box::new(ZeroCostModel));
        m.add_resource_topology(&machine(1, 2));
        let jd = job(9);
        let tasks = vec![task(1, &jd), task(2, &jd)];
        m.add_or_update_job_nodes(&jd, &tasks, &resource_map(&[machine(1, 2)]));

        let agg = m.job_aggregator_id(jd.id).unwrap();
        assert_eq!(m.arc(agg, m.sink_id()).unwrap().cap_upper, 2);
        for td in &tasks {
            let nid = m.task_node_id(td.uid).unwrap();
            let node = m.node(nid).unwrap();
            assert_eq!(node.excess, 1);
            assert!(node.outgoing.contains(&agg));
            assert!(node.outgoing.contains(&m.cluster_aggregator_id()));
            let unsched = m.arc(nid, agg).unwrap();
            assert_eq!(unsched.kind, ArcKind::TaskToUnsched);
            assert_eq!(unsched.cap_upper, 1);
            assert_eq!(unsched.cost, 100);
        }
        // First task of the job is its root.
        let first = m.node(m.task_node_id(1).unwrap()).unwrap();
        assert_eq!(first.kind, NodeType::RootTask);
        let second = m.node(m.task_node_id(2).unwrap()).unwrap();
        assert_eq!(second.kind, NodeType::UnscheduledTask);

        assert_eq!(m.node(m.sink_id()).unwrap().excess, -2);
        assert_eq!(m.total_excess(), 0);
        assert_adjacency_symmetry(&m);
    }

    #[test]
    fn test_add_job_nodes_is_idempotent() {
        let mut m = FlowGraphManager::new(Box::new(ZeroCostModel));
        m.add_resource_topology(&machine(1, 2));
        let jd = job(9);
        let tasks = vec![task(1, &jd)];
        let resources = resource_map(&[machine(1, 2)]);

        m.add_or_update_job_nodes(&jd, &tasks, &resources);
        let (nodes, arcs) = (m.num_nodes(), m.num_arcs());
        m.add_or_update_job_nodes(&jd, &tasks, &resources);

        assert_eq!(m.num_nodes(), nodes);
        assert_eq!(m.num_arcs(), arcs);
        assert_eq!(m.total_excess(), 0);
        assert_adjacency_symmetry(&m);
    }

    #[test]
    fn test_equivalence_class_wiring_and_pruning() {
        let mut m = FlowGraphManager::new(Box::new(ClassedCostModel));
        m.add_resource_topology(&machine(1, 2));
        let jd = job(9);
        let tasks = vec![task(1, &jd)];
        m.add_or_update_job_nodes(&jd, &tasks, &resource_map(&[machine(1, 2)]));

        let task_nid = m.task_node_id(1).unwrap();
        let machine_nid = m.resource_node_id(machine_id(1)).unwrap();
        // The task feeds class 7, class 7 chains to class 8, and both
        // classes reach the machine.
        let ec7 = m
            .nodes()
            .find(|n| n.ec_id == Some(7))
            .map(|n| n.id)
            .expect("class 7 node");
        let ec8 = m
            .nodes()
            .find(|n| n.ec_id == Some(8))
            .map(|n| n.id)
            .expect("class 8 node");
        assert_eq!(m.arc(task_nid, ec7).unwrap().kind, ArcKind::TaskToEquiv);
        assert!(m.arc(ec7, ec8).is_some());
        assert!(m.arc(ec7, machine_nid).is_some());
        assert!(m.arc(ec8, machine_nid).is_some());
        assert_adjacency_symmetry(&m);

        // Dropping the only task orphans the class chain.
        m.delete_task_node(1);
        assert!(m.nodes().all(|n| !n.is_equivalence_class_node()));
        assert_eq!(m.total_excess(), 0);
        assert_adjacency_symmetry(&m);
    }

    #[test]
    fn test_bound_task_keeps_single_running_arc() {
        let mut m = FlowGraphManager::new(Box::new(ZeroCostModel));
        m.add_resource_topology(&machine(1, 2));
        let jd = job(9);
        let tasks = vec![task(1, &jd)];
        m.add_or_update_job_nodes(&jd, &tasks, &resource_map(&[machine(1, 2)]));

        // No direct preference arc exists, so the running arc is created.
        m.update_arcs_for_bound_task(1, pu_id(1, 0), &tasks[0]);

        let nid = m.task_node_id(1).unwrap();
        let node = m.node(nid).unwrap();
        assert_eq!(node.kind, NodeType::ScheduledTask);
        assert_eq!(node.outgoing.len(), 1);
        let leaf_nid = m.resource_node_id(pu_id(1, 0)).unwrap();
        let running = m.arc(nid, leaf_nid).unwrap();
        assert_eq!(running.kind, ArcKind::Running);
        assert_eq!(running.cap_upper, 1);
        // The aggregator no longer counts this task.
        let agg = m.job_aggregator_id(jd.id).unwrap();
        assert_eq!(m.arc(agg, m.sink_id()).unwrap().cap_upper, 0);
        assert_adjacency_symmetry(&m);
    }

    #[test]
    fn test_delete_task_restores_sink_excess() {
        let mut m = FlowGraphManager::new(Box::new(ZeroCostModel));
        m.add_resource_topology(&machine(1, 1));
        let jd = job(9);
        m.add_or_update_job_nodes(&jd, &[task(1, &jd)], &resource_map(&[machine(1, 1)]));
        assert_eq!(m.node(m.sink_id()).unwrap().excess, -1);

        m.delete_task_node(1);
        assert!(m.task_node_id(1).is_none());
        assert_eq!(m.node(m.sink_id()).unwrap().excess, 0);
        // The leaf's sink arc is untouched.
        let pu_nid = m.resource_node_id(pu_id(1, 0)).unwrap();
        assert_eq!(m.arc(pu_nid, m.sink_id()).unwrap().cap_upper, 1);
        assert_adjacency_symmetry(&m);
    }

    #[test]
    fn test_delete_job_leaves_other_jobs_alone() {
        let mut m = FlowGraphManager::new(Box::new(ZeroCostModel));
        let jd1 = job(1);
        let jd2 = job(2);
        let resources = ResourceMap::new();
        m.add_or_update_job_nodes(&jd1, &[task(1, &jd1)], &resources);
        m.add_or_update_job_nodes(&jd2, &[task(2, &jd2)], &resources);

        m.delete_nodes_for_job(jd1.id);

        assert!(m.job_aggregator_id(jd1.id).is_none());
        assert!(m.task_node_id(1).is_none());
        assert!(m.job_aggregator_id(jd2.id).is_some());
        assert!(m.task_node_id(2).is_some());
        assert_eq!(m.total_excess(), 0);
        assert_adjacency_symmetry(&m);
    }

    #[test]
    #[should_panic(expected = "delete_task_node")]
    fn test_deleting_absent_task_panics() {
        let mut m = FlowGraphManager::new(Box::new(ZeroCostModel));
        m.delete_task_node(123);
    }
}
