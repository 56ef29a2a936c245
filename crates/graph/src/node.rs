use std::collections::BTreeSet;

use sluice_core::types::{
    EquivClassId, JobId, ResourceId, ResourceKind, TaskDescriptor, TaskId,
};

/// Role of a node in the scheduling flow network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    RootTask,
    ScheduledTask,
    UnscheduledTask,
    JobAggregator,
    Sink,
    EquivalenceClass,
    Coordinator,
    Machine,
    NumaNode,
    Socket,
    Cache,
    Core,
    Pu,
}

impl NodeType {
    /// Maps a resource's hierarchy level to the node type representing it.
    pub fn from_resource(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Coordinator => NodeType::Coordinator,
            ResourceKind::Machine => NodeType::Machine,
            ResourceKind::NumaNode => NodeType::NumaNode,
            ResourceKind::Socket => NodeType::Socket,
            ResourceKind::Cache => NodeType::Cache,
            ResourceKind::Core => NodeType::Core,
            ResourceKind::Pu => NodeType::Pu,
        }
    }

    pub fn is_task(self) -> bool {
        matches!(
            self,
            NodeType::RootTask | NodeType::ScheduledTask | NodeType::UnscheduledTask
        )
    }

    pub fn is_resource(self) -> bool {
        matches!(
            self,
            NodeType::Coordinator
                | NodeType::Machine
                | NodeType::NumaNode
                | NodeType::Socket
                | NodeType::Cache
                | NodeType::Core
                | NodeType::Pu
        )
    }
}

/// A node in the flow network.
///
/// Arcs are owned by the manager; the adjacency sets hold only the peer node
/// ids, so an arc is looked up as `(src, dst)` through the manager.
#[derive(Debug, Clone)]
pub struct FlowNode {
    pub id: u64,
    /// Supply (>0) or demand (<0); zero for interior nodes.
    pub excess: i64,
    pub kind: NodeType,
    pub job_id: Option<JobId>,
    pub resource_id: Option<ResourceId>,
    pub task_id: Option<TaskId>,
    pub ec_id: Option<EquivClassId>,
    /// Free-form label for debugging output.
    pub comment: Option<String>,
    /// Peers this node has arcs to.
    pub outgoing: BTreeSet<u64>,
    /// Peers with arcs to this node.
    pub incoming: BTreeSet<u64>,
    /// Traversal epoch; a node is visited when this equals the epoch of the
    /// running traversal.
    pub visited: u64,
}

impl FlowNode {
    pub fn new(id: u64, kind: NodeType) -> Self {
        Self {
            id,
            excess: 0,
            kind,
            job_id: None,
            resource_id: None,
            task_id: None,
            ec_id: None,
            comment: None,
            outgoing: BTreeSet::new(),
            incoming: BTreeSet::new(),
            visited: 0,
        }
    }

    pub fn is_task_node(&self) -> bool {
        self.kind.is_task()
    }

    pub fn is_resource_node(&self) -> bool {
        self.kind.is_resource()
    }

    pub fn is_equivalence_class_node(&self) -> bool {
        self.kind == NodeType::EquivalenceClass
    }

    /// Whether the task this node stands for has been handed to an executor.
    pub fn is_task_assigned_or_running(&self, td: &TaskDescriptor) -> bool {
        debug_assert_eq!(self.task_id, Some(td.uid));
        td.is_assigned_or_running()
    }
}
