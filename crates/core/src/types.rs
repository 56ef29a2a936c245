use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Process-unique task identifier, assigned densely by the submitter.
pub type TaskId = u64;
pub type JobId = Uuid;
pub type ResourceId = Uuid;
/// Identifier of a task or resource equivalence class.
pub type EquivClassId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Runnable,
    Assigned,
    Running,
    Completed,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobState {
    New,
    Runnable,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResourceState {
    Idle,
    Busy,
    Lost,
}

/// Level of a resource in the hardware hierarchy, coordinator down to
/// processing unit. Only processing units hold task slots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Coordinator,
    Machine,
    NumaNode,
    Socket,
    Cache,
    Core,
    Pu,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub uid: TaskId,
    pub job_id: JobId,
    pub name: String,
    pub state: TaskState,
    /// Submission timestamp, microseconds since the epoch.
    pub submit_time_us: u64,
    /// Expected runtime in microseconds, if a previous run produced one.
    pub runtime_estimate_us: Option<u64>,
}

impl TaskDescriptor {
    pub fn new(uid: TaskId, job_id: JobId, name: impl Into<String>) -> Self {
        Self {
            uid,
            job_id,
            name: name.into(),
            state: TaskState::Runnable,
            submit_time_us: 0,
            runtime_estimate_us: None,
        }
    }

    pub fn with_submit_time_us(mut self, submit_time_us: u64) -> Self {
        self.submit_time_us = submit_time_us;
        self
    }

    pub fn with_runtime_estimate_us(mut self, estimate_us: u64) -> Self {
        self.runtime_estimate_us = Some(estimate_us);
        self
    }

    pub fn is_runnable(&self) -> bool {
        self.state == TaskState::Runnable
    }

    pub fn is_assigned_or_running(&self) -> bool {
        matches!(self.state, TaskState::Assigned | TaskState::Running)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    pub friendly_name: String,
    pub kind: ResourceKind,
    pub state: ResourceState,
    /// Concurrent task capacity; non-zero only on processing units.
    pub task_slots: u64,
}

impl ResourceDescriptor {
    pub fn new(id: ResourceId, friendly_name: impl Into<String>, kind: ResourceKind) -> Self {
        let task_slots = if kind == ResourceKind::Pu { 1 } else { 0 };
        Self {
            id,
            friendly_name: friendly_name.into(),
            kind,
            state: ResourceState::Idle,
            task_slots,
        }
    }

    pub fn with_task_slots(mut self, task_slots: u64) -> Self {
        self.task_slots = task_slots;
        self
    }
}

/// A subtree of the hardware hierarchy as delivered on resource
/// registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTopology {
    pub descriptor: ResourceDescriptor,
    pub children: Vec<ResourceTopology>,
}

impl ResourceTopology {
    pub fn leaf(descriptor: ResourceDescriptor) -> Self {
        Self { descriptor, children: Vec::new() }
    }

    pub fn with_children(descriptor: ResourceDescriptor, children: Vec<ResourceTopology>) -> Self {
        Self { descriptor, children }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total task slots in this subtree (sum over its leaves).
    pub fn task_slots(&self) -> u64 {
        if self.is_leaf() {
            self.descriptor.task_slots
        } else {
            self.children.iter().map(ResourceTopology::task_slots).sum()
        }
    }

    /// All descriptors in the subtree, pre-order.
    pub fn descriptors(&self) -> Vec<&ResourceDescriptor> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(topo) = stack.pop() {
            out.push(&topo.descriptor);
            stack.extend(topo.children.iter());
        }
        out
    }

    /// Leaf descriptors of the subtree.
    pub fn leaves(&self) -> Vec<&ResourceDescriptor> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(topo) = stack.pop() {
            if topo.is_leaf() {
                out.push(&topo.descriptor);
            }
            stack.extend(topo.children.iter());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: JobId,
    pub name: String,
    pub state: JobState,
}

impl JobDescriptor {
    pub fn new(id: JobId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), state: JobState::New }
    }
}

pub type TaskMap = HashMap<TaskId, TaskDescriptor>;
pub type JobMap = HashMap<JobId, JobDescriptor>;
pub type ResourceMap = HashMap<ResourceId, ResourceDescriptor>;

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Created => "created",
            TaskState::Runnable => "runnable",
            TaskState::Assigned => "assigned",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Coordinator => "coordinator",
            ResourceKind::Machine => "machine",
            ResourceKind::NumaNode => "numa-node",
            ResourceKind::Socket => "socket",
            ResourceKind::Cache => "cache",
            ResourceKind::Core => "core",
            ResourceKind::Pu => "pu",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pu(id: u128) -> ResourceTopology {
        ResourceTopology::leaf(ResourceDescriptor::new(
            Uuid::from_u128(id),
            format!("pu{}", id),
            ResourceKind::Pu,
        ))
    }

    #[test]
    fn test_topology_slot_count() {
        let machine = ResourceTopology::with_children(
            ResourceDescriptor::new(Uuid::from_u128(1), "m0", ResourceKind::Machine),
            vec![pu(10), pu(11), pu(12)],
        );
        assert_eq!(machine.task_slots(), 3);
        assert_eq!(machine.leaves().len(), 3);
        assert_eq!(machine.descriptors().len(), 4);
    }

    #[test]
    fn test_task_descriptor_states() {
        let mut td = TaskDescriptor::new(1, Uuid::from_u128(7), "t1");
        assert!(td.is_runnable());
        assert!(!td.is_assigned_or_running());
        td.state = TaskState::Running;
        assert!(td.is_assigned_or_running());
    }
}
