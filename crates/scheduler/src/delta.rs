use serde::{Deserialize, Serialize};

use sluice_core::types::{ResourceId, TaskId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeltaKind {
    Place,
    Noop,
    /// Reserved; never emitted while bound tasks keep only their running arc.
    Preempt,
    /// Reserved; never emitted while bound tasks keep only their running arc.
    Migrate,
}

/// One placement action produced by a scheduling round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingDelta {
    pub kind: DeltaKind,
    pub task_id: TaskId,
    pub resource_id: ResourceId,
    /// Set once the action has been carried out.
    pub actioned: bool,
}
