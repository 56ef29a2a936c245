use crate::arc::{ArcKind, FlowArc};

/// One structural edit to the flow network.
///
/// Records are appended in the order the edits happen, so replaying a log
/// against an empty network reproduces the final graph. `AddNode` doubles as
/// a supply update: replaying it for an id that already exists rewrites that
/// node's excess (the sink's demand moves this way as tasks come and go).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphChange {
    AddNode {
        id: u64,
        excess: i64,
        comment: Option<String>,
    },
    RemoveNode {
        id: u64,
    },
    AddArc {
        src: u64,
        dst: u64,
        cap_lower: u64,
        cap_upper: u64,
        cost: i64,
        kind: ArcKind,
    },
    ChangeArc {
        src: u64,
        dst: u64,
        cap_lower: u64,
        cap_upper: u64,
        cost: i64,
        kind: ArcKind,
        old_cost: i64,
    },
    RemoveArc {
        src: u64,
        dst: u64,
    },
}

impl GraphChange {
    pub fn add_arc(arc: &FlowArc) -> Self {
        GraphChange::AddArc {
            src: arc.src,
            dst: arc.dst,
            cap_lower: arc.cap_lower,
            cap_upper: arc.cap_upper,
            cost: arc.cost,
            kind: arc.kind,
        }
    }

    pub fn change_arc(arc: &FlowArc, old_cost: i64) -> Self {
        GraphChange::ChangeArc {
            src: arc.src,
            dst: arc.dst,
            cap_lower: arc.cap_lower,
            cap_upper: arc.cap_upper,
            cost: arc.cost,
            kind: arc.kind,
            old_cost,
        }
    }
}

/// Ordered record of graph mutations since the last successful solve.
///
/// Consumed by the dispatcher to feed incremental solvers; cleared after the
/// solver has accepted it, retained when a round fails so the next round can
/// retry.
#[derive(Debug, Default)]
pub struct ChangeLog {
    changes: Vec<GraphChange>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, change: GraphChange) {
        self.changes.push(change);
    }

    pub fn as_slice(&self) -> &[GraphChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }
}
