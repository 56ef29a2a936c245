/// Category of an arc; records which cost-model capability priced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcKind {
    TaskToEquiv,
    TaskToRes,
    ResToRes,
    TaskToUnsched,
    UnschedAggToSink,
    ResToSink,
    /// The single arc left on a task after it is bound to a leaf.
    Running,
    Other,
}

/// A directed arc, identified by its `(src, dst)` endpoint pair.
#[derive(Debug, Clone)]
pub struct FlowArc {
    pub src: u64,
    pub dst: u64,
    pub cap_lower: u64,
    pub cap_upper: u64,
    pub cost: i64,
    pub kind: ArcKind,
}

impl FlowArc {
    pub fn new(src: u64, dst: u64, cap_lower: u64, cap_upper: u64, cost: i64, kind: ArcKind) -> Self {
        debug_assert!(cap_lower <= cap_upper, "arc {}->{}: capacity bounds inverted", src, dst);
        Self { src, dst, cap_lower, cap_upper, cost, kind }
    }
}
