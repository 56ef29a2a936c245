//! The scheduling flow network: typed nodes and arcs, a change log for
//! incremental solvers, the DIMACS codec, and the manager that keeps the
//! structure consistent across job and topology mutations.

pub mod arc;
pub mod change;
pub mod cost;
pub mod dimacs;
pub mod manager;
pub mod node;

#[cfg(test)]
pub(crate) mod test_support;

pub use arc::{ArcKind, FlowArc};
pub use change::{ChangeLog, GraphChange};
pub use cost::CostModel;
pub use manager::FlowGraphManager;
pub use node::{FlowNode, NodeType};
