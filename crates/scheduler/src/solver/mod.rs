pub mod external;
pub mod ssp;

use sluice_core::error::SluiceError;
use sluice_graph::dimacs::FlowEdge;
use sluice_graph::manager::FlowGraphManager;

pub use external::ExternalSolver;
pub use ssp::SspSolver;

/// A min-cost-flow solver the dispatcher can drive.
///
/// Returns the flow on every arc that carries any, in the graph's node ids.
/// A failed solve leaves the graph and its change log untouched so the next
/// round can retry.
pub trait FlowSolver: Send {
    fn solve(&mut self, graph: &FlowGraphManager) -> Result<Vec<FlowEdge>, SluiceError>;
}
