use std::io::{BufReader, BufWriter, Write};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use sluice_core::config::SolverConfig;
use sluice_core::error::SluiceError;
use sluice_graph::dimacs::{self, FlowEdge};
use sluice_graph::manager::FlowGraphManager;

use super::FlowSolver;

/// Drives an external min-cost-flow solver process over the DIMACS
/// protocol: the graph goes in on stdin, `f` lines come back on stdout.
///
/// In incremental mode the first round sends the full graph with the
/// manager's raw node ids and later rounds flush only the change log; the
/// solver is expected to track ids across rounds. One-shot mode compacts
/// ids to the contiguous space array-based solvers require and translates
/// the returned flows back.
pub struct ExternalSolver {
    config: SolverConfig,
    primed: bool,
}

impl ExternalSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config, primed: false }
    }
}

impl FlowSolver for ExternalSolver {
    fn solve(&mut self, graph: &FlowGraphManager) -> Result<Vec<FlowEdge>, SluiceError> {
        let mut child = Command::new(&self.config.binary)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        // A solver that dies early closes its stdin; keep any write error
        // aside until the child is reaped so the exit status wins.
        let mut mapping = None;
        let mut write_err: Option<SluiceError> = None;
        {
            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| SluiceError::Solver("solver stdin unavailable".to_string()))?;
            let mut stdin = BufWriter::new(stdin);
            let written = if self.config.incremental {
                if self.primed {
                    debug!("flushing {} graph changes to solver", graph.changes().len());
                    dimacs::write_changes(graph.changes(), &mut stdin)
                } else {
                    debug!("priming solver with full graph ({} nodes)", graph.num_nodes());
                    dimacs::write_graph(graph, &mut stdin)
                }
            } else {
                debug!("writing compacted graph to solver ({} nodes)", graph.num_nodes());
                dimacs::write_graph_compacted(graph, &mut stdin).map(|table| {
                    mapping = Some(table);
                })
            };
            if let Err(e) = written.and_then(|()| stdin.flush()) {
                write_err = Some(e.into());
            }
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SluiceError::Solver("solver stdout unavailable".to_string()))?;
        let flows = dimacs::parse_flows(BufReader::new(stdout));
        let status = child.wait()?;
        if !status.success() {
            warn!("solver exited with status {:?}", status.code());
            return Err(SluiceError::SolverExit { code: status.code().unwrap_or(-1) });
        }
        if let Some(e) = write_err {
            return Err(e);
        }
        let flows = flows?;

        let flows = match &mapping {
            None => flows,
            Some(table) => {
                let resolve = |dense: u64, line: &FlowEdge| {
                    table
                        .get(dense as usize)
                        .copied()
                        .filter(|&orig| orig != 0)
                        .ok_or_else(|| SluiceError::MalformedSolverOutput {
                            line: format!("f {} {} {}", line.src, line.dst, line.flow),
                        })
                };
                let mut translated = Vec::with_capacity(flows.len());
                for edge in &flows {
                    translated.push(FlowEdge {
                        src: resolve(edge.src, edge)?,
                        dst: resolve(edge.dst, edge)?,
                        flow: edge.flow,
                    });
                }
                translated
            }
        };
        if self.config.incremental {
            self.primed = true;
        }
        Ok(flows)
    }
}
