//! DIMACS min-cost-flow codec.
//!
//! Full graphs are exchanged as the standard ASCII stream:
//!
//! ```text
//! p min <N> <M>
//! n <id> <excess>            one per node with non-zero excess
//! a <src> <dst> <lo> <hi> <cost>
//! c ...                      comments, ignored
//! ```
//!
//! Incremental mode flushes the change log with the same `n`/`a` grammar
//! prefixed by change markers: removals are `x n <id>` / `x a <src> <dst>`,
//! arc changes are `c a <src> <dst> <lo> <hi> <new_cost>` followed by a
//! comment line carrying the old cost. Solver responses are `f <src> <dst>
//! <flow>` lines; everything else is ignored.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use sluice_core::error::SluiceError;

use crate::change::GraphChange;
use crate::manager::FlowGraphManager;

/// Flow on one arc as reported by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowEdge {
    pub src: u64,
    pub dst: u64,
    pub flow: u64,
}

/// Emits the full graph with the manager's raw node ids. Deleted nodes
/// leave id gaps, so the problem line sizes the id space by the highest id
/// handed out; incremental solvers track ids across rounds and do not care.
pub fn write_graph<W: Write>(manager: &FlowGraphManager, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "c scheduling flow network: {} nodes, {} arcs",
        manager.num_nodes(),
        manager.num_arcs()
    )?;
    writeln!(out, "p min {} {}", manager.max_node_id(), manager.num_arcs())?;
    for node in manager.nodes() {
        if node.excess != 0 {
            writeln!(out, "n {} {}", node.id, node.excess)?;
        }
    }
    for arc in manager.arcs() {
        writeln!(
            out,
            "a {} {} {} {} {}",
            arc.src, arc.dst, arc.cap_lower, arc.cap_upper, arc.cost
        )?;
    }
    Ok(())
}

/// Emits the full graph with node ids compacted to `1..=N`, for one-shot
/// solvers that require a contiguous id space. Returns the dense-id to
/// original-id table (entry 0 unused) for translating flows back.
pub fn write_graph_compacted<W: Write>(
    manager: &FlowGraphManager,
    out: &mut W,
) -> io::Result<Vec<u64>> {
    let mut dense_to_orig = vec![0u64];
    let mut orig_to_dense: BTreeMap<u64, u64> = BTreeMap::new();
    for node in manager.nodes() {
        orig_to_dense.insert(node.id, dense_to_orig.len() as u64);
        dense_to_orig.push(node.id);
    }

    writeln!(out, "p min {} {}", manager.num_nodes(), manager.num_arcs())?;
    for node in manager.nodes() {
        if node.excess != 0 {
            writeln!(out, "n {} {}", orig_to_dense[&node.id], node.excess)?;
        }
    }
    for arc in manager.arcs() {
        writeln!(
            out,
            "a {} {} {} {} {}",
            orig_to_dense[&arc.src],
            orig_to_dense[&arc.dst],
            arc.cap_lower,
            arc.cap_upper,
            arc.cost
        )?;
    }
    Ok(dense_to_orig)
}

/// Flushes a change log for an incremental solver.
pub fn write_changes<W: Write>(changes: &[GraphChange], out: &mut W) -> io::Result<()> {
    for change in changes {
        match change {
            GraphChange::AddNode { id, excess, .. } => {
                writeln!(out, "n {} {}", id, excess)?;
            }
            GraphChange::RemoveNode { id } => {
                writeln!(out, "x n {}", id)?;
            }
            GraphChange::AddArc { src, dst, cap_lower, cap_upper, cost, .. } => {
                writeln!(out, "a {} {} {} {} {}", src, dst, cap_lower, cap_upper, cost)?;
            }
            GraphChange::ChangeArc { src, dst, cap_lower, cap_upper, cost, old_cost, .. } => {
                writeln!(out, "c a {} {} {} {} {}", src, dst, cap_lower, cap_upper, cost)?;
                writeln!(out, "c old cost {}", old_cost)?;
            }
            GraphChange::RemoveArc { src, dst } => {
                writeln!(out, "x a {} {}", src, dst)?;
            }
        }
    }
    Ok(())
}

/// A parsed full-graph stream.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DimacsGraph {
    pub num_nodes: u64,
    pub num_arcs: u64,
    /// Non-zero excesses keyed by node id.
    pub supplies: BTreeMap<u64, i64>,
    /// `(src, dst, cap_lower, cap_upper, cost)` tuples in stream order.
    pub arcs: Vec<(u64, u64, u64, u64, i64)>,
}

fn malformed(line: &str) -> SluiceError {
    SluiceError::MalformedDimacs { line: line.to_string() }
}

fn field<T: std::str::FromStr>(
    parts: &mut std::str::SplitWhitespace<'_>,
    line: &str,
) -> Result<T, SluiceError> {
    parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| malformed(line))
}

/// Parses a full-graph stream back into its node and arc sets.
pub fn parse_graph<R: BufRead>(input: R) -> Result<DimacsGraph, SluiceError> {
    let mut graph = DimacsGraph::default();
    for line in input.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            None | Some("c") => continue,
            Some("p") => {
                if parts.next() != Some("min") {
                    return Err(malformed(&line));
                }
                graph.num_nodes = field(&mut parts, &line)?;
                graph.num_arcs = field(&mut parts, &line)?;
            }
            Some("n") => {
                let id = field(&mut parts, &line)?;
                let excess = field(&mut parts, &line)?;
                graph.supplies.insert(id, excess);
            }
            Some("a") => {
                let src = field(&mut parts, &line)?;
                let dst = field(&mut parts, &line)?;
                let lo = field(&mut parts, &line)?;
                let hi = field(&mut parts, &line)?;
                let cost = field(&mut parts, &line)?;
                graph.arcs.push((src, dst, lo, hi, cost));
            }
            Some(_) => return Err(malformed(&line)),
        }
    }
    Ok(graph)
}

/// Parses a solver response; only `f` lines carry flows, the rest is noise.
pub fn parse_flows<R: BufRead>(input: R) -> Result<Vec<FlowEdge>, SluiceError> {
    let mut flows = Vec::new();
    for line in input.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if parts.next() != Some("f") {
            continue;
        }
        let src = parts.next().and_then(|p| p.parse().ok());
        let dst = parts.next().and_then(|p| p.parse().ok());
        let flow = parts.next().and_then(|p| p.parse().ok());
        match (src, dst, flow) {
            (Some(src), Some(dst), Some(flow)) => flows.push(FlowEdge { src, dst, flow }),
            _ => return Err(SluiceError::MalformedSolverOutput { line }),
        }
    }
    Ok(flows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::FlowGraphManager;
    use crate::test_support::*;

    fn populated_manager() -> FlowGraphManager {
        let mut m = FlowGraphManager::new(Box::new(ZeroCostModel));
        m.add_resource_topology(&machine(1, 2));
        let jd = job(3);
        m.add_or_update_job_nodes(&jd, &[task(1, &jd), task(2, &jd)], &resource_map(&[machine(1, 2)]));
        m
    }

    #[test]
    fn test_full_graph_round_trip() {
        let m = populated_manager();
        let mut buf = Vec::new();
        write_graph(&m, &mut buf).unwrap();

        let parsed = parse_graph(buf.as_slice()).unwrap();
        assert_eq!(parsed.num_arcs as usize, m.num_arcs());
        assert_eq!(parsed.arcs.len(), m.num_arcs());
        for (src, dst, lo, hi, cost) in &parsed.arcs {
            let arc = m.arc(*src, *dst).expect("arc survives the round trip");
            assert_eq!((arc.cap_lower, arc.cap_upper, arc.cost), (*lo, *hi, *cost));
        }
        let excesses: BTreeMap<u64, i64> = m
            .nodes()
            .filter(|n| n.excess != 0)
            .map(|n| (n.id, n.excess))
            .collect();
        assert_eq!(parsed.supplies, excesses);
    }

    #[test]
    fn test_compacted_ids_are_contiguous() {
        let mut m = populated_manager();
        // Punch a hole into the id space.
        m.delete_task_node(1);

        let mut buf = Vec::new();
        let mapping = write_graph_compacted(&m, &mut buf).unwrap();
        assert_eq!(mapping.len(), m.num_nodes() + 1);

        let parsed = parse_graph(buf.as_slice()).unwrap();
        assert_eq!(parsed.num_nodes as usize, m.num_nodes());
        for (src, dst, ..) in &parsed.arcs {
            assert!(*src >= 1 && *src <= parsed.num_nodes);
            assert!(*dst >= 1 && *dst <= parsed.num_nodes);
            // The mapping leads back to a real arc.
            assert!(m.arc(mapping[*src as usize], mapping[*dst as usize]).is_some());
        }
    }

    #[test]
    fn test_change_log_grammar() {
        use crate::arc::{ArcKind, FlowArc};
        use crate::change::GraphChange;

        let changes = vec![
            GraphChange::AddNode { id: 4, excess: 1, comment: None },
            GraphChange::add_arc(&FlowArc::new(4, 1, 0, 1, 100, ArcKind::TaskToUnsched)),
            GraphChange::change_arc(&FlowArc::new(4, 1, 0, 1, 80, ArcKind::TaskToUnsched), 100),
            GraphChange::RemoveArc { src: 4, dst: 1 },
            GraphChange::RemoveNode { id: 4 },
        ];
        let mut buf = Vec::new();
        write_changes(&changes, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec![
                "n 4 1",
                "a 4 1 0 1 100",
                "c a 4 1 0 1 80",
                "c old cost 100",
                "x a 4 1",
                "x n 4",
            ]
        );
    }

    #[test]
    fn test_parse_flows_skips_noise() {
        let input = "c solver chatter\ns 1234\nf 3 1 1\nf 4 2 0\n";
        let flows = parse_flows(input.as_bytes()).unwrap();
        assert_eq!(
            flows,
            vec![
                FlowEdge { src: 3, dst: 1, flow: 1 },
                FlowEdge { src: 4, dst: 2, flow: 0 },
            ]
        );
    }

    #[test]
    fn test_parse_flows_rejects_garbage_fields() {
        let err = parse_flows("f 3 x 1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SluiceError::MalformedSolverOutput { .. }));
    }
}
