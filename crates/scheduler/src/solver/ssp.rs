use std::collections::{HashMap, VecDeque};

use tracing::debug;

use sluice_core::error::SluiceError;
use sluice_graph::dimacs::FlowEdge;
use sluice_graph::manager::FlowGraphManager;

use super::FlowSolver;

/// Built-in successive-shortest-path min-cost-flow solver.
///
/// Augments one shortest path at a time from a super-source over all supply
/// nodes to a super-sink over all demand nodes, which is plenty for
/// cluster-sized networks. Deployments with very large graphs configure an
/// external solver instead.
#[derive(Default)]
pub struct SspSolver;

impl SspSolver {
    pub fn new() -> Self {
        Self
    }
}

struct Edge {
    to: usize,
    /// Index of the paired reverse edge in `adj[to]`.
    rev: usize,
    cap: u64,
    cost: i64,
    /// Original `(src, dst)` for forward edges; `None` on residuals.
    orig: Option<(u64, u64)>,
}

fn add_edge(adj: &mut [Vec<Edge>], u: usize, v: usize, cap: u64, cost: i64, orig: Option<(u64, u64)>) {
    let ru = adj[v].len();
    let rv = adj[u].len();
    adj[u].push(Edge { to: v, rev: ru, cap, cost, orig });
    adj[v].push(Edge { to: u, rev: rv, cap: 0, cost: -cost, orig: None });
}

impl FlowSolver for SspSolver {
    fn solve(&mut self, graph: &FlowGraphManager) -> Result<Vec<FlowEdge>, SluiceError> {
        let ids: Vec<u64> = graph.nodes().map(|n| n.id).collect();
        let index: HashMap<u64, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let n = ids.len() + 2;
        let source = ids.len();
        let target = ids.len() + 1;

        let mut adj: Vec<Vec<Edge>> = (0..n).map(|_| Vec::new()).collect();
        for arc in graph.arcs() {
            add_edge(
                &mut adj,
                index[&arc.src],
                index[&arc.dst],
                arc.cap_upper,
                arc.cost,
                Some((arc.src, arc.dst)),
            );
        }
        let mut supply_total = 0u64;
        for node in graph.nodes() {
            if node.excess > 0 {
                add_edge(&mut adj, source, index[&node.id], node.excess as u64, 0, None);
                supply_total += node.excess as u64;
            } else if node.excess < 0 {
                add_edge(&mut adj, index[&node.id], target, (-node.excess) as u64, 0, None);
            }
        }

        let mut shipped = 0u64;
        while shipped < supply_total {
            // Shortest path in the residual network; label-correcting search
            // tolerates the negative residual costs.
            let mut dist = vec![i64::MAX; n];
            let mut prev: Vec<Option<(usize, usize)>> = vec![None; n];
            let mut in_queue = vec![false; n];
            let mut queue = VecDeque::new();
            dist[source] = 0;
            in_queue[source] = true;
            queue.push_back(source);
            while let Some(u) = queue.pop_front() {
                in_queue[u] = false;
                let du = dist[u];
                for (ei, edge) in adj[u].iter().enumerate() {
                    if edge.cap == 0 {
                        continue;
                    }
                    let nd = du + edge.cost;
                    if nd < dist[edge.to] {
                        dist[edge.to] = nd;
                        prev[edge.to] = Some((u, ei));
                        if !in_queue[edge.to] {
                            in_queue[edge.to] = true;
                            queue.push_back(edge.to);
                        }
                    }
                }
            }
            if dist[target] == i64::MAX {
                return Err(SluiceError::Solver(format!(
                    "flow network is infeasible: {} of {} supply units unroutable",
                    supply_total - shipped,
                    supply_total
                )));
            }

            let mut bottleneck = u64::MAX;
            let mut v = target;
            while let Some((u, ei)) = prev[v] {
                bottleneck = bottleneck.min(adj[u][ei].cap);
                v = u;
            }
            let mut v = target;
            while let Some((u, ei)) = prev[v] {
                let rev = adj[u][ei].rev;
                adj[u][ei].cap -= bottleneck;
                adj[v][rev].cap += bottleneck;
                v = u;
            }
            shipped += bottleneck;
        }
        debug!("solved min-cost flow: {} supply units shipped", shipped);

        let mut flows = Vec::new();
        for u in 0..n {
            for edge in &adj[u] {
                if let Some((src, dst)) = edge.orig {
                    // Net flow on a forward edge accumulates as residual
                    // capacity on its paired reverse edge.
                    let flow = adj[edge.to][edge.rev].cap;
                    if flow > 0 {
                        flows.push(FlowEdge { src, dst, flow });
                    }
                }
            }
        }
        Ok(flows)
    }
}
