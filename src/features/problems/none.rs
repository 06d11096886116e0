//! The `none` analysis: no flow functions, no fixed point. It exists so
//! module-wise (MW) runs have something to do besides building and merging
//! per-module ICFGs: the report it produces is a graph-merge diagnostic
//! (node/edge/call-site counts) rather than an analysis result.

use crate::features::icfg::{IcfgEdgeKind, IcfgGraph};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoneReport {
    pub node_count: usize,
    pub edge_count: usize,
    pub call_site_count: usize,
    pub unresolved_call_count: usize,
}

/// Runs no analysis; summarizes the ICFG it was handed.
pub struct NoneAnalysis;

impl NoneAnalysis {
    pub fn run(icfg: &IcfgGraph) -> NoneReport {
        let unresolved_call_count = icfg.call_sites().iter().filter(|c| c.unresolved).count();
        let mut unresolved_edges = 0usize;
        for node_id in icfg.node_ids() {
            unresolved_edges += icfg
                .successor_ids(node_id)
                .into_iter()
                .filter(|(_, kind)| matches!(kind, IcfgEdgeKind::UnresolvedCall))
                .count();
        }
        NoneReport {
            node_count: icfg.node_count(),
            edge_count: icfg.edge_count(),
            call_site_count: icfg.call_sites().len(),
            unresolved_call_count: unresolved_call_count.max(unresolved_edges),
        }
    }
}
