//! The ICFG itself: a directed multigraph over IR
//! instructions, modeled as a `petgraph` arena with stable `NodeIndex`
//! handles.

use crate::ir::CallTarget;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IcfgEdgeKind {
    /// Fall-through or branch within one function.
    Normal,
    /// Call instruction -> resolved callee's entry.
    Call,
    /// Resolved callee's exit -> the call's return site; carries the
    /// originating call site's node id since a solver's return-flow
    /// function needs it and it isn't otherwise recoverable from
    /// the edge's own endpoints.
    Return { call_site: String },
    /// Call instruction -> its own return site, bypassing the callee.
    CallToReturn,
    /// Indirect call site whose candidate set resolved to nothing.
    UnresolvedCall,
}

#[derive(Debug, Clone)]
pub struct IcfgNode {
    pub function: String,
    pub node_id: String,
}

/// One indirect or direct call site as built, kept so `merge_with` can
/// re-resolve it against a larger known-function universe.
#[derive(Debug, Clone)]
pub struct CallSiteRecord {
    pub site: String,
    pub caller: String,
    pub target: CallTarget,
    pub resolved: Vec<String>,
    pub unresolved: bool,
    pub return_site: Option<String>,
}

#[derive(Default, Clone)]
pub struct IcfgGraph {
    graph: DiGraph<IcfgNode, IcfgEdgeKind>,
    index_of: FxHashMap<String, NodeIndex>,
    entries: FxHashMap<String, NodeIndex>,
    /// Functions known to the graph with no body (declarations); present
    /// so call edges are never drawn to a nonexistent entry.
    opaque_functions: HashSet<String>,
    call_sites: Vec<CallSiteRecord>,
    edge_set: HashSet<(String, String, IcfgEdgeKind)>,
}

impl IcfgGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.index_of.contains_key(node_id)
    }

    pub fn index_of(&self, node_id: &str) -> Option<NodeIndex> {
        self.index_of.get(node_id).copied()
    }

    pub fn entry_of(&self, function: &str) -> Option<NodeIndex> {
        self.entries.get(function).copied()
    }

    pub fn has_function(&self, function: &str) -> bool {
        self.entries.contains_key(function) || self.opaque_functions.contains(function)
    }

    pub fn call_sites(&self) -> &[CallSiteRecord] {
        &self.call_sites
    }

    pub fn mark_opaque(&mut self, function: &str) {
        self.opaque_functions.insert(function.to_string());
    }

    /// Insert a node if absent; returns its index either way.
    pub fn ensure_node(&mut self, function: &str, node_id: &str) -> NodeIndex {
        if let Some(&idx) = self.index_of.get(node_id) {
            return idx;
        }
        let idx = self.graph.add_node(IcfgNode { function: function.to_string(), node_id: node_id.to_string() });
        self.index_of.insert(node_id.to_string(), idx);
        idx
    }

    pub fn set_entry(&mut self, function: &str, idx: NodeIndex) {
        self.entries.entry(function.to_string()).or_insert(idx);
    }

    /// Add an edge if this exact (from, to, kind) triple is not already
    /// present, keeping `merge_with` idempotent.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, kind: IcfgEdgeKind) {
        let from_id = self.graph[from].node_id.clone();
        let to_id = self.graph[to].node_id.clone();
        if !self.edge_set.insert((from_id, to_id, kind.clone())) {
            return;
        }
        self.graph.add_edge(from, to, kind);
    }

    /// Remove the outgoing `UnresolvedCall` edge from `from`, if one
    /// exists. Used when a merge resolves a call site that had no
    /// candidates at per-module build time, so the graph stops reporting
    /// it as unresolved once the real call/return edges are drawn.
    pub fn remove_unresolved_call_edge(&mut self, from: NodeIndex) {
        let Some(edge_id) =
            self.graph.edges(from).find(|e| matches!(e.weight(), IcfgEdgeKind::UnresolvedCall)).map(|e| e.id())
        else {
            return;
        };
        let (a, b) = self.graph.edge_endpoints(edge_id).unwrap();
        let from_id = self.graph[a].node_id.clone();
        let to_id = self.graph[b].node_id.clone();
        self.graph.remove_edge(edge_id);
        self.edge_set.remove(&(from_id, to_id, IcfgEdgeKind::UnresolvedCall));
    }

    pub fn record_call_site(&mut self, record: CallSiteRecord) {
        if let Some(existing) = self.call_sites.iter_mut().find(|r| r.site == record.site) {
            *existing = record;
        } else {
            self.call_sites.push(record);
        }
    }

    pub fn successors(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &IcfgEdgeKind)> {
        self.graph.edges(idx).map(|e| (e.target(), e.weight()))
    }

    /// `successors` by node id, owned, for solvers that walk the graph by
    /// string key rather than by `NodeIndex`.
    pub fn successor_ids(&self, node_id: &str) -> Vec<(String, IcfgEdgeKind)> {
        let Some(&idx) = self.index_of.get(node_id) else { return Vec::new() };
        self.graph.edges(idx).map(|e| (self.graph[e.target()].node_id.clone(), e.weight().clone())).collect()
    }

    pub fn node(&self, idx: NodeIndex) -> &IcfgNode {
        &self.graph[idx]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|n| n.node_id.as_str())
    }

    /// Union `other`'s nodes, edges, opaque-function set, and call-site
    /// ledger into `self`. Node-disjoint by `node_id` (already globally
    /// unique since annotations embed the owning module id); commutative
    /// and idempotent since `ensure_node`/`add_edge` dedupe.
    pub fn absorb(&mut self, other: &IcfgGraph) {
        for node in other.graph.node_weights() {
            self.ensure_node(&node.function, &node.node_id);
        }
        for (function, &idx) in &other.entries {
            let node_id = other.graph[idx].node_id.clone();
            let mapped = self.index_of[&node_id];
            self.set_entry(function, mapped);
        }
        self.opaque_functions.extend(other.opaque_functions.iter().cloned());
        for (from_id, to_id, kind) in other.graph.edge_references_with_weight() {
            let from = self.index_of[&from_id];
            let to = self.index_of[&to_id];
            self.add_edge(from, to, kind);
        }
        for record in &other.call_sites {
            if !self.call_sites.iter().any(|r| r.site == record.site) {
                self.call_sites.push(record.clone());
            }
        }
    }

    /// Render as Graphviz DOT.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph Icfg {\n");
        let mut ids: Vec<&str> = self.node_ids().collect();
        ids.sort_unstable();
        for id in &ids {
            out.push_str(&format!("  \"{id}\";\n"));
        }
        let mut edges: Vec<(String, String, String)> = self
            .graph
            .edge_indices()
            .map(|e| {
                let (a, b) = self.graph.edge_endpoints(e).unwrap();
                let label = match &self.graph[e] {
                    IcfgEdgeKind::Normal => "normal".to_string(),
                    IcfgEdgeKind::Call => "call".to_string(),
                    IcfgEdgeKind::Return { call_site } => format!("return({call_site})"),
                    IcfgEdgeKind::CallToReturn => "call_to_return".to_string(),
                    IcfgEdgeKind::UnresolvedCall => "unresolved_call".to_string(),
                };
                (self.graph[a].node_id.clone(), self.graph[b].node_id.clone(), label)
            })
            .collect();
        edges.sort();
        for (from, to, label) in edges {
            out.push_str(&format!("  \"{from}\" -> \"{to}\" [label=\"{label}\"];\n"));
        }
        out.push_str("}\n");
        out
    }
}

/// Small helper extension so `absorb` can walk `other`'s edges by node-id
/// pair instead of by `other`'s own (not reusable) `NodeIndex` values.
trait EdgeRefWithWeight {
    fn edge_references_with_weight(&self) -> Vec<(String, String, IcfgEdgeKind)>;
}

impl EdgeRefWithWeight for DiGraph<IcfgNode, IcfgEdgeKind> {
    fn edge_references_with_weight(&self) -> Vec<(String, String, IcfgEdgeKind)> {
        self.edge_indices()
            .map(|e| {
                let (a, b) = self.edge_endpoints(e).unwrap();
                (self[a].node_id.clone(), self[b].node_id.clone(), self[e].clone())
            })
            .collect()
    }
}
