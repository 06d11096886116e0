//! Class Hierarchy Reconstructor.
//!
//! A DAG of aggregate types (edges = subtyping) plus a type -> vtable ->
//! ordered target-function map. Modeled as a `petgraph` arena with stable
//! `NodeIndex` handles. Built once after pre-analysis;
//! read-only thereafter.

use crate::features::ir_db::Irdb;
use crate::ir::VTable;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// The class hierarchy.
pub struct ClassHierarchy {
    /// Edge `a -> b` means "a is a (candidate) subtype of b".
    graph: DiGraph<String, ()>,
    node_of: FxHashMap<String, NodeIndex>,
    /// Relations recorded when a type had more than one candidate parent
    /// (ambiguous base-subobject layout).
    contested: std::collections::HashSet<(String, String)>,
    vtables: FxHashMap<String, VTable>,
}

impl ClassHierarchy {
    /// Reconstruct the hierarchy from every aggregate type reachable from
    /// the IRDB's module type tables, in a canonical (sorted) order so the
    /// result is deterministic regardless of module insertion order
    ///.
    pub fn build(irdb: &Irdb) -> Self {
        let mut types: BTreeMap<String, crate::ir::AggregateType> = BTreeMap::new();
        for module in irdb.modules() {
            for ty in &module.types.types {
                types.entry(ty.name.clone()).or_insert_with(|| ty.clone());
            }
        }

        let mut graph = DiGraph::new();
        let mut node_of = FxHashMap::default();
        for name in types.keys() {
            let idx = graph.add_node(name.clone());
            node_of.insert(name.clone(), idx);
        }

        let mut contested = std::collections::HashSet::new();
        for ty in types.values() {
            let Some(&from) = node_of.get(&ty.name) else { continue };
            if ty.base_candidates.len() > 1 {
                for base in &ty.base_candidates {
                    contested.insert((ty.name.clone(), base.clone()));
                }
            }
            for base in &ty.base_candidates {
                if let Some(&to) = node_of.get(base) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut vtables = FxHashMap::default();
        for ty in types.values() {
            if let Some(vtable) = &ty.vtable {
                vtables.insert(ty.name.clone(), vtable.clone());
            }
        }

        Self { graph, node_of, contested, vtables }
    }

    pub fn type_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_subtype(&self, sub: &str, base: &str) -> bool {
        let (Some(&s), Some(&b)) = (self.node_of.get(sub), self.node_of.get(base)) else {
            return false;
        };
        s == b
            || petgraph::algo::has_path_connecting(&self.graph, s, b, None)
    }

    pub fn is_contested(&self, sub: &str, base: &str) -> bool {
        self.contested.contains(&(sub.to_string(), base.to_string()))
    }

    /// Base type names involved in at least one contested (ambiguous)
    /// subtyping relation. Used by the ICFG builder's `Rta` walker to drop
    /// virtual-dispatch candidates that cannot be soundly attributed to one
    /// instantiated type.
    pub fn contested_bases(&self) -> std::collections::HashSet<&str> {
        self.contested.iter().map(|(_, base)| base.as_str()).collect()
    }

    pub fn direct_bases(&self, ty: &str) -> Vec<&str> {
        let Some(&idx) = self.node_of.get(ty) else { return Vec::new() };
        self.graph.neighbors(idx).map(|n| self.graph[n].as_str()).collect()
    }

    pub fn vtable(&self, ty: &str) -> Option<&VTable> {
        self.vtables.get(ty)
    }

    /// Resolve a vtable slot to the (canonical) target function name.
    pub fn dispatch_target(&self, ty: &str, slot: usize) -> Option<&str> {
        self.vtables.get(ty).and_then(|v| v.entries.get(slot)).map(|s| s.as_str())
    }

    /// Every known aggregate type, in canonical (sorted) order.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.node_of.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Render the hierarchy as Graphviz DOT.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph ClassHierarchy {\n");
        for name in self.type_names() {
            out.push_str(&format!("  \"{name}\";\n"));
        }
        for name in self.type_names() {
            for base in self.direct_bases(name) {
                out.push_str(&format!("  \"{name}\" -> \"{base}\";\n"));
            }
        }
        out.push_str("}\n");
        out
    }
}
