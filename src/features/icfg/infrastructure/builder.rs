//! ICFG construction: a reachability walk from a set of entry
//! points, resolving each call site against a `(WalkerStrategy,
//! ResolveStrategy)` pair.

use crate::errors::{FrameworkError, Result};
use crate::features::class_hierarchy::ClassHierarchy;
use crate::features::icfg::domain::{CallSiteRecord, IcfgEdgeKind, IcfgGraph, ResolveStrategy, WalkerStrategy};
use crate::features::ir_db::Irdb;
use crate::ir::{function_value_id, CallTarget, Function, Opcode, ValueId};
use std::collections::{BTreeSet, HashSet, VecDeque};

pub struct IcfgBuilder<'a> {
    irdb: &'a Irdb,
    ch: &'a ClassHierarchy,
    walker: WalkerStrategy,
    resolve: ResolveStrategy,
    module_scope: Option<HashSet<String>>,
}

impl<'a> IcfgBuilder<'a> {
    pub fn new(
        irdb: &'a Irdb,
        ch: &'a ClassHierarchy,
        walker: WalkerStrategy,
        resolve: ResolveStrategy,
    ) -> Self {
        Self { irdb, ch, walker, resolve, module_scope: None }
    }

    /// Restrict eager direct-call inlining to callees defined in `scope`
    /// (a single module's own function names). A direct call to a name
    /// outside the scope is recorded unresolved instead of being linked in
    /// immediately, so `merge_icfgs` is what actually connects it once the
    /// defining module's graph is folded in. With no scope set (the WPA
    /// case, building over the whole linked program) every direct callee
    /// is eagerly inlined as before.
    pub fn with_module_scope(mut self, scope: HashSet<String>) -> Self {
        self.module_scope = Some(scope);
        self
    }

    /// Build the graph reachable from `entry_points`. Every entry point
    /// must name a defined (non-declaration) function or this fails with
    /// `EntryPointMissing` before any graph construction happens.
    pub fn build(&self, entry_points: &[String]) -> Result<IcfgGraph> {
        for name in entry_points {
            match self.irdb.function(name) {
                Some(f) if !f.is_declaration() => {}
                _ => return Err(FrameworkError::EntryPointMissing(name.clone())),
            }
        }

        let mut graph = IcfgGraph::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut worklist: VecDeque<String> = entry_points.iter().cloned().collect();

        while let Some(name) = worklist.pop_front() {
            if visited.contains(&name) {
                continue;
            }
            visited.insert(name.clone());
            match self.irdb.function(&name) {
                Some(function) if !function.is_declaration() => {
                    self.add_function_body(&mut graph, function, &mut worklist);
                }
                _ => graph.mark_opaque(&name),
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built ICFG"
        );
        Ok(graph)
    }

    fn add_function_body(&self, graph: &mut IcfgGraph, function: &Function, worklist: &mut VecDeque<String>) {
        let fname = &function.name;
        for block in &function.blocks {
            for instr in &block.instructions {
                graph.ensure_node(fname, &instr.node_id());
            }
        }

        let mut block_entry: rustc_hash::FxHashMap<&str, String> = rustc_hash::FxHashMap::default();
        for block in &function.blocks {
            if let Some(first) = block.instructions.first() {
                block_entry.insert(block.label.as_str(), first.node_id());
            }
        }

        if let Some(entry_block) = function.entry_block() {
            if let Some(first) = entry_block.instructions.first() {
                let idx = graph.ensure_node(fname, &first.node_id());
                graph.set_entry(fname, idx);
            }
        }

        let ptg = self.irdb.points_to_graph(fname);

        for block in &function.blocks {
            for (i, instr) in block.instructions.iter().enumerate() {
                let from = graph.ensure_node(fname, &instr.node_id());

                if let Some(next) = block.instructions.get(i + 1) {
                    let to = graph.ensure_node(fname, &next.node_id());
                    graph.add_edge(from, to, IcfgEdgeKind::Normal);
                }

                match &instr.opcode {
                    Opcode::Br { target } => {
                        if let Some(to_id) = block_entry.get(target.as_str()) {
                            let to = graph.ensure_node(fname, to_id);
                            graph.add_edge(from, to, IcfgEdgeKind::Normal);
                        }
                    }
                    Opcode::CondBr { then_block, else_block, .. } => {
                        for label in [then_block.as_str(), else_block.as_str()] {
                            if let Some(to_id) = block_entry.get(label) {
                                let to = graph.ensure_node(fname, to_id);
                                graph.add_edge(from, to, IcfgEdgeKind::Normal);
                            }
                        }
                    }
                    Opcode::Call { target, .. } => {
                        let return_site = block.instructions.get(i + 1).map(|n| n.node_id());
                        self.handle_call(graph, fname, instr.node_id(), target, return_site, ptg, worklist);
                    }
                    _ => {}
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_call(
        &self,
        graph: &mut IcfgGraph,
        fname: &str,
        site: String,
        target: &CallTarget,
        return_site: Option<String>,
        ptg: Option<&crate::features::points_to::PointsToGraph>,
        worklist: &mut VecDeque<String>,
    ) {
        let site_idx = graph.ensure_node(fname, &site);

        let (resolved, unresolved) = match target {
            CallTarget::Direct(name) => {
                let out_of_scope =
                    self.module_scope.as_ref().is_some_and(|scope| !scope.contains(name.as_str()));
                (vec![name.clone()], out_of_scope)
            }
            CallTarget::Indirect(pointer) => {
                let base = self.candidate_universe();
                let narrowed = self.narrow(base, *pointer, ptg);
                let unresolved = narrowed.is_empty();
                (narrowed, unresolved)
            }
        };

        graph.record_call_site(CallSiteRecord {
            site: site.clone(),
            caller: fname.to_string(),
            target: target.clone(),
            resolved: resolved.clone(),
            unresolved,
            return_site: return_site.clone(),
        });

        if unresolved {
            let sink = graph.ensure_node("<unresolved>", &format!("unresolved::{site}"));
            graph.add_edge(site_idx, sink, IcfgEdgeKind::UnresolvedCall);
            return;
        }

        let Some(return_id) = return_site else { return };
        let return_idx = graph.ensure_node(fname, &return_id);
        graph.add_edge(site_idx, return_idx, IcfgEdgeKind::CallToReturn);

        for callee_name in &resolved {
            match self.irdb.function(callee_name) {
                Some(callee) if !callee.is_declaration() => {
                    worklist.push_back(callee_name.clone());
                    if let Some(entry_id) =
                        callee.entry_block().and_then(|b| b.instructions.first()).map(|i| i.node_id())
                    {
                        let entry_idx = graph.ensure_node(callee_name, &entry_id);
                        graph.set_entry(callee_name, entry_idx);
                        graph.add_edge(site_idx, entry_idx, IcfgEdgeKind::Call);
                        for exit_id in exit_node_ids(callee) {
                            let exit_idx = graph.ensure_node(callee_name, &exit_id);
                            graph.add_edge(exit_idx, return_idx, IcfgEdgeKind::Return { call_site: site.clone() });
                        }
                    }
                }
                _ => graph.mark_opaque(callee_name),
            }
        }
    }

    fn candidate_universe(&self) -> Vec<String> {
        match self.walker {
            WalkerStrategy::Pointer => all_known_function_names(self.irdb),
            WalkerStrategy::Cha => vtable_candidates(self.ch, false),
            WalkerStrategy::Rta => vtable_candidates(self.ch, true),
        }
    }

    fn narrow(
        &self,
        base: Vec<String>,
        pointer: ValueId,
        ptg: Option<&crate::features::points_to::PointsToGraph>,
    ) -> Vec<String> {
        match self.resolve {
            ResolveStrategy::Declared => base,
            ResolveStrategy::PointsTo => filter_by_ptg(base, pointer, ptg),
        }
    }
}

fn filter_by_ptg(
    base: Vec<String>,
    pointer: ValueId,
    ptg: Option<&crate::features::points_to::PointsToGraph>,
) -> Vec<String> {
    match ptg {
        Some(graph) => {
            base.into_iter().filter(|name| graph.may_alias(pointer, function_value_id(name))).collect()
        }
        None => Vec::new(),
    }
}

fn vtable_candidates(ch: &ClassHierarchy, rta: bool) -> Vec<String> {
    let contested_bases = ch.contested_bases();
    let mut out = BTreeSet::new();
    for ty in ch.type_names() {
        if rta && contested_bases.contains(ty) {
            continue;
        }
        if let Some(vtable) = ch.vtable(ty) {
            out.extend(vtable.entries.iter().cloned());
        }
    }
    out.into_iter().collect()
}

fn all_known_function_names(irdb: &Irdb) -> Vec<String> {
    let names: BTreeSet<String> =
        irdb.modules().flat_map(|m| m.functions.iter().map(|f| f.name.clone())).collect();
    names.into_iter().collect()
}

fn exit_node_ids(function: &Function) -> Vec<String> {
    function
        .instructions()
        .filter(|i| matches!(i.opcode, Opcode::Ret { .. }))
        .map(|i| i.node_id())
        .collect()
}

/// Absorb `b` into `a`, then re-resolve every call site
/// that was left `unresolved` (or whose candidates may have been limited to
/// the half of the program it was originally built from), against the
/// union's now-larger known-function universe. A site that resolves here
/// has its stale `UnresolvedCall` edge dropped so the merged graph doesn't
/// keep reporting it as unresolved once the real call/return edges are in
/// place. Commutative in the resulting graph and idempotent: running it
/// twice with the same inputs adds nothing the first pass didn't already
/// add.
pub fn merge_icfgs(
    irdb: &Irdb,
    ch: &ClassHierarchy,
    walker: WalkerStrategy,
    resolve: ResolveStrategy,
    mut a: IcfgGraph,
    b: IcfgGraph,
) -> IcfgGraph {
    a.absorb(&b);
    let builder = IcfgBuilder { irdb, ch, walker, resolve, module_scope: None };

    let stale: Vec<CallSiteRecord> = a.call_sites().iter().filter(|r| r.unresolved).cloned().collect();
    for record in stale {
        let Some(return_id) = &record.return_site else { continue };

        let narrowed = match &record.target {
            CallTarget::Direct(name) => vec![name.clone()],
            CallTarget::Indirect(pointer) => {
                let ptg = irdb.points_to_graph(&record.caller);
                let base = builder.candidate_universe();
                builder.narrow(base, *pointer, ptg)
            }
        };
        if narrowed.is_empty() {
            continue;
        }

        let site_idx = a.ensure_node(&record.caller, &record.site);
        let return_idx = a.ensure_node(&record.caller, return_id);
        a.remove_unresolved_call_edge(site_idx);
        a.add_edge(site_idx, return_idx, IcfgEdgeKind::CallToReturn);

        for callee_name in &narrowed {
            match irdb.function(callee_name) {
                Some(callee) if !callee.is_declaration() => {
                    if let Some(entry_id) =
                        callee.entry_block().and_then(|b| b.instructions.first()).map(|i| i.node_id())
                    {
                        let entry_idx = a.ensure_node(callee_name, &entry_id);
                        a.set_entry(callee_name, entry_idx);
                        a.add_edge(site_idx, entry_idx, IcfgEdgeKind::Call);
                        for exit_id in exit_node_ids(callee) {
                            let exit_idx = a.ensure_node(callee_name, &exit_id);
                            a.add_edge(exit_idx, return_idx, IcfgEdgeKind::Return { call_site: record.site.clone() });
                        }
                    }
                }
                _ => a.mark_opaque(callee_name),
            }
        }

        a.record_call_site(CallSiteRecord {
            site: record.site.clone(),
            caller: record.caller.clone(),
            target: record.target.clone(),
            resolved: narrowed,
            unresolved: false,
            return_site: record.return_site.clone(),
        });
    }

    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlock, Context, Instruction, Linkage, Module};

    fn ret_only(name: &str) -> Function {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction::new(ValueId(0), Opcode::Ret { value: None }));
        Function { name: name.to_string(), linkage: Linkage::Strong, params: vec![], blocks: vec![block] }
    }

    fn caller_calling(callee: &str) -> Function {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction::new(
            ValueId(0),
            Opcode::Call { target: CallTarget::Direct(callee.to_string()), args: vec![] },
        ));
        block.instructions.push(Instruction::new(ValueId(1), Opcode::Ret { value: None }));
        Function { name: "main".to_string(), linkage: Linkage::Strong, params: vec![], blocks: vec![block] }
    }

    fn built_irdb() -> Irdb {
        let mut irdb = Irdb::new();
        let module = Module::new("m").with_function(caller_calling("callee")).with_function(ret_only("callee"));
        irdb.add_module(module, Context::new(1)).unwrap();
        crate::features::preanalysis::run(&mut irdb, false);
        irdb
    }

    fn two_module_irdb() -> Irdb {
        let mut irdb = Irdb::new();
        irdb.add_module(Module::new("a").with_function(caller_calling("callee")), Context::new(1)).unwrap();
        irdb.add_module(Module::new("b").with_function(ret_only("callee")), Context::new(2)).unwrap();
        crate::features::preanalysis::run(&mut irdb, false);
        irdb
    }

    #[test]
    fn direct_call_produces_call_return_and_call_to_return_edges() {
        let irdb = built_irdb();
        let ch = ClassHierarchy::build(&irdb);
        let builder = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Cha, ResolveStrategy::Declared);
        let graph = builder.build(&["main".to_string()]).unwrap();

        assert!(graph.has_function("main"));
        assert!(graph.has_function("callee"));
        assert_eq!(graph.call_sites().len(), 1);
        assert!(!graph.call_sites()[0].unresolved);
    }

    #[test]
    fn module_scoped_build_defers_cross_module_direct_calls_to_merge() {
        let irdb = two_module_irdb();
        let ch = ClassHierarchy::build(&irdb);

        let scope_a: HashSet<String> = ["main".to_string()].into_iter().collect();
        let icfg_a = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Cha, ResolveStrategy::Declared)
            .with_module_scope(scope_a)
            .build(&["main".to_string()])
            .unwrap();

        assert!(icfg_a.has_function("main"));
        assert!(!icfg_a.has_function("callee"));
        assert_eq!(icfg_a.call_sites().len(), 1);
        assert!(icfg_a.call_sites()[0].unresolved);

        let scope_b: HashSet<String> = ["callee".to_string()].into_iter().collect();
        let icfg_b = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Cha, ResolveStrategy::Declared)
            .with_module_scope(scope_b)
            .build(&["callee".to_string()])
            .unwrap();

        let merged_ab =
            merge_icfgs(&irdb, &ch, WalkerStrategy::Cha, ResolveStrategy::Declared, icfg_a.clone(), icfg_b.clone());
        assert!(merged_ab.has_function("main"));
        assert!(merged_ab.has_function("callee"));
        assert!(!merged_ab.call_sites().iter().find(|r| r.caller == "main").unwrap().unresolved);

        // `merge(A, B)` and `merge(B, A)` must agree on node and edge counts
        // and on which call sites end up resolved, independent of argument
        // order.
        let merged_ba =
            merge_icfgs(&irdb, &ch, WalkerStrategy::Cha, ResolveStrategy::Declared, icfg_b, icfg_a);
        assert_eq!(merged_ab.node_count(), merged_ba.node_count());
        assert_eq!(merged_ab.edge_count(), merged_ba.edge_count());
        assert_eq!(
            merged_ab.call_sites().iter().filter(|r| r.unresolved).count(),
            merged_ba.call_sites().iter().filter(|r| r.unresolved).count()
        );
    }

    #[test]
    fn missing_entry_point_is_rejected() {
        let irdb = built_irdb();
        let ch = ClassHierarchy::build(&irdb);
        let builder = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Cha, ResolveStrategy::Declared);
        let err = builder.build(&["nonexistent".to_string()]).unwrap_err();
        assert_eq!(err, FrameworkError::EntryPointMissing("nonexistent".into()));
    }

    #[test]
    fn indirect_call_with_no_candidates_is_unresolved() {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction::new(
            ValueId(0),
            Opcode::Call { target: CallTarget::Indirect(ValueId(7)), args: vec![] },
        ));
        block.instructions.push(Instruction::new(ValueId(1), Opcode::Ret { value: None }));
        let function =
            Function { name: "main".to_string(), linkage: Linkage::Strong, params: vec![], blocks: vec![block] };
        let mut irdb = Irdb::new();
        irdb.add_module(Module::new("m").with_function(function), Context::new(1)).unwrap();
        crate::features::preanalysis::run(&mut irdb, false);

        let ch = ClassHierarchy::build(&irdb);
        let builder = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Pointer, ResolveStrategy::PointsTo);
        let graph = builder.build(&["main".to_string()]).unwrap();
        assert!(graph.call_sites()[0].unresolved);
    }
}
