//! Uninitialized-variable detection: tracks stack slots (`Alloca` results)
//! from the point they are allocated until the first store that initializes
//! them. A `Load` of a pointer still in the tracked set at that point is a
//! finding.

use crate::features::ir_db::Irdb;
use crate::features::problems::support::{IrIndex, ValueFact};
use crate::features::solvers::ifds::{DataflowFact, FlowFunction, IdentityFlow, IfdsProblem, IfdsResult};
use crate::ir::{Instruction, Opcode};
use std::collections::HashSet;

/// `{zero} -> {zero}`, `{tracked} -> {}`: crossing into or out of a callee
/// loses every non-zero fact. This analysis does not follow a stack slot's
/// address through a call.
struct ZeroOnlyFlow;

impl FlowFunction<ValueFact> for ZeroOnlyFlow {
    fn compute(&self, input: &ValueFact) -> HashSet<ValueFact> {
        if input.is_zero() {
            HashSet::from([ValueFact::Zero])
        } else {
            HashSet::new()
        }
    }
}

/// The flow across an `Alloca` instruction: besides passing every fact
/// through unchanged, the zero fact also generates `Tracked(alloca_id)`.
struct AllocaFlow {
    alloca_id: crate::ir::ValueId,
}

impl FlowFunction<ValueFact> for AllocaFlow {
    fn compute(&self, input: &ValueFact) -> HashSet<ValueFact> {
        if input.is_zero() {
            HashSet::from([ValueFact::Zero, ValueFact::Tracked(self.alloca_id)])
        } else {
            HashSet::from([*input])
        }
    }
}

/// The flow across a `Store { pointer, .. }` instruction: kills
/// `Tracked(pointer)` (the slot is now initialized), passes every other
/// fact through unchanged.
struct StoreFlow {
    pointer: crate::ir::ValueId,
}

impl FlowFunction<ValueFact> for StoreFlow {
    fn compute(&self, input: &ValueFact) -> HashSet<ValueFact> {
        match input {
            ValueFact::Tracked(v) if *v == self.pointer => HashSet::new(),
            other => HashSet::from([*other]),
        }
    }
}

pub struct IfdsUninitProblem<'a> {
    irdb: &'a Irdb,
    index: IrIndex,
    entry_points: Vec<String>,
}

impl<'a> IfdsUninitProblem<'a> {
    pub fn new(irdb: &'a Irdb, entry_points: Vec<String>) -> Self {
        Self { irdb, index: IrIndex::build(irdb), entry_points }
    }

    fn instruction_at(&self, node_id: &str) -> Option<&Instruction> {
        self.index.instruction(node_id)
    }

    /// Findings at the end of a solve: every `Load { pointer }` node where
    /// `Tracked(pointer)` was still reachable.
    pub fn findings(&self, result: &IfdsResult<ValueFact>) -> Vec<String> {
        let mut out = Vec::new();
        for node_id in result.reachable_nodes() {
            let Some(instr) = self.instruction_at(node_id) else { continue };
            if let Opcode::Load { pointer } = &instr.opcode {
                if result.facts_at(node_id).contains(&ValueFact::Tracked(*pointer)) {
                    out.push(node_id.to_string());
                }
            }
        }
        out.sort();
        out
    }
}

impl<'a> IfdsProblem<ValueFact> for IfdsUninitProblem<'a> {
    fn initial_seeds(&self) -> Vec<(String, ValueFact)> {
        self.entry_points
            .iter()
            .filter_map(|name| self.index.entry_node(self.irdb, name))
            .map(|node| (node, ValueFact::Zero))
            .collect()
    }

    fn normal_flow(&self, from: &str, _to: &str) -> Box<dyn FlowFunction<ValueFact>> {
        match self.instruction_at(from) {
            Some(Instruction { opcode: Opcode::Alloca, id, .. }) => {
                Box::new(AllocaFlow { alloca_id: *id })
            }
            Some(Instruction { opcode: Opcode::Store { pointer, .. }, .. }) => {
                Box::new(StoreFlow { pointer: *pointer })
            }
            _ => Box::new(IdentityFlow),
        }
    }

    fn call_flow(&self, _call_site: &str, _callee_entry: &str) -> Box<dyn FlowFunction<ValueFact>> {
        Box::new(ZeroOnlyFlow)
    }

    fn return_flow(
        &self,
        _callee_exit: &str,
        _return_site: &str,
        _call_site: &str,
    ) -> Box<dyn FlowFunction<ValueFact>> {
        Box::new(ZeroOnlyFlow)
    }

    fn call_to_return_flow(&self, _call_site: &str, _return_site: &str) -> Box<dyn FlowFunction<ValueFact>> {
        Box::new(IdentityFlow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::icfg::{IcfgBuilder, ResolveStrategy, WalkerStrategy};
    use crate::features::points_to::PointsToGraph;
    use crate::features::solvers::ifds::IfdsSolver;
    use crate::ir::{BasicBlock, Context, Function, Linkage, Module, ValueId};

    fn uninit_use_module() -> Module {
        let mut block = BasicBlock::new("entry");
        let mut push = |id: u32, opcode: Opcode| {
            block.instructions.push(Instruction { id: ValueId(id), opcode, annotation: Some(format!("n{id}")) })
        };
        push(0, Opcode::Alloca);
        push(1, Opcode::Load { pointer: ValueId(0) });
        push(2, Opcode::Ret { value: None });
        Module::new("m").with_function(Function {
            name: "main".into(),
            linkage: Linkage::Strong,
            params: vec![],
            blocks: vec![block],
        })
    }

    #[test]
    fn flags_load_of_never_stored_alloca() {
        let mut irdb = Irdb::new();
        irdb.add_module(uninit_use_module(), Context::new(1)).unwrap();
        irdb.insert_ptg("main", PointsToGraph::new()).unwrap();
        let ch = crate::features::class_hierarchy::ClassHierarchy::build(&irdb);
        let icfg = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Pointer, ResolveStrategy::Declared)
            .build(&["main".to_string()])
            .unwrap();

        let problem = IfdsUninitProblem::new(&irdb, vec!["main".to_string()]);
        let solver = IfdsSolver::new(Box::new(&problem), &icfg);
        let result = solver.solve(&|| false);
        assert_eq!(problem.findings(&result), vec!["n1".to_string()]);
    }

    #[test]
    fn store_before_load_clears_the_finding() {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction {
            id: ValueId(0),
            opcode: Opcode::Alloca,
            annotation: Some("n0".into()),
        });
        block.instructions.push(Instruction {
            id: ValueId(1),
            opcode: Opcode::Store { pointer: ValueId(0), value: ValueId(0) },
            annotation: Some("n1".into()),
        });
        block.instructions.push(Instruction {
            id: ValueId(2),
            opcode: Opcode::Load { pointer: ValueId(0) },
            annotation: Some("n2".into()),
        });
        block.instructions.push(Instruction {
            id: ValueId(3),
            opcode: Opcode::Ret { value: None },
            annotation: Some("n3".into()),
        });
        let module = Module::new("m").with_function(Function {
            name: "main".into(),
            linkage: Linkage::Strong,
            params: vec![],
            blocks: vec![block],
        });

        let mut irdb = Irdb::new();
        irdb.add_module(module, Context::new(1)).unwrap();
        irdb.insert_ptg("main", PointsToGraph::new()).unwrap();
        let ch = crate::features::class_hierarchy::ClassHierarchy::build(&irdb);
        let icfg = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Pointer, ResolveStrategy::Declared)
            .build(&["main".to_string()])
            .unwrap();

        let problem = IfdsUninitProblem::new(&irdb, vec!["main".to_string()]);
        let solver = IfdsSolver::new(Box::new(&problem), &icfg);
        let result = solver.solve(&|| false);
        assert!(problem.findings(&result).is_empty());
    }
}
