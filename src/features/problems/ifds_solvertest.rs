//! The trivial IFDS problem: identity flow everywhere, seeded with only the
//! zero fact. Used to test the solver machinery itself rather than any
//! particular analysis.

use crate::features::ir_db::Irdb;
use crate::features::problems::support::{IrIndex, ValueFact};
use crate::features::solvers::ifds::{FlowFunction, IdentityFlow, IfdsProblem};

pub struct IfdsSolverTestProblem<'a> {
    irdb: &'a Irdb,
    index: IrIndex,
    entry_points: Vec<String>,
}

impl<'a> IfdsSolverTestProblem<'a> {
    pub fn new(irdb: &'a Irdb, entry_points: Vec<String>) -> Self {
        Self { irdb, index: IrIndex::build(irdb), entry_points }
    }
}

impl<'a> IfdsProblem<ValueFact> for IfdsSolverTestProblem<'a> {
    fn initial_seeds(&self) -> Vec<(String, ValueFact)> {
        self.entry_points
            .iter()
            .filter_map(|name| self.index.entry_node(self.irdb, name))
            .map(|node| (node, ValueFact::Zero))
            .collect()
    }

    fn normal_flow(&self, _from: &str, _to: &str) -> Box<dyn FlowFunction<ValueFact>> {
        Box::new(IdentityFlow)
    }

    fn call_flow(&self, _call_site: &str, _callee_entry: &str) -> Box<dyn FlowFunction<ValueFact>> {
        Box::new(IdentityFlow)
    }

    fn return_flow(&self, _callee_exit: &str, _return_site: &str, _call_site: &str) -> Box<dyn FlowFunction<ValueFact>> {
        Box::new(IdentityFlow)
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
    use crate::ir::{BasicBlock, Context, Function, Instruction, Linkage, Module, Opcode, ValueId};

    fn leaf_module() -> Module {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction::new(ValueId(0), Opcode::Ret { value: None }));
        block.instructions[0].annotation = Some("n0".into());
        Module::new("m").with_function(Function {
            name: "main".into(),
            linkage: Linkage::Strong,
            params: vec![],
            blocks: vec![block],
        })
    }

    #[test]
    fn is_deterministic_across_repeated_solves() {
        let mut irdb = Irdb::new();
        irdb.add_module(leaf_module(), Context::new(1)).unwrap();
        irdb.insert_ptg("main", PointsToGraph::new()).unwrap();
        let ch = crate::features::class_hierarchy::ClassHierarchy::build(&irdb);
        let icfg = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Pointer, ResolveStrategy::Declared)
            .build(&["main".to_string()])
            .unwrap();

        let problem = IfdsSolverTestProblem::new(&irdb, vec!["main".to_string()]);
        let first = IfdsSolver::new(Box::new(&problem), &icfg).solve(&|| false);
        let second = IfdsSolver::new(Box::new(&problem), &icfg).solve(&|| false);
        assert_eq!(first.reachable_nodes(), second.reachable_nodes());
    }

    /// IFDS soundness on the trivial (identity) problem: for every
    /// reachable node the seeded zero fact itself, not just the node's
    /// membership in the reachable set, is reported at that node.
    #[test]
    fn the_zero_fact_is_reported_at_every_reachable_node() {
        let mut irdb = Irdb::new();
        irdb.add_module(leaf_module(), Context::new(1)).unwrap();
        irdb.insert_ptg("main", PointsToGraph::new()).unwrap();
        let ch = crate::features::class_hierarchy::ClassHierarchy::build(&irdb);
        let icfg = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Pointer, ResolveStrategy::Declared)
            .build(&["main".to_string()])
            .unwrap();

        let problem = IfdsSolverTestProblem::new(&irdb, vec!["main".to_string()]);
        let result = IfdsSolver::new(Box::new(&problem), &icfg).solve(&|| false);

        let reachable = result.reachable_nodes();
        assert!(!reachable.is_empty());
        for node_id in reachable {
            assert!(
                result.facts_at(node_id).contains(&ValueFact::Zero),
                "expected the seeded zero fact at reachable node {node_id}"
            );
        }
    }
}
