//! The trivial inter-monotone problem: reuses the
//! [`mono_intra_solvertest`](crate::features::problems::mono_intra_solvertest)
//! reachability lattice across the call-string-sensitive solver, to exercise
//! the solver's context push/pop machinery independent of a real analysis.

use crate::features::ir_db::Irdb;
use crate::features::problems::mono_intra_solvertest::Reached;
use crate::features::problems::support::IrIndex;
use crate::features::solvers::mono_inter::InterMonotoneProblem;

pub struct MonoInterSolverTestProblem<'a> {
    irdb: &'a Irdb,
    index: IrIndex,
    entry_points: Vec<String>,
}

impl<'a> MonoInterSolverTestProblem<'a> {
    pub fn new(irdb: &'a Irdb, entry_points: Vec<String>) -> Self {
        Self { irdb, index: IrIndex::build(irdb), entry_points }
    }
}

impl<'a> InterMonotoneProblem<Reached> for MonoInterSolverTestProblem<'a> {
    fn entry_points(&self) -> Vec<String> {
        self.entry_points
            .iter()
            .filter_map(|name| self.index.entry_node(self.irdb, name))
            .collect()
    }

    fn entry_value(&self) -> Reached {
        Reached(true)
    }

    fn transfer(&self, _node_id: &str, input: &Reached) -> Reached {
        input.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::icfg::{IcfgBuilder, ResolveStrategy, WalkerStrategy};
    use crate::features::points_to::PointsToGraph;
    use crate::features::solvers::mono_inter::InterMonotoneSolver;
    use crate::ir::{BasicBlock, CallTarget, Context, Function, Instruction, Linkage, Module, Opcode, ValueId};

    fn module() -> Module {
        let mut caller = BasicBlock::new("entry");
        caller.instructions.push(Instruction {
            id: ValueId(0),
            opcode: Opcode::Call { target: CallTarget::Direct("callee".into()), args: vec![] },
            annotation: Some("n0".into()),
        });
        caller.instructions.push(Instruction { id: ValueId(1), opcode: Opcode::Ret { value: None }, annotation: Some("n1".into()) });

        let mut callee = BasicBlock::new("entry");
        callee.instructions.push(Instruction { id: ValueId(2), opcode: Opcode::Ret { value: None }, annotation: Some("n2".into()) });

        Module::new("m")
            .with_function(Function { name: "main".into(), linkage: Linkage::Strong, params: vec![], blocks: vec![caller] })
            .with_function(Function { name: "callee".into(), linkage: Linkage::Strong, params: vec![], blocks: vec![callee] })
    }

    #[test]
    fn reachability_crosses_the_call_and_returns() {
        let mut irdb = Irdb::new();
        irdb.add_module(module(), Context::new(1)).unwrap();
        irdb.insert_ptg("main", PointsToGraph::new()).unwrap();
        irdb.insert_ptg("callee", PointsToGraph::new()).unwrap();
        let ch = crate::features::class_hierarchy::ClassHierarchy::build(&irdb);
        let icfg = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Pointer, ResolveStrategy::Declared)
            .build(&["main".to_string()])
            .unwrap();

        let problem = MonoInterSolverTestProblem::new(&irdb, vec!["main".to_string()]);
        let result = InterMonotoneSolver::new(Box::new(&problem), &icfg, 2).solve();
        assert_eq!(result.joined_fact_at("n2"), Some(Reached(true)));
        assert_eq!(result.joined_fact_at("n1"), Some(Reached(true)));
    }
}
