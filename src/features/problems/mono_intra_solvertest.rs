//! The trivial intra-monotone problem: a reachability lattice (has this
//! node been reached at all?) with an identity transfer, used to exercise
//! the worklist solver itself.

use crate::features::solvers::mono_intra::{IntraMonotoneProblem, MonotoneLattice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reached(pub bool);

impl MonotoneLattice for Reached {
    fn bottom() -> Self {
        Reached(false)
    }
    fn join(&self, other: &Self) -> Self {
        Reached(self.0 || other.0)
    }
}

pub struct MonoIntraSolverTestProblem;

impl IntraMonotoneProblem<Reached> for MonoIntraSolverTestProblem {
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
    use crate::features::cfg::Cfg;
    use crate::features::solvers::mono_intra::IntraMonotoneSolver;
    use crate::ir::{BasicBlock, Function, Instruction, Linkage, Opcode, ValueId};

    #[test]
    fn reachability_propagates_to_every_node() {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction { id: ValueId(0), opcode: Opcode::Alloca, annotation: Some("n0".into()) });
        block.instructions.push(Instruction { id: ValueId(1), opcode: Opcode::Ret { value: None }, annotation: Some("n1".into()) });
        let function = Function { name: "f".into(), linkage: Linkage::Strong, params: vec![], blocks: vec![block] };
        let cfg = Cfg::build(&function);

        let result = IntraMonotoneSolver::new(Box::new(MonoIntraSolverTestProblem), &cfg).solve();
        let exit = cfg.index_of("n1").unwrap();
        assert_eq!(result.out_at(exit), Some(&Reached(true)));
    }
}
