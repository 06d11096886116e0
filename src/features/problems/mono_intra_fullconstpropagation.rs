//! Full (non-sparse) constant propagation over stack slots within one
//! function, using the classic intra-monotone worklist. The testable
//! property this exists for: a loop that repeatedly stores the same
//! literal into a slot converges to `Const(n)`, not `Top`.

use crate::features::ir_db::Irdb;
use crate::features::problems::support::{parse_const_store, ConstEnv, ConstValue, IrIndex};
use crate::features::solvers::mono_intra::IntraMonotoneProblem;
use crate::ir::Opcode;

pub struct FullConstPropagationProblem {
    index: IrIndex,
    function: String,
}

impl FullConstPropagationProblem {
    pub fn new(irdb: &Irdb, function: impl Into<String>) -> Self {
        Self { index: IrIndex::build(irdb), function: function.into() }
    }
}

impl IntraMonotoneProblem<ConstEnv> for FullConstPropagationProblem {
    fn entry_value(&self) -> ConstEnv {
        ConstEnv::bottom()
    }

    fn transfer(&self, node_id: &str, input: &ConstEnv) -> ConstEnv {
        let Some(instr) = self.index.instruction(node_id) else { return input.clone() };
        if self.index.function_name(node_id) != Some(self.function.as_str()) {
            return input.clone();
        }
        match &instr.opcode {
            Opcode::Other(text) => match parse_const_store(text) {
                Some((slot, n)) => input.clone().with(slot, ConstValue::Const(n)),
                None => input.clone(),
            },
            _ => input.clone(),
        }
    }
}
