//! The trivial IDE problem: identity fact- and edge-flow everywhere, value
//! lattice with height 2. Exercises the solver's value-propagation
//! machinery independent of any real analysis.

use crate::features::ir_db::Irdb;
use crate::features::problems::support::{IrIndex, ValueFact};
use crate::features::solvers::ide::{EdgeFunction, IdeProblem, IdeValue, IdentityEdgeFunction};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitValue {
    Bottom,
    Present,
    Top,
}

impl IdeValue for UnitValue {
    fn top() -> Self {
        UnitValue::Top
    }
    fn bottom() -> Self {
        UnitValue::Bottom
    }
    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (UnitValue::Bottom, v) | (v, UnitValue::Bottom) => v.clone(),
            _ => UnitValue::Present,
        }
    }
    fn is_top(&self) -> bool {
        matches!(self, UnitValue::Top)
    }
    fn is_bottom(&self) -> bool {
        matches!(self, UnitValue::Bottom)
    }
}

pub struct IdeSolverTestProblem<'a> {
    irdb: &'a Irdb,
    index: IrIndex,
    entry_points: Vec<String>,
}

impl<'a> IdeSolverTestProblem<'a> {
    pub fn new(irdb: &'a Irdb, entry_points: Vec<String>) -> Self {
        Self { irdb, index: IrIndex::build(irdb), entry_points }
    }
}

impl<'a> IdeProblem<ValueFact, UnitValue> for IdeSolverTestProblem<'a> {
    fn initial_seeds(&self) -> Vec<(String, ValueFact, UnitValue)> {
        self.entry_points
            .iter()
            .filter_map(|name| self.index.entry_node(self.irdb, name))
            .map(|node| (node, ValueFact::Zero, UnitValue::Present))
            .collect()
    }

    fn normal_edge_function(
        &self,
        _from: &str,
        _to: &str,
        _source_fact: &ValueFact,
        _target_fact: &ValueFact,
    ) -> Box<dyn EdgeFunction<UnitValue>> {
        Box::new(IdentityEdgeFunction)
    }

    fn call_edge_function(
        &self,
        _call_site: &str,
        _callee_entry: &str,
        _source_fact: &ValueFact,
        _target_fact: &ValueFact,
    ) -> Box<dyn EdgeFunction<UnitValue>> {
        Box::new(IdentityEdgeFunction)
    }

    fn return_edge_function(
        &self,
        _callee_exit: &str,
        _return_site: &str,
        _call_site: &str,
        _source_fact: &ValueFact,
        _target_fact: &ValueFact,
    ) -> Box<dyn EdgeFunction<UnitValue>> {
        Box::new(IdentityEdgeFunction)
    }

    fn call_to_return_edge_function(
        &self,
        _call_site: &str,
        _return_site: &str,
        _source_fact: &ValueFact,
        _target_fact: &ValueFact,
    ) -> Box<dyn EdgeFunction<UnitValue>> {
        Box::new(IdentityEdgeFunction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::icfg::{IcfgBuilder, ResolveStrategy, WalkerStrategy};
    use crate::features::points_to::PointsToGraph;
    use crate::features::solvers::ide::IdeSolver;
    use crate::ir::{BasicBlock, Context, Function, Instruction, Linkage, Module, Opcode, ValueId};

    fn leaf_module() -> Module {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction { id: ValueId(0), opcode: Opcode::Ret { value: None }, annotation: Some("n0".into()) });
        Module::new("m").with_function(Function {
            name: "main".into(),
            linkage: Linkage::Strong,
            params: vec![],
            blocks: vec![block],
        })
    }

    #[test]
    fn seed_value_reaches_entry() {
        let mut irdb = Irdb::new();
        irdb.add_module(leaf_module(), Context::new(1)).unwrap();
        irdb.insert_ptg("main", PointsToGraph::new()).unwrap();
        let ch = crate::features::class_hierarchy::ClassHierarchy::build(&irdb);
        let icfg = IcfgBuilder::new(&irdb, &ch, WalkerStrategy::Pointer, ResolveStrategy::Declared)
            .build(&["main".to_string()])
            .unwrap();

        let problem = IdeSolverTestProblem::new(&irdb, vec!["main".to_string()]);
        let result = IdeSolver::new(Box::new(&problem), &icfg).solve(&|| false);
        assert_eq!(result.value_at("n0", &ValueFact::Zero), Some(&UnitValue::Present));
    }
}
