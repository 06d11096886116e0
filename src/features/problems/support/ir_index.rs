//! Shared lookup tables the concrete analysis problems build once
//! from an [`Irdb`] and query by ICFG node id, since `IfdsProblem`/
//! `IdeProblem`/the monotone problems are handed only node ids by the
//! solvers, never `Instruction`s directly.

use crate::features::ir_db::Irdb;
use crate::ir::{Function, Instruction, ValueId};
use rustc_hash::FxHashMap;

pub struct IrIndex {
    node_function: FxHashMap<String, String>,
    node_instruction: FxHashMap<String, Instruction>,
    value_node: FxHashMap<(String, ValueId), String>,
}

impl IrIndex {
    pub fn build(irdb: &Irdb) -> Self {
        let mut node_function = FxHashMap::default();
        let mut node_instruction = FxHashMap::default();
        let mut value_node = FxHashMap::default();

        for module in irdb.modules() {
            for function in &module.functions {
                for instruction in function.instructions() {
                    let node_id = instruction.node_id();
                    node_function.insert(node_id.clone(), function.name.clone());
                    node_instruction.insert(node_id.clone(), instruction.clone());
                    value_node.insert((function.name.clone(), instruction.id), node_id);
                }
            }
        }

        Self { node_function, node_instruction, value_node }
    }

    pub fn instruction(&self, node_id: &str) -> Option<&Instruction> {
        self.node_instruction.get(node_id)
    }

    pub fn function_name(&self, node_id: &str) -> Option<&str> {
        self.node_function.get(node_id).map(|s| s.as_str())
    }

    /// The node id of the instruction that defines `value` within
    /// `function`, if any (most useful for resolving a pointer operand back
    /// to the `Alloca` or `Call` that produced it).
    pub fn node_for_value(&self, function: &str, value: ValueId) -> Option<&str> {
        self.value_node.get(&(function.to_string(), value)).map(|s| s.as_str())
    }

    pub fn entry_node(&self, irdb: &Irdb, function: &str) -> Option<String> {
        irdb.function(function).and_then(|f| Self::entry_node_of(f))
    }

    pub fn entry_node_of(function: &Function) -> Option<String> {
        function.entry_block().and_then(|b| b.instructions.first()).map(|i| i.node_id())
    }

    pub fn exit_nodes_of(function: &Function) -> Vec<String> {
        function
            .instructions()
            .filter(|i| matches!(i.opcode, crate::ir::Opcode::Ret { .. }))
            .map(|i| i.node_id())
            .collect()
    }
}
