//! Intraprocedural CFG — a trivial per-function control-flow view used
//! only by the intra-monotone solver. Nodes are keyed by each
//! instruction's stable annotation; edges are fall-through
//! and branch edges within the function, never call/return edges.

use crate::ir::{Function, Opcode};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

pub struct Cfg {
    graph: DiGraph<String, ()>,
    index_of: FxHashMap<String, NodeIndex>,
    entry: Option<NodeIndex>,
    exits: Vec<NodeIndex>,
}

impl Cfg {
    pub fn build(function: &Function) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of = FxHashMap::default();

        for block in &function.blocks {
            for instruction in &block.instructions {
                let idx = graph.add_node(instruction.node_id());
                index_of.insert(instruction.node_id(), idx);
            }
        }

        let mut block_entry: FxHashMap<&str, NodeIndex> = FxHashMap::default();
        for block in &function.blocks {
            if let Some(first) = block.instructions.first() {
                block_entry.insert(block.label.as_str(), index_of[&first.node_id()]);
            }
        }

        let mut exits = Vec::new();
        for block in &function.blocks {
            for pair in block.instructions.windows(2) {
                let (from, to) = (&pair[0], &pair[1]);
                graph.add_edge(index_of[&from.node_id()], index_of[&to.node_id()], ());
            }
            if let Some(term) = block.terminator() {
                let from = index_of[&term.node_id()];
                match &term.opcode {
                    Opcode::Br { target } => {
                        if let Some(&to) = block_entry.get(target.as_str()) {
                            graph.add_edge(from, to, ());
                        }
                    }
                    Opcode::CondBr { then_block, else_block, .. } => {
                        if let Some(&to) = block_entry.get(then_block.as_str()) {
                            graph.add_edge(from, to, ());
                        }
                        if let Some(&to) = block_entry.get(else_block.as_str()) {
                            graph.add_edge(from, to, ());
                        }
                    }
                    Opcode::Ret { .. } => exits.push(from),
                    _ => {}
                }
            }
        }

        let entry = function
            .entry_block()
            .and_then(|b| b.instructions.first())
            .map(|i| index_of[&i.node_id()]);

        Self { graph, index_of, entry, exits }
    }

    pub fn entry(&self) -> Option<NodeIndex> {
        self.entry
    }

    pub fn exits(&self) -> &[NodeIndex] {
        &self.exits
    }

    pub fn node_id(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn index_of(&self, node_id: &str) -> Option<NodeIndex> {
        self.index_of.get(node_id).copied()
    }

    pub fn successors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn predecessors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, petgraph::Direction::Incoming)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlock, Instruction, Linkage, ValueId};

    #[test]
    fn straight_line_function_chains_edges() {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction::new(ValueId(0), Opcode::Alloca));
        block.instructions.push(Instruction::new(ValueId(1), Opcode::Ret { value: None }));
        let mut function = Function { name: "f".into(), linkage: Linkage::Strong, params: vec![], blocks: vec![block] };
        for i in function.instructions_mut() {
            i.annotation = Some(i.id.to_string());
        }

        let cfg = Cfg::build(&function);
        assert_eq!(cfg.node_count(), 2);
        assert_eq!(cfg.exits().len(), 1);
        let entry = cfg.entry().unwrap();
        assert_eq!(cfg.successors(entry).count(), 1);
    }
}
