//! Worklist-based intra-monotone solver: meet over predecessor `out`
//! facts, transfer, and re-enqueue successors on change, exactly the shape
//! of the taint-analysis `WorklistTaintSolver` generalized to an arbitrary
//! problem-supplied lattice.

use crate::features::cfg::Cfg;
use crate::features::solvers::mono_intra::domain::{IntraMonotoneProblem, MonotoneLattice};
use petgraph::graph::NodeIndex;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct MonotoneStatistics {
    pub num_iterations: usize,
    pub num_edges_visited: usize,
}

pub struct IntraMonotoneResult<L: MonotoneLattice> {
    in_facts: FxHashMap<NodeIndex, L>,
    out_facts: FxHashMap<NodeIndex, L>,
    pub stats: MonotoneStatistics,
}

impl<L: MonotoneLattice> IntraMonotoneResult<L> {
    pub fn in_at(&self, node: NodeIndex) -> Option<&L> {
        self.in_facts.get(&node)
    }

    pub fn out_at(&self, node: NodeIndex) -> Option<&L> {
        self.out_facts.get(&node)
    }
}

pub struct IntraMonotoneSolver<'a, L: MonotoneLattice> {
    problem: Box<dyn IntraMonotoneProblem<L> + 'a>,
    cfg: &'a Cfg,
}

impl<'a, L: MonotoneLattice> IntraMonotoneSolver<'a, L> {
    pub fn new(problem: Box<dyn IntraMonotoneProblem<L> + 'a>, cfg: &'a Cfg) -> Self {
        Self { problem, cfg }
    }

    pub fn solve(self) -> IntraMonotoneResult<L> {
        let mut in_facts: FxHashMap<NodeIndex, L> = FxHashMap::default();
        let mut out_facts: FxHashMap<NodeIndex, L> = FxHashMap::default();
        let mut worklist: VecDeque<NodeIndex> = VecDeque::new();
        let mut stats = MonotoneStatistics::default();

        let mut queued: std::collections::HashSet<NodeIndex> = std::collections::HashSet::new();
        if let Some(entry) = self.cfg.entry() {
            worklist.push_back(entry);
            queued.insert(entry);
        }
        for id in self.cfg.node_ids().collect::<Vec<_>>() {
            let idx = self.cfg.index_of(id).unwrap();
            if queued.insert(idx) {
                worklist.push_back(idx);
            }
        }

        while let Some(node) = worklist.pop_front() {
            stats.num_iterations += 1;
            queued.remove(&node);

            let new_in = if Some(node) == self.cfg.entry() {
                self.problem.entry_value()
            } else {
                let mut preds = self.cfg.predecessors(node).peekable();
                if preds.peek().is_none() {
                    L::bottom()
                } else {
                    let mut acc: Option<L> = None;
                    for pred in preds {
                        stats.num_edges_visited += 1;
                        let pred_out = out_facts.get(&pred).cloned().unwrap_or_else(L::bottom);
                        acc = Some(match acc {
                            Some(existing) => existing.join(&pred_out),
                            None => pred_out,
                        });
                    }
                    acc.unwrap_or_else(L::bottom)
                }
            };

            let node_id = self.cfg.node_id(node).to_string();
            let new_out = self.problem.transfer(&node_id, &new_in);

            in_facts.insert(node, new_in);

            let changed = match out_facts.get(&node) {
                Some(existing) => existing != &new_out,
                None => true,
            };

            if changed {
                out_facts.insert(node, new_out);
                for succ in self.cfg.successors(node) {
                    if queued.insert(succ) {
                        worklist.push_back(succ);
                    }
                }
            }
        }

        IntraMonotoneResult { in_facts, out_facts, stats }
    }
}
