//! The IDE solver: IFDS reachability fused with a value meet-over-all-
//! paths computation over a second lattice. The classic presentation runs
//! this as two phases (phase 1 = IFDS on facts, phase 2 = a reverse-postorder
//! walk of the jump-function table materializing values); this
//! implementation fuses both into one worklist, re-enqueuing a (node, fact)
//! pair whenever either a new path reaches it or `meet` tightens its
//! accumulated value. Termination is unaffected: both D and L are finite,
//! and `meet` only ever moves a value toward `bottom`, so the combined
//! state space is finite.

use crate::features::icfg::{IcfgEdgeKind, IcfgGraph};
use crate::features::solvers::ide::domain::{IdeProblem, IdeValue};
use crate::features::solvers::ifds::DataflowFact;
use rustc_hash::FxHashMap;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct IdeStatistics {
    pub num_iterations: usize,
    pub num_path_edges: usize,
    pub num_value_updates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    Completed,
    Cancelled,
}

pub struct IdeResult<F: DataflowFact, V: IdeValue> {
    path_edges: FxHashMap<(F, String), HashSet<F>>,
    values: FxHashMap<(String, F), V>,
    pub stats: IdeStatistics,
    pub outcome: SolveOutcome,
}

impl<F: DataflowFact, V: IdeValue> IdeResult<F, V> {
    pub fn facts_at(&self, node_id: &str) -> HashSet<F> {
        self.path_edges
            .iter()
            .filter(|((_, n), _)| n == node_id)
            .flat_map(|(_, facts)| facts.iter().cloned())
            .filter(|f| !f.is_zero())
            .collect()
    }

    /// The meet-over-all-paths value for `fact` at `node_id`, `None` if that
    /// fact never reached the node.
    pub fn value_at(&self, node_id: &str, fact: &F) -> Option<&V> {
        self.values.get(&(node_id.to_string(), fact.clone()))
    }

    pub fn reachable_nodes(&self) -> HashSet<&str> {
        self.path_edges.keys().map(|(_, n)| n.as_str()).collect()
    }
}

struct PendingEdge<F: DataflowFact> {
    source_fact: F,
    node: String,
    fact: F,
}

pub struct IdeSolver<'a, F: DataflowFact, V: IdeValue> {
    problem: Box<dyn IdeProblem<F, V> + 'a>,
    icfg: &'a IcfgGraph,
    path_edges: FxHashMap<(F, String), HashSet<F>>,
    values: FxHashMap<(String, F), V>,
    summary_values: FxHashMap<(String, F, String, F), V>,
    worklist: VecDeque<PendingEdge<F>>,
    stats: IdeStatistics,
}

impl<'a, F: DataflowFact, V: IdeValue> IdeSolver<'a, F, V> {
    pub fn new(problem: Box<dyn IdeProblem<F, V> + 'a>, icfg: &'a IcfgGraph) -> Self {
        Self {
            problem,
            icfg,
            path_edges: FxHashMap::default(),
            values: FxHashMap::default(),
            summary_values: FxHashMap::default(),
            worklist: VecDeque::new(),
            stats: IdeStatistics::default(),
        }
    }

    pub fn solve(mut self, cancelled: &dyn Fn() -> bool) -> IdeResult<F, V> {
        for (entry, seed, value) in self.problem.initial_seeds() {
            self.propagate(F::zero(), entry, seed, value);
        }

        let outcome = loop {
            if cancelled() {
                break SolveOutcome::Cancelled;
            }
            let Some(edge) = self.worklist.pop_front() else { break SolveOutcome::Completed };
            self.stats.num_iterations += 1;
            self.process(edge);
        };

        self.stats.num_path_edges = self.path_edges.values().map(|s| s.len()).sum();

        IdeResult { path_edges: self.path_edges, values: self.values, stats: self.stats, outcome }
    }

    fn process(&mut self, edge: PendingEdge<F>) {
        let PendingEdge { source_fact: d1, node: n, fact: d2 } = edge;
        let current_value = self.values.get(&(n.clone(), d2.clone())).cloned().unwrap_or_else(V::top);

        for (m, kind) in self.icfg.successor_ids(&n) {
            match kind {
                IcfgEdgeKind::Normal => self.propagate_normal(&d1, &n, &d2, &current_value, &m),
                IcfgEdgeKind::Call => self.propagate_call(&d1, &n, &d2, &current_value, &m),
                IcfgEdgeKind::Return { call_site } => {
                    self.propagate_return(&d1, &n, &d2, &current_value, &m, &call_site)
                }
                IcfgEdgeKind::CallToReturn => self.propagate_call_to_return(&d1, &n, &d2, &current_value, &m),
                IcfgEdgeKind::UnresolvedCall => {}
            }
        }
    }

    fn propagate_normal(&mut self, d1: &F, n: &str, d2: &F, v2: &V, m: &str) {
        for d3 in self.problem.normal_flow_function(n, m, d2) {
            let edge_fn = self.problem.normal_edge_function(n, m, d2, &d3);
            let v3 = edge_fn.apply(v2);
            self.propagate(d1.clone(), m.to_string(), d3, v3);
        }
    }

    fn propagate_call(&mut self, d1: &F, call_site: &str, d2: &F, v2: &V, callee_entry: &str) {
        let return_site =
            self.icfg.call_sites().iter().find(|r| r.site == call_site).and_then(|r| r.return_site.clone());

        for d3 in self.problem.call_flow_function(call_site, callee_entry, d2) {
            let edge_fn = self.problem.call_edge_function(call_site, callee_entry, d2, &d3);
            let v3 = edge_fn.apply(v2);
            self.propagate(d3.clone(), callee_entry.to_string(), d3.clone(), v3.clone());

            if let Some(ret) = &return_site {
                let reachable: Vec<(F, V)> = self
                    .summary_values
                    .iter()
                    .filter(|((site, fact, rsite, _), _)| site == call_site && fact == &d3 && rsite == ret)
                    .map(|((_, _, _, d_ret), value)| (d_ret.clone(), value.clone()))
                    .collect();
                for (d_ret, summary_value) in reachable {
                    self.propagate(d1.clone(), ret.clone(), d_ret, summary_value);
                }
            }
        }
    }

    fn propagate_return(&mut self, d4: &F, callee_exit: &str, d5: &F, v5: &V, return_site: &str, call_site: &str) {
        let callee_entry = self
            .icfg
            .successor_ids(call_site)
            .into_iter()
            .find_map(|(to, kind)| matches!(kind, IcfgEdgeKind::Call).then_some(to));

        for d6 in self.problem.return_flow_function(callee_exit, return_site, call_site, d5) {
            let call_site_facts: Vec<(F, F)> = self
                .path_edges
                .iter()
                .filter(|((_, node), _)| node == call_site)
                .flat_map(|((src, _), facts)| facts.iter().map(move |f| (src.clone(), f.clone())))
                .collect();

            for (d1, d3) in call_site_facts {
                let produces = match &callee_entry {
                    Some(entry) => self.problem.call_flow_function(call_site, entry, &d3).contains(d4),
                    None => d4 == &d3 || d4.is_zero(),
                };
                if !produces {
                    continue;
                }

                let edge_fn = self.problem.return_edge_function(callee_exit, return_site, call_site, d5, &d6);
                let v6 = edge_fn.apply(v5);

                self.propagate(d1, return_site.to_string(), d6.clone(), v6.clone());
                let key = (call_site.to_string(), d3, return_site.to_string(), d6);
                let merged = match self.summary_values.get(&key) {
                    Some(existing) => existing.meet(&v6),
                    None => v6,
                };
                self.summary_values.insert(key, merged);
            }
        }
    }

    fn propagate_call_to_return(&mut self, d1: &F, call_site: &str, d2: &F, v2: &V, return_site: &str) {
        for d3 in self.problem.call_to_return_flow_function(call_site, return_site, d2) {
            let edge_fn = self.problem.call_to_return_edge_function(call_site, return_site, d2, &d3);
            let v3 = edge_fn.apply(v2);
            self.propagate(d1.clone(), return_site.to_string(), d3, v3);
        }
    }

    /// Record that `fact` holds at `node` with (at least) `value`, meeting it
    /// with whatever was already known, and re-enqueue `(node, fact)` if
    /// either is new: a fresh path edge or a tighter value.
    fn propagate(&mut self, source_fact: F, node: String, fact: F, value: V) {
        self.stats.num_value_updates += 1;
        let value_key = (node.clone(), fact.clone());
        let value_changed = match self.values.get(&value_key) {
            Some(existing) if existing == &value => false,
            Some(existing) => {
                self.values.insert(value_key, existing.meet(&value));
                true
            }
            None => {
                self.values.insert(value_key, value);
                true
            }
        };

        let is_new_fact = self.path_edges.entry((source_fact.clone(), node.clone())).or_default().insert(fact.clone());

        if is_new_fact || value_changed {
            self.worklist.push_back(PendingEdge { source_fact, node, fact });
        }
    }
}
