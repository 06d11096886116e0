//! The IFDS tabulation solver: worklist-based fixed-point over path
//! edges, with summary-edge caching so a callee is never re-walked for a
//! call-site fact it has already summarized. Grounded on the
//! Reps/Horwitz/Sagiv (1995) algorithm.

use crate::features::icfg::{IcfgEdgeKind, IcfgGraph};
use crate::features::solvers::ifds::domain::{DataflowFact, IfdsProblem};
use rustc_hash::FxHashMap;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PathEdge<F: DataflowFact> {
    source_fact: F,
    target_node: String,
    target_fact: F,
}

#[derive(Debug, Clone, Default)]
pub struct IfdsStatistics {
    pub num_iterations: usize,
    pub num_path_edges: usize,
    pub num_summary_edges: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    Completed,
    Cancelled,
}

pub struct IfdsResult<F: DataflowFact> {
    path_edges: FxHashMap<(F, String), HashSet<F>>,
    pub stats: IfdsStatistics,
    pub outcome: SolveOutcome,
}

impl<F: DataflowFact> IfdsResult<F> {
    /// Non-zero facts holding at `node_id`, under any seed.
    pub fn facts_at(&self, node_id: &str) -> HashSet<F> {
        self.path_edges
            .iter()
            .filter(|((_, n), _)| n == node_id)
            .flat_map(|(_, facts)| facts.iter().cloned())
            .filter(|f| !f.is_zero())
            .collect()
    }

    pub fn reachable_nodes(&self) -> HashSet<&str> {
        self.path_edges.keys().map(|(_, n)| n.as_str()).collect()
    }
}

/// Binds an [`IfdsProblem`] to an [`IcfgGraph`] and drives it to a fixed
/// point.
pub struct IfdsSolver<'a, F: DataflowFact> {
    problem: Box<dyn IfdsProblem<F> + 'a>,
    icfg: &'a IcfgGraph,
    path_edges: FxHashMap<(F, String), HashSet<F>>,
    summary_edges: FxHashMap<(String, F, String), HashSet<F>>,
    worklist: VecDeque<PathEdge<F>>,
    stats: IfdsStatistics,
}

impl<'a, F: DataflowFact> IfdsSolver<'a, F> {
    pub fn new(problem: Box<dyn IfdsProblem<F> + 'a>, icfg: &'a IcfgGraph) -> Self {
        Self {
            problem,
            icfg,
            path_edges: FxHashMap::default(),
            summary_edges: FxHashMap::default(),
            worklist: VecDeque::new(),
            stats: IfdsStatistics::default(),
        }
    }

    /// Run to a fixed point, checking `cancelled` at each worklist pop
    ///; returns whatever partial result has accumulated if it fires.
    pub fn solve(mut self, cancelled: &dyn Fn() -> bool) -> IfdsResult<F> {
        for (entry, seed) in self.problem.initial_seeds() {
            self.add_path_edge(PathEdge { source_fact: F::zero(), target_node: entry, target_fact: seed });
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
        self.stats.num_summary_edges = self.summary_edges.values().map(|s| s.len()).sum();

        IfdsResult { path_edges: self.path_edges, stats: self.stats, outcome }
    }

    fn process(&mut self, edge: PathEdge<F>) {
        let PathEdge { source_fact: d1, target_node: n, target_fact: d2 } = edge;
        for (to, kind) in self.icfg.successor_ids(&n) {
            match kind {
                IcfgEdgeKind::Normal => self.process_normal(&d1, &n, &d2, &to),
                IcfgEdgeKind::Call => self.process_call(&d1, &n, &d2, &to),
                IcfgEdgeKind::Return { call_site } => self.process_return(&d1, &n, &d2, &to, &call_site),
                IcfgEdgeKind::CallToReturn => self.process_call_to_return(&d1, &n, &d2, &to),
                IcfgEdgeKind::UnresolvedCall => {}
            }
        }
    }

    fn process_normal(&mut self, d1: &F, n: &str, d2: &F, m: &str) {
        let flow = self.problem.normal_flow(n, m);
        for d3 in flow.compute(d2) {
            self.add_path_edge(PathEdge { source_fact: d1.clone(), target_node: m.to_string(), target_fact: d3 });
        }
    }

    /// Seed the callee with `(d3, callee_entry, d3)` for every fact the
    /// call flow produces, and short-circuit to the return site when a
    /// summary for `(call_site, d3)` was already computed by an earlier
    /// visit to this callee.
    fn process_call(&mut self, d1: &F, call_site: &str, d2: &F, callee_entry: &str) {
        let flow = self.problem.call_flow(call_site, callee_entry);
        let return_site =
            self.icfg.call_sites().iter().find(|r| r.site == call_site).and_then(|r| r.return_site.clone());

        for d3 in flow.compute(d2) {
            self.add_path_edge(PathEdge {
                source_fact: d3.clone(),
                target_node: callee_entry.to_string(),
                target_fact: d3.clone(),
            });

            if let Some(ret) = &return_site {
                let key = (call_site.to_string(), d3.clone(), ret.clone());
                if let Some(facts) = self.summary_edges.get(&key).cloned() {
                    for d_ret in facts {
                        self.add_path_edge(PathEdge {
                            source_fact: d1.clone(),
                            target_node: ret.clone(),
                            target_fact: d_ret,
                        });
                    }
                }
            }
        }
    }

    /// For every `(d1, d3)` already known to hold at `call_site`, check
    /// whether `call_flow(d3)` actually produced `d4` (the seed the callee
    /// path edge started from) before connecting back to the caller —
    /// this is the step that keeps IFDS context-sensitive.
    fn process_return(&mut self, d4: &F, callee_exit: &str, d5: &F, return_site: &str, call_site: &str) {
        let flow = self.problem.return_flow(callee_exit, return_site, call_site);
        let callee_entry = self
            .icfg
            .successor_ids(call_site)
            .into_iter()
            .find_map(|(to, kind)| matches!(kind, IcfgEdgeKind::Call).then_some(to));

        for d6 in flow.compute(d5) {
            let call_site_facts: Vec<(F, F)> = self
                .path_edges
                .iter()
                .filter(|((_, node), _)| node == call_site)
                .flat_map(|((src, _), facts)| facts.iter().map(move |f| (src.clone(), f.clone())))
                .collect();

            for (d1, d3) in call_site_facts {
                let produces = match &callee_entry {
                    Some(entry) => self.problem.call_flow(call_site, entry).compute(&d3).contains(d4),
                    None => d4 == &d3 || d4.is_zero(),
                };
                if !produces {
                    continue;
                }

                self.add_path_edge(PathEdge {
                    source_fact: d1,
                    target_node: return_site.to_string(),
                    target_fact: d6.clone(),
                });
                self.summary_edges
                    .entry((call_site.to_string(), d3, return_site.to_string()))
                    .or_default()
                    .insert(d6.clone());
            }
        }
    }

    fn process_call_to_return(&mut self, d1: &F, call_site: &str, d2: &F, return_site: &str) {
        let flow = self.problem.call_to_return_flow(call_site, return_site);
        for d3 in flow.compute(d2) {
            self.add_path_edge(PathEdge {
                source_fact: d1.clone(),
                target_node: return_site.to_string(),
                target_fact: d3,
            });
        }
    }

    fn add_path_edge(&mut self, edge: PathEdge<F>) {
        let key = (edge.source_fact.clone(), edge.target_node.clone());
        if self.path_edges.entry(key).or_default().insert(edge.target_fact.clone()) {
            self.worklist.push_back(edge);
        }
    }
}
