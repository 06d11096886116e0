//! IFDS types: the exploded supergraph, flow functions, and the
//! problem specification a solver is instantiated against. Grounded on the
//! Reps/Horwitz/Sagiv (1995) tabulation formulation.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// One element of the finite, distributive dataflow domain. `zero()` is the
/// distinguished "no information" fact every analysis seeds its entry point
/// with before seeding any real facts.
pub trait DataflowFact: Clone + Eq + Hash + Debug {
    fn is_zero(&self) -> bool;
    fn zero() -> Self;
}

/// A node of the exploded supergraph: an ICFG node paired with a fact that
/// holds there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExplodedNode<F: DataflowFact> {
    pub node_id: String,
    pub fact: F,
}

impl<F: DataflowFact> ExplodedNode<F> {
    pub fn new(node_id: impl Into<String>, fact: F) -> Self {
        Self { node_id: node_id.into(), fact }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExplodedEdgeKind {
    Normal,
    Call,
    Return,
    /// A call-site-to-return-site edge applied via a cached summary rather
    /// than by re-walking the callee.
    Summary,
}

/// `d -> 2^d`: the effect of one ICFG edge on the dataflow domain.
pub trait FlowFunction<F: DataflowFact> {
    fn compute(&self, input: &F) -> HashSet<F>;
}

pub struct IdentityFlow;

impl<F: DataflowFact> FlowFunction<F> for IdentityFlow {
    fn compute(&self, input: &F) -> HashSet<F> {
        HashSet::from([input.clone()])
    }
}

pub struct KillFlow;

impl<F: DataflowFact> FlowFunction<F> for KillFlow {
    fn compute(&self, _input: &F) -> HashSet<F> {
        HashSet::new()
    }
}

/// `f(d) = {d} ∪ {gen}`: identity plus one generated fact, the common shape
/// for "this statement also makes X true" transfer functions.
pub struct GenFlow<F: DataflowFact> {
    pub gen: F,
}

impl<F: DataflowFact> FlowFunction<F> for GenFlow<F> {
    fn compute(&self, input: &F) -> HashSet<F> {
        HashSet::from([input.clone(), self.gen.clone()])
    }
}

/// An IFDS problem: seeds plus one flow function per ICFG edge kind at a
/// node.
pub trait IfdsProblem<F: DataflowFact> {
    /// `(entry_node_id, seed_fact)` pairs the solver starts from.
    fn initial_seeds(&self) -> Vec<(String, F)>;

    fn normal_flow(&self, from: &str, to: &str) -> Box<dyn FlowFunction<F>>;

    fn call_flow(&self, call_site: &str, callee_entry: &str) -> Box<dyn FlowFunction<F>>;

    fn return_flow(&self, callee_exit: &str, return_site: &str, call_site: &str) -> Box<dyn FlowFunction<F>>;

    fn call_to_return_flow(&self, call_site: &str, return_site: &str) -> Box<dyn FlowFunction<F>>;
}

/// Lets a solver be constructed from `Box::new(&problem)`, so a caller can
/// keep using the problem (e.g. to read off findings) after `solve()`
/// consumes the boxed trait object.
impl<F: DataflowFact, T: IfdsProblem<F> + ?Sized> IfdsProblem<F> for &T {
    fn initial_seeds(&self) -> Vec<(String, F)> {
        (**self).initial_seeds()
    }
    fn normal_flow(&self, from: &str, to: &str) -> Box<dyn FlowFunction<F>> {
        (**self).normal_flow(from, to)
    }
    fn call_flow(&self, call_site: &str, callee_entry: &str) -> Box<dyn FlowFunction<F>> {
        (**self).call_flow(call_site, callee_entry)
    }
    fn return_flow(&self, callee_exit: &str, return_site: &str, call_site: &str) -> Box<dyn FlowFunction<F>> {
        (**self).return_flow(callee_exit, return_site, call_site)
    }
    fn call_to_return_flow(&self, call_site: &str, return_site: &str) -> Box<dyn FlowFunction<F>> {
        (**self).call_to_return_flow(call_site, return_site)
    }
}
