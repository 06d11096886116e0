//! IDE types: IFDS augmented with a second, bounded-height lattice of
//! edge values. Grounded on the taint-analysis IDE framework's
//! `IDEValue`/`EdgeFunction`/`IDEProblem` split.

use crate::features::solvers::ifds::DataflowFact;
use std::fmt::Debug;
use std::hash::Hash;

/// The edge-value lattice L. `meet` must be
/// commutative, associative, and idempotent with `top` as identity and
/// `bottom` as absorbing element; the solver's termination depends on L
/// having finite height (problem-supplied, checked only by convention here).
pub trait IdeValue: Clone + Eq + Hash + Debug {
    fn top() -> Self;
    fn bottom() -> Self;
    fn meet(&self, other: &Self) -> Self;
    fn is_top(&self) -> bool;
    fn is_bottom(&self) -> bool;
}

/// `L -> L`: how one ICFG edge transforms a value for a specific
/// (source_fact, target_fact) fact transition.
pub trait EdgeFunction<V: IdeValue>: Debug {
    fn apply(&self, input: &V) -> V;
    fn is_identity(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub struct IdentityEdgeFunction;

impl<V: IdeValue> EdgeFunction<V> for IdentityEdgeFunction {
    fn apply(&self, input: &V) -> V {
        input.clone()
    }
    fn is_identity(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct ConstantEdgeFunction<V: IdeValue> {
    pub constant: V,
}

impl<V: IdeValue> ConstantEdgeFunction<V> {
    pub fn new(constant: V) -> Self {
        Self { constant }
    }
}

impl<V: IdeValue> EdgeFunction<V> for ConstantEdgeFunction<V> {
    fn apply(&self, _input: &V) -> V {
        self.constant.clone()
    }
}

#[derive(Debug, Clone)]
pub struct AllTopEdgeFunction;

impl<V: IdeValue> EdgeFunction<V> for AllTopEdgeFunction {
    fn apply(&self, _input: &V) -> V {
        V::top()
    }
}

/// An IDE problem: an [`IfdsProblem`](crate::features::solvers::ifds::IfdsProblem)-shaped
/// fact lattice plus, per edge, a value transformer over `V`. Fact-flow
/// methods default to identity so a problem only needs to override the ones
/// that actually kill or generate facts (mirrors the taint-analysis source).
pub trait IdeProblem<F: DataflowFact, V: IdeValue> {
    /// `(entry_node_id, seed_fact, seed_value)` triples.
    fn initial_seeds(&self) -> Vec<(String, F, V)>;

    fn normal_flow_function(&self, _from: &str, _to: &str, source_fact: &F) -> Vec<F> {
        vec![source_fact.clone()]
    }
    fn call_flow_function(&self, _call_site: &str, _callee_entry: &str, source_fact: &F) -> Vec<F> {
        vec![source_fact.clone()]
    }
    fn return_flow_function(&self, _callee_exit: &str, _return_site: &str, _call_site: &str, source_fact: &F) -> Vec<F> {
        vec![source_fact.clone()]
    }
    fn call_to_return_flow_function(&self, _call_site: &str, _return_site: &str, source_fact: &F) -> Vec<F> {
        vec![source_fact.clone()]
    }

    fn normal_edge_function(&self, from: &str, to: &str, source_fact: &F, target_fact: &F) -> Box<dyn EdgeFunction<V>>;

    fn call_edge_function(
        &self,
        call_site: &str,
        callee_entry: &str,
        source_fact: &F,
        target_fact: &F,
    ) -> Box<dyn EdgeFunction<V>>;

    fn return_edge_function(
        &self,
        callee_exit: &str,
        return_site: &str,
        call_site: &str,
        source_fact: &F,
        target_fact: &F,
    ) -> Box<dyn EdgeFunction<V>>;

    fn call_to_return_edge_function(
        &self,
        call_site: &str,
        return_site: &str,
        source_fact: &F,
        target_fact: &F,
    ) -> Box<dyn EdgeFunction<V>>;
}

/// Lets a solver be constructed from `Box::new(&problem)`; see the
/// equivalent `IfdsProblem` impl for why.
impl<F: DataflowFact, V: IdeValue, T: IdeProblem<F, V> + ?Sized> IdeProblem<F, V> for &T {
    fn initial_seeds(&self) -> Vec<(String, F, V)> {
        (**self).initial_seeds()
    }
    fn normal_flow_function(&self, from: &str, to: &str, source_fact: &F) -> Vec<F> {
        (**self).normal_flow_function(from, to, source_fact)
    }
    fn call_flow_function(&self, call_site: &str, callee_entry: &str, source_fact: &F) -> Vec<F> {
        (**self).call_flow_function(call_site, callee_entry, source_fact)
    }
    fn return_flow_function(
        &self,
        callee_exit: &str,
        return_site: &str,
        call_site: &str,
        source_fact: &F,
    ) -> Vec<F> {
        (**self).return_flow_function(callee_exit, return_site, call_site, source_fact)
    }
    fn call_to_return_flow_function(&self, call_site: &str, return_site: &str, source_fact: &F) -> Vec<F> {
        (**self).call_to_return_flow_function(call_site, return_site, source_fact)
    }
    fn normal_edge_function(&self, from: &str, to: &str, source_fact: &F, target_fact: &F) -> Box<dyn EdgeFunction<V>> {
        (**self).normal_edge_function(from, to, source_fact, target_fact)
    }
    fn call_edge_function(
        &self,
        call_site: &str,
        callee_entry: &str,
        source_fact: &F,
        target_fact: &F,
    ) -> Box<dyn EdgeFunction<V>> {
        (**self).call_edge_function(call_site, callee_entry, source_fact, target_fact)
    }
    fn return_edge_function(
        &self,
        callee_exit: &str,
        return_site: &str,
        call_site: &str,
        source_fact: &F,
        target_fact: &F,
    ) -> Box<dyn EdgeFunction<V>> {
        (**self).return_edge_function(callee_exit, return_site, call_site, source_fact, target_fact)
    }
    fn call_to_return_edge_function(
        &self,
        call_site: &str,
        return_site: &str,
        source_fact: &F,
        target_fact: &F,
    ) -> Box<dyn EdgeFunction<V>> {
        (**self).call_to_return_edge_function(call_site, return_site, source_fact, target_fact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum TestValue {
        Bottom,
        Constant(i64),
        Top,
    }

    impl IdeValue for TestValue {
        fn top() -> Self {
            TestValue::Top
        }
        fn bottom() -> Self {
            TestValue::Bottom
        }
        fn meet(&self, other: &Self) -> Self {
            match (self, other) {
                (TestValue::Bottom, v) | (v, TestValue::Bottom) => v.clone(),
                (TestValue::Top, _) | (_, TestValue::Top) => TestValue::Top,
                (TestValue::Constant(a), TestValue::Constant(b)) => {
                    if a == b {
                        TestValue::Constant(*a)
                    } else {
                        TestValue::Top
                    }
                }
            }
        }
        fn is_top(&self) -> bool {
            matches!(self, TestValue::Top)
        }
        fn is_bottom(&self) -> bool {
            matches!(self, TestValue::Bottom)
        }
    }

    #[test]
    fn meet_is_commutative() {
        let a = TestValue::Constant(5);
        let b = TestValue::Constant(7);
        assert_eq!(a.meet(&b), b.meet(&a));
    }

    #[test]
    fn meet_same_constant_stays_constant() {
        assert_eq!(TestValue::Constant(2).meet(&TestValue::Constant(2)), TestValue::Constant(2));
    }

    #[test]
    fn meet_different_constants_goes_top() {
        assert_eq!(TestValue::Constant(2).meet(&TestValue::Constant(3)), TestValue::Top);
    }

    #[test]
    fn identity_edge_function_is_a_no_op() {
        let f = IdentityEdgeFunction;
        assert_eq!(f.apply(&TestValue::Constant(9)), TestValue::Constant(9));
    }
}
