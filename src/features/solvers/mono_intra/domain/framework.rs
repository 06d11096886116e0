//! Intra-monotone types: a classic Kildall-style worklist over one
//! function's [`Cfg`](crate::features::cfg::Cfg). Grounded on the
//! taint-analysis worklist solver's meet/transfer/changed-check shape,
//! generalized from a fixed `HashSet<TaintFact>` lattice to a
//! problem-supplied one.

use std::fmt::Debug;

/// A bounded-height join-semilattice of dataflow facts for one function.
/// `bottom` seeds every non-entry node before the first pass; `join` is the
/// meet-over-predecessors operator (usually set union or intersection).
pub trait MonotoneLattice: Clone + PartialEq + Debug {
    fn bottom() -> Self;
    fn join(&self, other: &Self) -> Self;
}

/// An intra-monotone analysis problem: an entry value plus a transfer
/// function per node.
pub trait IntraMonotoneProblem<L: MonotoneLattice> {
    fn entry_value(&self) -> L;

    /// `in -> out` for the instruction at `node_id`.
    fn transfer(&self, node_id: &str, input: &L) -> L;
}

/// Lets a solver be constructed from `Box::new(&problem)`; see the
/// equivalent `IfdsProblem` impl for why.
impl<L: MonotoneLattice, T: IntraMonotoneProblem<L> + ?Sized> IntraMonotoneProblem<L> for &T {
    fn entry_value(&self) -> L {
        (**self).entry_value()
    }
    fn transfer(&self, node_id: &str, input: &L) -> L {
        (**self).transfer(node_id, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct ConstSet(std::collections::BTreeSet<i64>);

    impl MonotoneLattice for ConstSet {
        fn bottom() -> Self {
            ConstSet(std::collections::BTreeSet::new())
        }
        fn join(&self, other: &Self) -> Self {
            ConstSet(self.0.union(&other.0).copied().collect())
        }
    }

    #[test]
    fn join_is_union() {
        let a = ConstSet([1, 2].into_iter().collect());
        let b = ConstSet([2, 3].into_iter().collect());
        let joined = a.join(&b);
        assert_eq!(joined.0, [1, 2, 3].into_iter().collect());
    }
}
