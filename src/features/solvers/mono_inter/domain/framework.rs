//! Inter-monotone types: the monotone-framework lattice from
//! [`mono_intra`](crate::features::solvers::mono_intra), reused across a
//! call-string-distinguished interprocedural walk instead of a single
//! function's CFG.

use crate::features::solvers::mono_intra::MonotoneLattice;

/// An inter-monotone analysis problem: an entry value plus a transfer
/// function per ICFG node, context-insensitive by itself — context
/// sensitivity comes from the solver's call-string abstraction.
pub trait InterMonotoneProblem<L: MonotoneLattice> {
    /// Node ids the walk starts from (the framework's entry-point set).
    fn entry_points(&self) -> Vec<String>;

    fn entry_value(&self) -> L;

    fn transfer(&self, node_id: &str, input: &L) -> L;
}

/// Lets a solver be constructed from `Box::new(&problem)`; see the
/// equivalent `IfdsProblem` impl for why.
impl<L: MonotoneLattice, T: InterMonotoneProblem<L> + ?Sized> InterMonotoneProblem<L> for &T {
    fn entry_points(&self) -> Vec<String> {
        (**self).entry_points()
    }
    fn entry_value(&self) -> L {
        (**self).entry_value()
    }
    fn transfer(&self, node_id: &str, input: &L) -> L {
        (**self).transfer(node_id, input)
    }
}
