//! Intra-procedural monotone solver.

pub mod domain;
pub mod infrastructure;

pub use domain::{IntraMonotoneProblem, MonotoneLattice};
pub use infrastructure::{IntraMonotoneResult, IntraMonotoneSolver, MonotoneStatistics};
