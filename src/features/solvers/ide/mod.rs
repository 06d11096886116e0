//! IDE solver (IFDS plus an edge-value lattice).

pub mod domain;
pub mod infrastructure;

pub use domain::{AllTopEdgeFunction, ConstantEdgeFunction, EdgeFunction, IdeProblem, IdeValue, IdentityEdgeFunction};
pub use infrastructure::{IdeResult, IdeSolver, IdeStatistics, SolveOutcome};
