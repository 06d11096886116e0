//! Call-string-sensitive inter-procedural monotone solver.

pub mod domain;
pub mod infrastructure;

pub use domain::InterMonotoneProblem;
pub use infrastructure::{CallString, InterMonotoneResult, InterMonotoneSolver, MonotoneStatistics};
