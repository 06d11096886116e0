//! IFDS solver.

pub mod domain;
pub mod infrastructure;

pub use domain::{DataflowFact, FlowFunction, GenFlow, IdentityFlow, IfdsProblem, KillFlow};
pub use infrastructure::{IfdsResult, IfdsSolver, IfdsStatistics, SolveOutcome};
