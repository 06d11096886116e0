pub mod framework;

pub use framework::{IntraMonotoneProblem, MonotoneLattice};
