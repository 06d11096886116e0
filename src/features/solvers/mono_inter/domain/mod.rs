pub mod framework;

pub use framework::InterMonotoneProblem;
