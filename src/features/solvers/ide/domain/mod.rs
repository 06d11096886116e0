pub mod framework;

pub use framework::{AllTopEdgeFunction, ConstantEdgeFunction, EdgeFunction, IdeProblem, IdeValue, IdentityEdgeFunction};
