pub mod framework;

pub use framework::{
    DataflowFact, ExplodedEdgeKind, ExplodedNode, FlowFunction, GenFlow, IdentityFlow, IfdsProblem, KillFlow,
};
