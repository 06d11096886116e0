pub mod graph;
pub mod strategy;

pub use graph::{CallSiteRecord, IcfgEdgeKind, IcfgGraph, IcfgNode};
pub use strategy::{ResolveStrategy, WalkerStrategy};
