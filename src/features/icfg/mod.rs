//! ICFG Builder.

pub mod domain;
pub mod infrastructure;

pub use domain::{CallSiteRecord, IcfgEdgeKind, IcfgGraph, ResolveStrategy, WalkerStrategy};
pub use infrastructure::{merge_icfgs, IcfgBuilder};
