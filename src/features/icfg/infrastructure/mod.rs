pub mod builder;

pub use builder::{merge_icfgs, IcfgBuilder};
