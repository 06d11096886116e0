//! Class Hierarchy Reconstructor.

pub mod domain;

pub use domain::ClassHierarchy;
