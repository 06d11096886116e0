//! IR Database.

pub mod domain;

pub use domain::Irdb;
