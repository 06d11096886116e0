pub mod domain;

pub use domain::PointsToGraph;
