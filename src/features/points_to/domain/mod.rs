pub mod points_to_graph;

pub use points_to_graph::PointsToGraph;
