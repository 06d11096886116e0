//! Analysis Problems. Strategy objects supplying flow functions and
//! lattices to the solvers, plus the string-keyed registry tying them to
//! analysis names.

pub mod ide_solvertest;
pub mod ide_taint;
pub mod ifds_solvertest;
pub mod ifds_taint;
pub mod ifds_type;
pub mod ifds_uninit;
pub mod mono_inter_solvertest;
pub mod mono_intra_fullconstpropagation;
pub mod mono_intra_solvertest;
pub mod none;
pub mod registry;
pub mod support;

pub use registry::{build, AnalysisContext, AnalysisOutput, AnalysisProblem, NodeResult};
