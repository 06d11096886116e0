//! An interprocedural data-flow analysis framework over a small in-memory
//! compiler IR: IFDS, IDE, and the Monotone Framework, driven by a
//! whole-program or module-wise controller.

pub mod config;
pub mod controller;
pub mod errors;
pub mod features;
pub mod ir;
pub mod logging;

pub use config::{AnalysisName, CompositionMode, RunConfig};
pub use controller::{Controller, ControllerState, DotArtifact, RunOutcome};
pub use errors::{Diagnostic, FrameworkError, Result};
