//! Error types for the data-flow framework.
//!
//! One enum covers every recognized error kind; solver and pre-analysis
//! failures that are "logged, continues" are represented as `Diagnostic`s
//! collected by the caller rather than as `Err` returns.

use thiserror::Error;

/// Main error type for framework operations.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum FrameworkError {
    #[error("module `{0}` is already present in the IR database")]
    DuplicateModule(String),

    #[error("link conflict: symbol `{0}` has two strong definitions")]
    LinkConflict(String),

    #[error("unknown analysis `{0}`")]
    UnknownAnalysis(String),

    #[error("entry point `{0}` is not defined in any module")]
    EntryPointMissing(String),

    #[error("solver precondition violated: {0}")]
    SolverPrecondition(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("MW mode does not implement analysis `{0}` yet")]
    NotImplemented(String),
}

impl FrameworkError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            FrameworkError::DuplicateModule(_)
            | FrameworkError::LinkConflict(_)
            | FrameworkError::UnknownAnalysis(_)
            | FrameworkError::EntryPointMissing(_)
            | FrameworkError::NotImplemented(_) => 2,
            FrameworkError::SolverPrecondition(_) => 4,
            FrameworkError::Cancelled => 1,
        }
    }
}

/// Result type alias for framework operations.
pub type Result<T> = std::result::Result<T, FrameworkError>;

/// A non-fatal problem surfaced during pre-analysis: logged at
/// critical/warning severity but never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `verify()` reported `ok = false` for a module.
    BrokenModule { module_id: String },
    /// `verify()` reported broken debug info for a module.
    BrokenDebugInfo { module_id: String },
    /// A solver failed mid-batch; the dispatcher recorded it and moved on.
    SolverFailed { analysis: String, error: String },
}
