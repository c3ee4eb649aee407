//! Error types for the sweep pipeline.

use thiserror::Error;

/// Errors that end a pipeline run.
///
/// Per-candidate lookup and storage problems are not errors at this level;
/// they are classified into the iteration report and the run continues.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The known-good lookup did not succeed, so the credentials or the
    /// remote service cannot be trusted
    #[error("validation failed: {0}")]
    Validation(String),

    /// The store could not be read during startup
    #[error("storage error: {0}")]
    Storage(#[from] sweep_db::DatabaseError),

    /// Configuration or persisted state does not match the configured range
    #[error("configuration error: {0}")]
    Config(#[from] sweep_core::ConfigError),

    /// A token transport failed
    #[error("token source error: {0}")]
    TokenSource(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
