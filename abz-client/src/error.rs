//! Error types for abz-client
//!
//! Only run-level failures live here. Per-file failures are converted into
//! [`TaskOutcome`](crate::workflow::TaskOutcome) values inside the worker and
//! never abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An input path given on the command line does not exist
    #[error("{0} does not exist")]
    PathNotFound(PathBuf),

    /// Processed-file log could not be opened or initialized
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error from abz-common
    #[error(transparent)]
    Common(#[from] abz_common::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
