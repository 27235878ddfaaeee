//! Per-file workflow and run orchestration
//!
//! # Architecture
//! - [`FileProcessor`]: one file through the whole sequence
//!   (log check → recording id → extractor → post-process → submit)
//! - [`Pipeline`]: input expansion, bounded worker pool, single log writer
//!
//! Per-file failures never escape a worker; they become [`TaskOutcome`]s
//! that the log writer turns into processed-file log rows.

pub mod pipeline;
pub mod processor;

pub use pipeline::{Pipeline, PipelineConfig};
pub use processor::FileProcessor;

use crate::db::filelog::{REASON_EXTRACTOR, REASON_JSON};
use std::path::Path;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Terminal result of processing one file
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// Path already present in the log
    AlreadyProcessed,
    /// No valid recording id in the tags
    NoIdentifier,
    /// Features accepted by the server
    Submitted { recording_id: Uuid },
    /// Server answered with a non-2xx status
    SubmissionRejected { status: u16, body: String },
    /// Request failed before any answer
    SubmissionFailed { message: String },
    /// Extractor exited unsuccessfully or could not be started
    ExtractorFailed { exit_code: Option<i32> },
    /// Extractor output missing or malformed
    OutputUnreadable { message: String },
    /// Not started, or extractor interrupted, because shutdown was requested
    Cancelled,
    /// Local failure unrelated to the file itself (log query, temp dir, panic)
    Error { message: String },
}

/// What the log writer does with an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRecord {
    /// Write nothing; the file is seen again next run
    Skip,
    /// Record without reason
    Success,
    /// Record with the given reason
    Failure(&'static str),
}

impl TaskOutcome {
    /// Log row for this outcome
    ///
    /// Submission failures are recorded as success so the run keeps moving
    /// forward, even though the server never stored the features. With
    /// `strict_submission` they are left unrecorded instead.
    pub fn log_record(&self, strict_submission: bool) -> LogRecord {
        match self {
            TaskOutcome::Submitted { .. } => LogRecord::Success,
            TaskOutcome::SubmissionRejected { .. } | TaskOutcome::SubmissionFailed { .. } => {
                if strict_submission {
                    LogRecord::Skip
                } else {
                    LogRecord::Success
                }
            }
            TaskOutcome::ExtractorFailed { .. } => LogRecord::Failure(REASON_EXTRACTOR),
            TaskOutcome::OutputUnreadable { .. } => LogRecord::Failure(REASON_JSON),
            TaskOutcome::AlreadyProcessed
            | TaskOutcome::NoIdentifier
            | TaskOutcome::Cancelled
            | TaskOutcome::Error { .. } => LogRecord::Skip,
        }
    }

    /// Emit the status line for `path`
    pub fn report(&self, path: &Path) {
        let file = path.display();
        match self {
            TaskOutcome::AlreadyProcessed => info!(file = %file, "Already processed, skipping"),
            TaskOutcome::NoIdentifier => info!(file = %file, "No recording id, skipping"),
            TaskOutcome::Submitted { recording_id } => {
                info!(file = %file, mbid = %recording_id, "Submitted")
            }
            TaskOutcome::SubmissionRejected { status, body } => warn!(
                file = %file,
                status = status,
                body = %body,
                "Got an error submitting the track"
            ),
            TaskOutcome::SubmissionFailed { message } => warn!(
                file = %file,
                error = %message,
                "Could not reach the server to submit the track"
            ),
            TaskOutcome::ExtractorFailed { exit_code: Some(code) } => {
                warn!(file = %file, exit_code = code, "Extractor returned a non-zero exit code")
            }
            TaskOutcome::ExtractorFailed { exit_code: None } => {
                warn!(file = %file, "Extractor did not exit normally")
            }
            TaskOutcome::OutputUnreadable { message } => warn!(
                file = %file,
                error = %message,
                "Failed to read the extractor output for this file"
            ),
            TaskOutcome::Cancelled => info!(file = %file, "Shutdown requested, not completed"),
            TaskOutcome::Error { message } => error!(file = %file, error = %message, "Processing failed"),
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: usize,
    pub submission_errors: usize,
    pub extractor_errors: usize,
    pub unreadable_outputs: usize,
    pub already_processed: usize,
    pub no_identifier: usize,
    pub cancelled: usize,
    pub errors: usize,
    /// Outcomes that could not be written to the log
    pub log_write_failures: usize,
}

impl RunSummary {
    pub fn add(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Submitted { .. } => self.submitted += 1,
            TaskOutcome::SubmissionRejected { .. } | TaskOutcome::SubmissionFailed { .. } => {
                self.submission_errors += 1
            }
            TaskOutcome::ExtractorFailed { .. } => self.extractor_errors += 1,
            TaskOutcome::OutputUnreadable { .. } => self.unreadable_outputs += 1,
            TaskOutcome::AlreadyProcessed => self.already_processed += 1,
            TaskOutcome::NoIdentifier => self.no_identifier += 1,
            TaskOutcome::Cancelled => self.cancelled += 1,
            TaskOutcome::Error { .. } => self.errors += 1,
        }
    }

    /// Number of files that went through the pool
    pub fn total(&self) -> usize {
        self.submitted
            + self.submission_errors
            + self.extractor_errors
            + self.unreadable_outputs
            + self.already_processed
            + self.no_identifier
            + self.cancelled
            + self.errors
    }
}
