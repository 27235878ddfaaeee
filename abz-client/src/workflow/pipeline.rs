//! Pipeline orchestrator
//!
//! # Architecture
//! - All inputs are checked for existence before any work starts
//! - Inputs expand to normalized absolute file paths (directories walked
//!   recursively); a file reached through several inputs is scheduled once
//! - `buffer_unordered(workers)` bounds the number of files in flight; each
//!   file runs on its own spawned task
//! - Outcomes flow over an mpsc channel to one log writer, the only code
//!   that writes to the processed-file log
//! - Cancellation stops new files from starting; files in flight finish
//!   and are recorded

use super::{FileProcessor, LogRecord, RunSummary, TaskOutcome};
use crate::db::FileLog;
use crate::error::{PipelineError, PipelineResult};
use crate::services::file_scanner::{FileScanner, ScanError};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Files processed concurrently (minimum 1)
    pub workers: usize,
    /// Leave failed submissions unrecorded so the next run retries them
    pub strict_submission: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            strict_submission: false,
        }
    }
}

/// Orchestrates one run over a set of input paths
pub struct Pipeline {
    config: PipelineConfig,
    scanner: FileScanner,
    processor: Arc<FileProcessor>,
    log: FileLog,
    cancel_token: CancellationToken,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        scanner: FileScanner,
        processor: FileProcessor,
        log: FileLog,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        Self {
            config,
            scanner,
            processor: Arc::new(processor.with_cancel_token(cancel_token.clone())),
            log,
            cancel_token,
        }
    }

    /// Token that stops scheduling when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Process every input and wait for all files to finish
    ///
    /// # Errors
    /// Only for run-level failures, e.g. a missing input path. Per-file
    /// failures are reflected in the returned summary.
    pub async fn run(&self, inputs: &[PathBuf]) -> PipelineResult<RunSummary> {
        let files = self.collect_files(inputs)?;
        let workers = self.config.workers.max(1);

        info!(files = files.len(), workers, "Starting processing");

        let (outcome_tx, outcome_rx) = mpsc::channel::<(PathBuf, TaskOutcome)>(workers * 2);

        let processor = Arc::clone(&self.processor);
        let cancel_token = self.cancel_token.clone();
        let dispatch = stream::iter(files)
            .map(move |path| {
                let processor = Arc::clone(&processor);
                let cancel_token = cancel_token.clone();
                let outcome_tx = outcome_tx.clone();

                async move {
                    let outcome = if cancel_token.is_cancelled() {
                        TaskOutcome::Cancelled
                    } else {
                        run_task(processor, path.clone()).await
                    };
                    outcome.report(&path);

                    if outcome_tx.send((path, outcome)).await.is_err() {
                        error!("Log writer stopped before all outcomes were delivered");
                    }
                }
            })
            .buffer_unordered(workers)
            .for_each(|()| futures::future::ready(()));

        let writer = write_outcomes(self.log.clone(), outcome_rx, self.config.strict_submission);

        let ((), summary) = tokio::join!(dispatch, writer);

        info!(
            submitted = summary.submitted,
            submission_errors = summary.submission_errors,
            extractor_errors = summary.extractor_errors,
            unreadable_outputs = summary.unreadable_outputs,
            already_processed = summary.already_processed,
            no_identifier = summary.no_identifier,
            cancelled = summary.cancelled,
            errors = summary.errors,
            "Run complete"
        );

        Ok(summary)
    }

    /// Validate every input, then expand them all
    ///
    /// Overlapping inputs (a directory and a file inside it) yield each file
    /// once, in first-seen order.
    fn collect_files(&self, inputs: &[PathBuf]) -> PipelineResult<Vec<PathBuf>> {
        self.scanner.validate_inputs(inputs).map_err(scan_error)?;

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for input in inputs {
            for file in self.scanner.expand(input).map_err(scan_error)? {
                if seen.insert(file.clone()) {
                    files.push(file);
                }
            }
        }
        Ok(files)
    }
}

/// Run one file on its own task so a panic stays contained to that file
async fn run_task(processor: Arc<FileProcessor>, path: PathBuf) -> TaskOutcome {
    let handle = tokio::spawn(async move { processor.process(&path).await });
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => TaskOutcome::Error {
            message: format!("worker task failed: {}", e),
        },
    }
}

/// Single writer for the processed-file log
async fn write_outcomes(
    log: FileLog,
    mut outcome_rx: mpsc::Receiver<(PathBuf, TaskOutcome)>,
    strict_submission: bool,
) -> RunSummary {
    let mut summary = RunSummary::default();

    while let Some((path, outcome)) = outcome_rx.recv().await {
        summary.add(&outcome);

        let result = match outcome.log_record(strict_submission) {
            LogRecord::Skip => Ok(()),
            LogRecord::Success => log.record(&path, None).await,
            LogRecord::Failure(reason) => log.record(&path, Some(reason)).await,
        };

        if let Err(e) = result {
            summary.log_write_failures += 1;
            log_write_error(&path, &e);
        }
    }

    summary
}

fn log_write_error(path: &Path, e: &sqlx::Error) {
    error!(file = %path.display(), error = %e, "Failed to record outcome in processed-file log");
}

fn scan_error(e: ScanError) -> PipelineError {
    match e {
        ScanError::PathNotFound(path) => PipelineError::PathNotFound(path),
        ScanError::Io(_, e) => PipelineError::Io(e),
    }
}
