//! Single-file processing
//!
//! Strictly sequential per file:
//! log check → recording id → extractor → post-process → submit.
//! The processed-file log is only read here; writing is left to the
//! pipeline's log writer.

use super::TaskOutcome;
use crate::db::FileLog;
use crate::extractors::essentia::{EssentiaExtractor, ExtractorError, ScopedOutput};
use crate::extractors::recording_id::IdentifierSource;
use crate::services::acousticbrainz_client::{AcousticBrainzClient, SubmitError};
use crate::services::features::FeatureProcessor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Runs one file through the whole workflow
pub struct FileProcessor {
    log: FileLog,
    identifiers: Arc<dyn IdentifierSource>,
    extractor: EssentiaExtractor,
    features: FeatureProcessor,
    client: AcousticBrainzClient,
    temp_root: Option<PathBuf>,
    cancel_token: CancellationToken,
}

impl FileProcessor {
    pub fn new(
        log: FileLog,
        identifiers: Arc<dyn IdentifierSource>,
        extractor: EssentiaExtractor,
        features: FeatureProcessor,
        client: AcousticBrainzClient,
    ) -> Self {
        Self {
            log,
            identifiers,
            extractor,
            features,
            client,
            temp_root: None,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Place extractor outputs below `dir` instead of the system temp dir
    pub fn with_temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// Shutdown token; an extractor killed by a signal after shutdown was
    /// requested counts as cancelled rather than failed
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Process `path` to a terminal outcome
    pub async fn process(&self, path: &Path) -> TaskOutcome {
        info!(file = %path.display(), "Processing file");

        match self.log.is_processed(path).await {
            Ok(true) => return TaskOutcome::AlreadyProcessed,
            Ok(false) => {}
            Err(e) => {
                return TaskOutcome::Error {
                    message: format!("failed to query processed-file log: {}", e),
                }
            }
        }

        let identifiers = Arc::clone(&self.identifiers);
        let tag_path = path.to_path_buf();
        let recording_id =
            match tokio::task::spawn_blocking(move || identifiers.recording_id(&tag_path)).await {
                Ok(Some(id)) => id,
                Ok(None) => return TaskOutcome::NoIdentifier,
                Err(e) => {
                    return TaskOutcome::Error {
                        message: format!("tag reader failed: {}", e),
                    }
                }
            };
        debug!(file = %path.display(), mbid = %recording_id, "Has recording id");

        let output = match self.scoped_output() {
            Ok(output) => output,
            Err(e) => {
                return TaskOutcome::Error {
                    message: format!("failed to create temporary output: {}", e),
                }
            }
        };

        match self.extractor.run(path, output.path()).await {
            Ok(()) => {}
            Err(ExtractorError::Failed { exit_code: None }) if self.cancel_token.is_cancelled() => {
                // Interrupt reaches the whole process group, extractor included
                return TaskOutcome::Cancelled;
            }
            Err(ExtractorError::Failed { exit_code }) => {
                return TaskOutcome::ExtractorFailed { exit_code };
            }
            Err(e @ ExtractorError::Launch(_)) => {
                error!(
                    extractor = %self.extractor.binary().display(),
                    error = %e,
                    "Extractor could not be started"
                );
                return TaskOutcome::ExtractorFailed { exit_code: None };
            }
        }

        let features = match self.features.process(output.path()).await {
            Ok(features) => features,
            Err(e) => {
                return TaskOutcome::OutputUnreadable {
                    message: e.to_string(),
                }
            }
        };
        drop(output);

        match self.client.submit_lowlevel(&recording_id, features).await {
            Ok(()) => TaskOutcome::Submitted { recording_id },
            Err(SubmitError::Rejected { status, body }) => {
                TaskOutcome::SubmissionRejected { status, body }
            }
            Err(SubmitError::Network(message)) => TaskOutcome::SubmissionFailed { message },
        }
    }

    fn scoped_output(&self) -> std::io::Result<ScopedOutput> {
        match &self.temp_root {
            Some(dir) => ScopedOutput::new_in(dir),
            None => ScopedOutput::new(),
        }
    }
}
