//! Essentia extractor invocation
//!
//! Runs the streaming music extractor as a subprocess:
//! `<extractor> <input-path> <output-path>`.
//!
//! Exit status 0 means a feature document was written to either
//! `<output-path>` or `<output-path>.json`; which one is resolved by
//! [`resolve_output_path`](crate::services::features::resolve_output_path).
//! Any other exit status is a terminal failure for the file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

const OUTPUT_FILE_NAME: &str = "features.json";

/// Extractor invocation errors
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// Extractor ran and exited unsuccessfully (`None` when killed by a signal)
    #[error("extractor exited with status {}", display_code(.exit_code))]
    Failed { exit_code: Option<i32> },

    /// Extractor process could not be started
    #[error("failed to launch extractor: {0}")]
    Launch(#[from] std::io::Error),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// Temporary output location owned by one task
///
/// Every guard lives in its own temporary directory, so no two tasks can
/// share an output path. Dropping the guard removes both candidate output
/// files and the directory, whichever way the task ended.
#[derive(Debug)]
pub struct ScopedOutput {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl ScopedOutput {
    /// Reserve a fresh output location in the system temp directory
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("abz-").tempdir()?;
        Ok(Self::in_dir(dir))
    }

    /// Reserve a fresh output location below `parent`
    pub fn new_in(parent: &Path) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("abz-").tempdir_in(parent)?;
        Ok(Self::in_dir(dir))
    }

    fn in_dir(dir: TempDir) -> Self {
        Self {
            path: dir.path().join(OUTPUT_FILE_NAME),
            dir: Some(dir),
        }
    }

    /// Output path handed to the extractor
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Both locations the extractor may have written to
    pub fn candidates(&self) -> [PathBuf; 2] {
        [self.path.clone(), with_json_suffix(&self.path)]
    }
}

impl Drop for ScopedOutput {
    fn drop(&mut self) {
        for candidate in self.candidates() {
            if candidate.is_file() {
                if let Err(e) = std::fs::remove_file(&candidate) {
                    warn!(file = %candidate.display(), error = %e, "Failed to remove extractor output");
                }
            }
        }
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(error = %e, "Failed to remove extractor temp directory");
            }
        }
    }
}

/// `<path>.json`
pub fn with_json_suffix(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".json");
    PathBuf::from(name)
}

/// Essentia streaming extractor
#[derive(Debug, Clone)]
pub struct EssentiaExtractor {
    binary: PathBuf,
}

impl EssentiaExtractor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run the extractor on `input`, writing features to `output`
    ///
    /// Blocks the calling task (not the runtime) until the process exits.
    /// Not retried.
    pub async fn run(&self, input: &Path, output: &Path) -> Result<(), ExtractorError> {
        debug!(
            extractor = %self.binary.display(),
            input = %input.display(),
            output = %output.display(),
            "Running extractor"
        );

        let result = Command::new(&self.binary)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if result.status.success() {
            return Ok(());
        }

        debug!(
            input = %input.display(),
            stderr = %String::from_utf8_lossy(&result.stderr),
            "Extractor failed"
        );

        Err(ExtractorError::Failed {
            exit_code: result.status.code(),
        })
    }
}
