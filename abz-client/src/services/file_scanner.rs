//! Audio file discovery
//!
//! Resolves command-line inputs into normalized absolute file paths. Files
//! are taken as given; directories are walked recursively and filtered by
//! extension. Symlinked files are included, symlinked directories are not
//! descended into.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("{0} does not exist")]
    PathNotFound(PathBuf),

    /// Path could not be made absolute
    #[error("I/O error for {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

/// Extension-filtered file scanner
#[derive(Debug, Clone)]
pub struct FileScanner {
    extensions: Vec<String>,
}

impl FileScanner {
    /// `extensions` are lowercase and without leading dot
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Check every input exists before anything is scanned
    pub fn validate_inputs(&self, inputs: &[PathBuf]) -> Result<(), ScanError> {
        match inputs.iter().find(|p| !p.exists()) {
            Some(missing) => Err(ScanError::PathNotFound(missing.clone())),
            None => Ok(()),
        }
    }

    /// Expand one input into the absolute paths of the files to process
    pub fn expand(&self, input: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !input.exists() {
            return Err(ScanError::PathNotFound(input.to_path_buf()));
        }

        let absolute = std::path::absolute(input)
            .map(|path| normalize_path(&path))
            .map_err(|e| ScanError::Io(input.to_path_buf(), e))?;

        if absolute.is_dir() {
            Ok(self.scan_directory(&absolute))
        } else {
            Ok(vec![absolute])
        }
    }

    /// Recursively list files below `root` with an allowed extension
    pub fn scan_directory(&self, root: &Path) -> Vec<PathBuf> {
        info!(directory = %root.display(), "Processing directory");

        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    if self.is_candidate(&entry) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    // Unreadable entries; keep scanning
                    warn!("Error accessing entry: {}", e);
                }
            }
        }

        debug!(directory = %root.display(), count = files.len(), "Directory scan complete");
        files
    }

    /// Regular file, or symlink to one, with an allowed extension
    fn is_candidate(&self, entry: &walkdir::DirEntry) -> bool {
        let is_file = if entry.path_is_symlink() {
            entry.path().is_file()
        } else {
            entry.file_type().is_file()
        };
        is_file && self.matches_extension(entry.path())
    }

    /// Case-insensitive extension check against the allow-list
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
    }
}

/// Lexically resolve `.` and `..` in an absolute path
///
/// Symlinks are not resolved, so `link/../x` becomes `x` even if `link`
/// points elsewhere.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
