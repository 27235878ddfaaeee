//! Configuration loading and validation
//!
//! Resolution order:
//! 1. Explicit `--config` path (must exist)
//! 2. `<config_dir>/acousticbrainz/config.toml`
//! 3. `~/.acousticbrainz.toml`
//! 4. Compiled defaults
//!
//! The raw TOML is validated once into an immutable [`Settings`] that the
//! pipeline components share.

use crate::fingerprint::calculate_build_sha;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_HOST: &str = "acousticbrainz.org";
const DEFAULT_EXTRACTOR: &str = "streaming_extractor_music";
const DEFAULT_EXTENSIONS: &[&str] = &["mp3", "mp2", "m4a", "ogg", "oga", "flac", "mpc", "wav"];
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raw configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub acousticbrainz: ServerSection,
    pub essentia: EssentiaSection,
    pub database: DatabaseSection,
}

/// `[acousticbrainz]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Submission host, optionally with port (`localhost:8080`)
    pub host: String,
    /// Use https instead of plain http
    pub https: bool,
    /// Audio file extensions eligible for processing
    pub extensions: Vec<String>,
    /// HTTP request timeout
    pub timeout_secs: u64,
    /// Leave files unrecorded when submission fails so the next run retries them
    pub strict_submission: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            https: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            strict_submission: false,
        }
    }
}

/// `[essentia]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EssentiaSection {
    /// Path to the streaming music extractor binary
    pub path: PathBuf,
    /// Directory for extractor output files (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,
}

impl Default for EssentiaSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_EXTRACTOR),
            temp_dir: None,
        }
    }
}

/// `[database]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file holding the processed-file log
    pub path: Option<PathBuf>,
}

/// Validated, immutable runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub https: bool,
    pub essentia_path: PathBuf,
    /// SHA-1 of the extractor binary at `essentia_path`
    pub essentia_build_sha: String,
    pub temp_dir: Option<PathBuf>,
    /// Lowercase, without leading dot
    pub extensions: Vec<String>,
    pub database_path: PathBuf,
    pub timeout: Duration,
    pub strict_submission: bool,
}

impl Settings {
    /// Load the config file (if any) and validate it
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let toml_config = load_toml_config(explicit)?;
        Self::from_toml(toml_config)
    }

    /// Validate raw configuration
    ///
    /// Fails if the extractor binary cannot be found, since every
    /// submission must carry the fingerprint of the binary that ran.
    pub fn from_toml(config: TomlConfig) -> Result<Self> {
        let host = config.acousticbrainz.host.trim().to_string();
        if host.is_empty() {
            return Err(Error::Config("acousticbrainz.host must not be empty".to_string()));
        }

        let extensions = normalize_extensions(&config.acousticbrainz.extensions);
        if extensions.is_empty() {
            return Err(Error::Config(
                "acousticbrainz.extensions must list at least one extension".to_string(),
            ));
        }

        let mut essentia_path = config.essentia.path;
        if !essentia_path.is_absolute() {
            essentia_path = std::env::current_dir()?.join(essentia_path);
        }
        if !essentia_path.is_file() {
            return Err(Error::Config(format!(
                "Cannot find the extractor at {}",
                essentia_path.display()
            )));
        }

        let essentia_build_sha = calculate_build_sha(&essentia_path)?;
        info!(
            extractor = %essentia_path.display(),
            build_sha = %essentia_build_sha,
            "Extractor fingerprint computed"
        );

        let database_path = match config.database.path {
            Some(path) => path,
            None => default_database_path(),
        };

        Ok(Self {
            host,
            https: config.acousticbrainz.https,
            essentia_path,
            essentia_build_sha,
            temp_dir: config.essentia.temp_dir,
            extensions,
            database_path,
            timeout: Duration::from_secs(config.acousticbrainz.timeout_secs.max(1)),
            strict_submission: config.acousticbrainz.strict_submission,
        })
    }

    /// URL scheme for submissions
    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }
}

/// Read and parse the TOML configuration
///
/// An explicit path must exist; otherwise the first existing default
/// location is used, falling back to compiled defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path.to_path_buf())
        }
        None => default_config_locations().into_iter().find(|p| p.is_file()),
    };

    let Some(path) = path else {
        debug!("No config file found, using defaults");
        return Ok(TomlConfig::default());
    };

    info!(path = %path.display(), "Loading config file");
    let content = std::fs::read_to_string(&path)?;
    parse_toml_config(&content).map_err(|message| Error::ConfigParse { path, message })
}

/// Parse TOML text into a [`TomlConfig`]
pub fn parse_toml_config(content: &str) -> std::result::Result<TomlConfig, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}

fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("acousticbrainz").join("config.toml"));
    }
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".acousticbrainz.toml"));
    }
    locations
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("acousticbrainz"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filelog.db")
}

fn normalize_extensions(raw: &[String]) -> Vec<String> {
    let mut extensions: Vec<String> = raw
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();
    extensions.sort();
    extensions.dedup();
    extensions
}
