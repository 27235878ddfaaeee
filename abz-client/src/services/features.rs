//! Feature document post-processing
//!
//! Turns raw extractor output into a submission-ready document:
//! - stamps `metadata.version.essentia_build_sha` with the extractor fingerprint
//! - sets `metadata.audio_properties.lossless` from the codec name

use crate::extractors::essentia::with_json_suffix;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Codec names (as reported by ffmpeg) that preserve the original waveform
pub const LOSSLESS_CODECS: &[&str] = &[
    "alac",
    "ape",
    "flac",
    "shorten",
    "tak",
    "truehd",
    "tta",
    "wmalossless",
];

/// Feature document errors
///
/// All variants are recorded as an unreadable output.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Output file missing or unreadable
    #[error("failed to read extractor output {0}: {1}")]
    Read(PathBuf, std::io::Error),

    /// Output is not valid JSON
    #[error("invalid extractor output: {0}")]
    Parse(#[from] serde_json::Error),

    /// Output parsed but lacks a required field
    #[error("extractor output is missing {0}")]
    MissingField(&'static str),
}

/// Where the extractor actually wrote its output
///
/// Some extractor builds append `.json` to the requested path, so
/// `<base>.json` wins if it exists.
pub fn resolve_output_path(base: &Path) -> PathBuf {
    let suffixed = with_json_suffix(base);
    if suffixed.is_file() {
        suffixed
    } else {
        base.to_path_buf()
    }
}

/// Lossless if a known lossless codec or any raw PCM variant (`pcm_*`)
///
/// A bare `"pcm"` matches neither rule and is lossy.
pub fn is_lossless(codec: &str) -> bool {
    LOSSLESS_CODECS.contains(&codec) || codec.starts_with("pcm_")
}

/// Post-processor for one extractor build
#[derive(Debug, Clone)]
pub struct FeatureProcessor {
    build_sha: String,
}

impl FeatureProcessor {
    pub fn new(build_sha: impl Into<String>) -> Self {
        Self {
            build_sha: build_sha.into(),
        }
    }

    /// Load, annotate and serialize the document written at `output`
    pub async fn process(&self, output: &Path) -> Result<String, FeatureError> {
        let path = resolve_output_path(output);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| FeatureError::Read(path.clone(), e))?;

        let mut document: Value = serde_json::from_str(&content)?;
        self.annotate(&mut document)?;
        Ok(serde_json::to_string(&document)?)
    }

    /// Stamp provenance and losslessness into a parsed document
    pub fn annotate(&self, document: &mut Value) -> Result<(), FeatureError> {
        let metadata = document
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
            .ok_or(FeatureError::MissingField("metadata"))?;

        let codec = metadata
            .get("audio_properties")
            .and_then(|p| p.get("codec"))
            .and_then(Value::as_str)
            .ok_or(FeatureError::MissingField("metadata.audio_properties.codec"))?;
        let lossless = is_lossless(codec);

        let version = metadata
            .entry("version")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or(FeatureError::MissingField("metadata.version"))?;
        version.insert(
            "essentia_build_sha".to_string(),
            Value::String(self.build_sha.clone()),
        );

        if let Some(properties) = metadata
            .get_mut("audio_properties")
            .and_then(Value::as_object_mut)
        {
            properties.insert("lossless".to_string(), Value::Bool(lossless));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const SHA: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    fn document(codec: &str) -> Value {
        json!({
            "lowlevel": { "average_loudness": 0.9 },
            "metadata": {
                "version": { "essentia": "2.1-beta2", "essentia_build_sha": "stale" },
                "audio_properties": { "codec": codec, "length": 245.3 }
            }
        })
    }

    #[test]
    fn test_codec_classification() {
        assert!(is_lossless("flac"));
        assert!(is_lossless("alac"));
        assert!(is_lossless("wmalossless"));
        assert!(!is_lossless("mp3"));
        assert!(!is_lossless("vorbis"));
        assert!(is_lossless("pcm_s16le"));
        assert!(is_lossless("pcm_f32be"));
    }

    #[test]
    fn test_bare_pcm_is_lossy() {
        assert!(!is_lossless("pcm"));
        assert!(!is_lossless("pcmx"));
    }

    #[test]
    fn test_codec_match_is_case_sensitive() {
        assert!(!is_lossless("FLAC"));
    }

    #[test]
    fn test_annotate_overwrites_build_sha() {
        let processor = FeatureProcessor::new(SHA);
        let mut doc = document("flac");
        processor.annotate(&mut doc).unwrap();

        assert_eq!(doc["metadata"]["version"]["essentia_build_sha"], SHA);
        assert_eq!(doc["metadata"]["version"]["essentia"], "2.1-beta2");
        assert_eq!(doc["metadata"]["audio_properties"]["lossless"], true);
        assert_eq!(doc["lowlevel"]["average_loudness"], 0.9);
    }

    #[test]
    fn test_annotate_creates_version_section() {
        let processor = FeatureProcessor::new(SHA);
        let mut doc = json!({ "metadata": { "audio_properties": { "codec": "mp3" } } });
        processor.annotate(&mut doc).unwrap();

        assert_eq!(doc["metadata"]["version"]["essentia_build_sha"], SHA);
        assert_eq!(doc["metadata"]["audio_properties"]["lossless"], false);
    }

    #[test]
    fn test_annotate_missing_codec() {
        let processor = FeatureProcessor::new(SHA);
        let mut doc = json!({ "metadata": { "audio_properties": {} } });
        assert!(matches!(
            processor.annotate(&mut doc),
            Err(FeatureError::MissingField(_))
        ));

        let mut doc = json!([1, 2, 3]);
        assert!(matches!(
            processor.annotate(&mut doc),
            Err(FeatureError::MissingField("metadata"))
        ));
    }

    #[test]
    fn test_resolve_prefers_json_suffix() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("features.json");

        assert_eq!(resolve_output_path(&base), base);

        fs::write(&base, b"{}").unwrap();
        assert_eq!(resolve_output_path(&base), base);

        let suffixed = with_json_suffix(&base);
        fs::write(&suffixed, b"{}").unwrap();
        assert_eq!(resolve_output_path(&base), suffixed);
    }

    #[tokio::test]
    async fn test_process_reads_suffixed_output() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("features.json");
        fs::write(with_json_suffix(&base), document("pcm_s24le").to_string()).unwrap();

        let text = FeatureProcessor::new(SHA).process(&base).await.unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(doc["metadata"]["version"]["essentia_build_sha"], SHA);
        assert_eq!(doc["metadata"]["audio_properties"]["lossless"], true);
    }

    #[tokio::test]
    async fn test_process_empty_output() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("features.json");
        fs::write(&base, b"").unwrap();

        let result = FeatureProcessor::new(SHA).process(&base).await;
        assert!(matches!(result, Err(FeatureError::Parse(_))));
    }

    #[tokio::test]
    async fn test_process_missing_output() {
        let dir = TempDir::new().unwrap();
        let result = FeatureProcessor::new(SHA)
            .process(&dir.path().join("features.json"))
            .await;
        assert!(matches!(result, Err(FeatureError::Read(_, _))));
    }
}
