//! abz-client library interface
//!
//! Extracts low-level audio features from a music collection and submits
//! them to AcousticBrainz, keeping a log of processed files so repeated runs
//! only handle new files.

pub mod db;
pub mod error;
pub mod extractors;
pub mod services;
pub mod workflow;

pub use crate::error::{PipelineError, PipelineResult};

use abz_common::Settings;
use std::sync::Arc;

/// Build a pipeline wired to the real tag reader, extractor and server
pub async fn build_pipeline(
    settings: &Settings,
    config: workflow::PipelineConfig,
) -> PipelineResult<workflow::Pipeline> {
    build_pipeline_with(
        settings,
        config,
        Arc::new(extractors::TagIdentifierSource::new()),
    )
    .await
}

/// Build a pipeline with a custom recording id source
pub async fn build_pipeline_with(
    settings: &Settings,
    config: workflow::PipelineConfig,
    identifiers: Arc<dyn extractors::IdentifierSource>,
) -> PipelineResult<workflow::Pipeline> {
    let log = db::FileLog::open(&settings.database_path).await?;
    let client = services::AcousticBrainzClient::from_settings(settings)
        .map_err(|e| abz_common::Error::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut processor = workflow::FileProcessor::new(
        log.clone(),
        identifiers,
        extractors::EssentiaExtractor::new(&settings.essentia_path),
        services::FeatureProcessor::new(&settings.essentia_build_sha),
        client,
    );
    if let Some(dir) = &settings.temp_dir {
        processor = processor.with_temp_root(dir);
    }

    Ok(workflow::Pipeline::new(
        config,
        services::FileScanner::new(settings.extensions.clone()),
        processor,
        log,
    ))
}
