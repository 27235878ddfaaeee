//! Per-file extractors
//!
//! - [`recording_id`]: MusicBrainz recording id from embedded tags
//! - [`essentia`]: external feature extractor subprocess

pub mod essentia;
pub mod recording_id;

pub use essentia::{EssentiaExtractor, ExtractorError, ScopedOutput};
pub use recording_id::{IdentifierSource, TagIdentifierSource};
