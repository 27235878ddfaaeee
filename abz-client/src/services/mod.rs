//! Services used by the workflow

pub mod acousticbrainz_client;
pub mod features;
pub mod file_scanner;

pub use acousticbrainz_client::{AcousticBrainzClient, SubmitError};
pub use features::{FeatureError, FeatureProcessor};
pub use file_scanner::{FileScanner, ScanError};
