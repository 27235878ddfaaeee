//! # abz-common
//!
//! Shared code for the AcousticBrainz submission client:
//! - Configuration loading and validation
//! - Extractor build fingerprinting
//! - Common error type

pub mod config;
pub mod error;
pub mod fingerprint;

pub use config::Settings;
pub use error::{Error, Result};
