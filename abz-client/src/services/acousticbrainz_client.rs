//! AcousticBrainz submission client
//!
//! Posts low-level feature documents to `<scheme>://<host>/<mbid>/low-level`.

use abz_common::Settings;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const USER_AGENT: &str = concat!("abz-client/", env!("CARGO_PKG_VERSION"));

/// Submission errors
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Server answered with a non-2xx status
    #[error("server rejected submission with status {status}")]
    Rejected { status: u16, body: String },

    /// Request never got an answer (connection refused, timeout, ...)
    #[error("network error: {0}")]
    Network(String),
}

/// AcousticBrainz API client
#[derive(Debug, Clone)]
pub struct AcousticBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AcousticBrainzClient {
    /// Create a client for `host` (optionally `host:port`)
    pub fn new(scheme: &str, host: &str, timeout: Duration) -> Result<Self, SubmitError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: format!("{}://{}", scheme, host.trim_end_matches('/')),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SubmitError> {
        Self::new(settings.scheme(), &settings.host, settings.timeout)
    }

    /// Low-level submission endpoint for a recording
    pub fn lowlevel_url(&self, recording_id: &Uuid) -> String {
        format!("{}/{}/low-level", self.base_url, recording_id)
    }

    /// Submit a serialized feature document
    pub async fn submit_lowlevel(
        &self,
        recording_id: &Uuid,
        features: String,
    ) -> Result<(), SubmitError> {
        let url = self.lowlevel_url(recording_id);
        tracing::debug!(mbid = %recording_id, url = %url, "Submitting features");

        let response = self
            .http_client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(features)
            .send()
            .await
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
