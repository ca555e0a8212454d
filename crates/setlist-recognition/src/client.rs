// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::Result;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const RECOGNITION_API_BASE: &str = "https://api.songdetect.example.com/v1";
const USER_AGENT: &str = concat!("Setlist/", env!("CARGO_PKG_VERSION"));

/// One recognized track returned by the fingerprint service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackMatch {
    /// Artist name.
    pub artist: String,
    /// Track title.
    pub title: String,
    /// Offset into the submitted window where the match was detected (seconds).
    pub offset_secs: f64,
}

/// Fingerprint-recognition API client.
///
/// Performs a single lookup per staged window. No internal retry (the
/// retry budget lives in the chunk processor) and no deduplication,
/// which is policy layered above using the ledger.
#[derive(Debug, Clone)]
pub struct RecognitionClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl RecognitionClient {
    /// Create a new recognition client with default settings.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::builder(api_token).build()
    }

    /// Create a client builder for custom configuration.
    pub fn builder(api_token: impl Into<String>) -> RecognitionClientBuilder {
        RecognitionClientBuilder::new(api_token)
    }

    /// Submit one staged window artifact for identification.
    ///
    /// Returns `Ok(None)` when the service answers but finds no match.
    /// Transport, authentication and protocol failures are `Err` values;
    /// the caller decides whether to retry.
    pub async fn identify(&self, artifact: &Path) -> Result<Option<TrackMatch>> {
        let bytes = tokio::fs::read(artifact).await?;
        if bytes.is_empty() {
            return Err(crate::RecognitionError::EmptyArtifact(
                artifact.display().to_string(),
            ));
        }

        let mut url = Url::parse(&format!("{}/recognize", self.base_url))
            .map_err(|e| crate::RecognitionError::InvalidResponse(e.to_string()))?;
        url.query_pairs_mut().append_pair("token", &self.api_token);

        trace!(target: "recognition", "lookup: {} ({} bytes)", url, bytes.len());

        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "window.wav".to_string());
        let form = Form::new().part(
            "file",
            Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("audio/wav")?,
        );

        let response = self
            .client
            .post(url.as_str())
            .header("User-Agent", USER_AGENT)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!(target: "recognition", "service response status: {}", status);

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(crate::RecognitionError::ServiceError(format!(
                "HTTP {}: {}",
                status, message
            )));
        }

        let body = response.text().await?;
        trace!(target: "recognition", "service response: {}", body);

        let api_response: RecognizeResponse = serde_json::from_str(&body)?;

        if !api_response.status.eq_ignore_ascii_case("ok") {
            return Err(crate::RecognitionError::ServiceError(
                api_response
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        Ok(api_response.result.map(|m| TrackMatch {
            artist: m.artist,
            title: m.title,
            offset_secs: m.offset_ms as f64 / 1000.0,
        }))
    }
}

/// Recognition API response structure.
#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    status: String,
    #[serde(default)]
    result: Option<ServiceMatch>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceMatch {
    artist: String,
    title: String,
    /// Match offset within the submitted audio, in milliseconds.
    #[serde(default)]
    offset_ms: u64,
}

/// Builder for the recognition client.
#[derive(Debug)]
pub struct RecognitionClientBuilder {
    api_token: String,
    base_url: String,
    timeout: Duration,
}

impl RecognitionClientBuilder {
    /// Create a new builder.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: RECOGNITION_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom base URL (useful for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the recognition client.
    ///
    /// # Errors
    /// Returns an error if the base URL is not a valid URL or the HTTP
    /// client cannot be created.
    pub fn build(self) -> Result<RecognitionClient> {
        Url::parse(&self.base_url).map_err(|e| {
            crate::RecognitionError::ServiceError(format!("Invalid base URL: {}", e))
        })?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(RecognitionClient {
            client,
            base_url: self.base_url,
            api_token: self.api_token,
        })
    }
}
