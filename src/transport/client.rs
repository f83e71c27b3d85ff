use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::wire::{self, InferenceRequest};
use crate::error::AnalysisError;
use crate::model::{AnalysisResult, EncodedAudio};

/// Anything that can turn encoded audio into an analysis.
///
/// Implementations classify failures themselves: transport problems are
/// `NetworkFailure`, explicit refusals `BackendError`, and schema
/// violations `MalformedResponse`.
pub trait Backend {
    fn analyze(&self, audio: &EncodedAudio) -> Result<AnalysisResult, AnalysisError>;
}

/// Blocking HTTP client for the inference endpoint.
pub struct HttpBackend {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cnnscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }
}

impl Backend for HttpBackend {
    fn analyze(&self, audio: &EncodedAudio) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .json(&InferenceRequest { audio })
            .send()
            .map_err(|e| AnalysisError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AnalysisError::NetworkFailure(format!("reading response body: {}", e)))?;

        log::info!(
            "Backend replied {} ({} bytes) in {:.1}s",
            status,
            body.len(),
            start.elapsed().as_secs_f32()
        );

        if !status.is_success() {
            return Err(AnalysisError::BackendError(failure_message(status, &body)));
        }
        wire::parse_response(&body)
    }
}

fn failure_message(status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| wire::error_message(&v))
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    if detail.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, detail)
    }
}
