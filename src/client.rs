//! Remote tutor pipeline client
//!
//! Three request/response operations against the tutor backend: transcribe,
//! converse, synthesize. Each call either succeeds, fails with the service's
//! status and body, or fails because the exchange could not complete. No
//! retries happen here; a failed call aborts the turn upstream.

use async_trait::async_trait;

use crate::session::Scenario;
use crate::voice::Clip;
use crate::{Error, Result};

/// Default backend address for local development
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Response from the transcription endpoint
#[derive(serde::Deserialize)]
struct TranscribeResponse {
    text: String,
}

/// Request body for the dialogue endpoint
#[derive(serde::Serialize)]
struct ConverseRequest<'a> {
    user_text: &'a str,
    scenario: &'a str,
}

/// Response from the dialogue endpoint
#[derive(serde::Deserialize)]
struct ConverseResponse {
    reply: String,
}

/// Backend health report
#[derive(Debug, serde::Deserialize)]
pub struct HealthInfo {
    /// Overall status string, "ok" when healthy
    pub status: String,
    /// Model identifiers the backend is configured with
    #[serde(default)]
    pub models: HealthModels,
}

/// Model identifiers reported by the backend
#[derive(Debug, Default, serde::Deserialize)]
pub struct HealthModels {
    /// Speech-to-text model
    #[serde(default)]
    pub stt: String,
    /// Dialogue model
    #[serde(default)]
    pub chat: String,
}

/// The remote pipeline the session controller drives
///
/// Abstracted as a trait so the state machine can be tested without a
/// network. The production implementation is [`HttpTutorClient`].
#[async_trait]
pub trait TutorBackend {
    /// Transcribe a recorded clip; an empty transcript is a valid response
    ///
    /// # Errors
    ///
    /// Returns error if the service rejects the clip or the exchange fails
    async fn transcribe(&self, clip: Clip) -> Result<String>;

    /// Send user text plus the active scenario, returning the tutor's reply
    ///
    /// # Errors
    ///
    /// Returns error if the service rejects the request or the exchange fails
    async fn converse(&self, text: &str, scenario: Scenario) -> Result<String>;

    /// Synthesize speech for the reply, returning encoded audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if the service rejects the text or the exchange fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// HTTP client for the tutor backend
pub struct HttpTutorClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTutorClient {
    /// Create a client against the given base address
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Query the backend health endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or unhealthy
    pub async fn health(&self) -> Result<HealthInfo> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TutorBackend for HttpTutorClient {
    async fn transcribe(&self, clip: Clip) -> Result<String> {
        tracing::debug!(
            bytes = clip.bytes.len(),
            ms = clip.duration.as_millis(),
            "submitting clip for transcription"
        );

        let part = reqwest::multipart::Part::bytes(clip.bytes)
            .file_name("clip.wav")
            .mime_str(clip.mime)
            .map_err(|e| Error::Audio(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("audio", part);

        let response = self
            .client
            .post(format!("{}/stt", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription rejected");
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let result: TranscribeResponse = response.json().await?;
        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    async fn converse(&self, text: &str, scenario: Scenario) -> Result<String> {
        tracing::debug!(%scenario, "requesting tutor reply");

        let request = ConverseRequest {
            user_text: text,
            scenario: scenario.as_wire(),
        };

        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "dialogue request rejected");
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let result: ConverseResponse = response.json().await?;
        tracing::info!(reply = %result.reply, "tutor reply received");
        Ok(result.reply)
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(chars = text.len(), "requesting speech synthesis");

        let form = reqwest::multipart::Form::new().text("text", text.to_string());

        let response = self
            .client
            .post(format!("{}/tts", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "synthesis rejected");
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), "synthesized audio received");
        Ok(audio.to_vec())
    }
}
