//! Wire types and HTTP transports for the OCR and completion services.
//!
//! The clients in [`super::ocr`] and [`super::completion`] never talk to
//! reqwest directly. They go through [`OcrTransport`] and
//! [`CompletionTransport`], which [`MistralTransport`] implements over HTTPS
//! and which tests implement with in-memory fakes.

use crate::config::ServiceConfig;
use crate::error::Pdf2LlmError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::debug;

/// Raw response body chunks of a streaming call.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Pdf2LlmError>> + Send>>;

// ── OCR wire types ───────────────────────────────────────────────────────

/// Body of `POST /ocr`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrRequest {
    pub model: String,
    pub document: OcrDocument,
}

/// Document reference inside an [`OcrRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OcrDocument {
    DocumentUrl { document_url: String },
}

/// Body returned by `POST /ocr`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OcrResponse {
    #[serde(default)]
    pub pages: Vec<OcrPage>,
}

/// One recognised page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OcrPage {
    /// 0-indexed page position, when the service reports it.
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub markdown: String,
}

// ── Completion wire types ────────────────────────────────────────────────

/// Body of `POST /agents/completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentCompletionRequest {
    pub agent_id: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

// ── Transport traits ─────────────────────────────────────────────────────

/// Sends one OCR request and returns the parsed response.
#[async_trait]
pub trait OcrTransport: Send + Sync {
    async fn process(&self, request: &OcrRequest) -> Result<OcrResponse, Pdf2LlmError>;
}

/// Opens one streaming completion and returns its raw body.
///
/// Errors returned here happen before the first byte; errors inside the
/// stream happen mid-body.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn open_stream(&self, request: &AgentCompletionRequest)
        -> Result<ByteStream, Pdf2LlmError>;
}

// ── Mistral over HTTPS ───────────────────────────────────────────────────

/// reqwest-backed transport for the Mistral OCR and agents endpoints.
#[derive(Clone)]
pub struct MistralTransport {
    client: reqwest::Client,
    config: ServiceConfig,
}

impl fmt::Debug for MistralTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MistralTransport")
            .field("config", &self.config)
            .finish()
    }
}

impl MistralTransport {
    /// Build a transport. Fails with [`Pdf2LlmError::Configuration`] before
    /// any network activity when credentials are missing.
    pub fn new(config: &ServiceConfig) -> Result<Self, Pdf2LlmError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| Pdf2LlmError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.config.endpoint(path))
            .bearer_auth(&self.config.api_key)
    }
}

#[async_trait]
impl OcrTransport for MistralTransport {
    async fn process(&self, request: &OcrRequest) -> Result<OcrResponse, Pdf2LlmError> {
        debug!("POST /ocr model={}", request.model);
        let response = self
            .post("ocr")
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .json(request)
            .send()
            .await
            .map_err(|e| Pdf2LlmError::ocr(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Pdf2LlmError::OcrService {
                status: Some(status.as_u16()),
                message: error_detail(&body),
            });
        }

        response
            .json::<OcrResponse>()
            .await
            .map_err(|e| Pdf2LlmError::ocr(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl CompletionTransport for MistralTransport {
    async fn open_stream(
        &self,
        request: &AgentCompletionRequest,
    ) -> Result<ByteStream, Pdf2LlmError> {
        debug!("POST /agents/completions agent={}", request.agent_id);
        let response = self
            .post("agents/completions")
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| Pdf2LlmError::answer(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Pdf2LlmError::AnswerService {
                status: Some(status.as_u16()),
                message: error_detail(&body),
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Pdf2LlmError::answer(format!("Stream error: {e}"))));
        Ok(Box::pin(stream))
    }
}

/// Pull a readable message out of an error body.
///
/// Mistral returns `{"message": "..."}` or `{"detail": ...}`; anything else is
/// passed through, truncated.
fn error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<serde_json::Value>,
        detail: Option<serde_json::Value>,
    }

    let from_json = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.detail))
        .map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });

    match from_json {
        Some(msg) => msg,
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.chars().take(300).collect(),
    }
}
