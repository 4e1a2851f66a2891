//! Configuration for the OCR and completion services.
//!
//! Everything the transports and the pipeline need lives in one
//! [`ServiceConfig`], built through [`ServiceConfigBuilder`]. The API key and
//! the agent id are mandatory: [`ServiceConfigBuilder::build`] refuses to
//! produce a config without them, so no request is ever attempted with
//! missing credentials.

use crate::error::Pdf2LlmError;
use std::fmt;

/// Default Mistral API root.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Default OCR model.
pub const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "MISTRAL_API_KEY";

/// Environment variable holding the agent identifier.
pub const ENV_AGENT_ID: &str = "MISTRAL_AGENT_ID";

/// Optional environment override for the API root.
pub const ENV_BASE_URL: &str = "MISTRAL_BASE_URL";

/// Optional environment override for the OCR model.
pub const ENV_OCR_MODEL: &str = "MISTRAL_OCR_MODEL";

/// Configuration shared by the OCR client, the answer client and the pipeline.
///
/// # Example
/// ```rust
/// use pdf2llm::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .api_key("sk-test")
///     .agent_id("ag:1234")
///     .concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Bearer token sent to both services.
    pub api_key: String,

    /// Agent that answers questions.
    pub agent_id: String,

    /// API root, without trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// OCR model identifier. Default: [`DEFAULT_OCR_MODEL`].
    pub ocr_model: String,

    /// Whole-request timeout for OCR calls in seconds. Default: 120.
    ///
    /// Not applied to answer streams, which may legitimately run longer.
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout for every call in seconds. Default: 30.
    pub connect_timeout_secs: u64,

    /// Maximum OCR calls in flight during one pipeline run. Default: 1.
    ///
    /// Documents are converted one at a time unless raised. Completion is
    /// still reported in upload order at any value.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            agent_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            ocr_model: DEFAULT_OCR_MODEL.to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 30,
            concurrency: 1,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_key", &redact(&self.api_key))
            .field("agent_id", &self.agent_id)
            .field("base_url", &self.base_url)
            .field("ocr_model", &self.ocr_model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Builder pre-filled from `MISTRAL_*` environment variables.
    ///
    /// Unset variables leave the defaults in place; call
    /// [`ServiceConfigBuilder::build`] to validate.
    pub fn builder_from_env() -> ServiceConfigBuilder {
        let mut builder = Self::builder();
        if let Some(key) = non_empty_env(ENV_API_KEY) {
            builder = builder.api_key(key);
        }
        if let Some(agent) = non_empty_env(ENV_AGENT_ID) {
            builder = builder.agent_id(agent);
        }
        if let Some(url) = non_empty_env(ENV_BASE_URL) {
            builder = builder.base_url(url);
        }
        if let Some(model) = non_empty_env(ENV_OCR_MODEL) {
            builder = builder.ocr_model(model);
        }
        builder
    }

    /// Build and validate a config from the environment alone.
    pub fn from_env() -> Result<Self, Pdf2LlmError> {
        Self::builder_from_env().build()
    }

    /// Check the invariants [`ServiceConfigBuilder::build`] enforces.
    ///
    /// Fields are public, so transports re-validate on construction.
    pub fn validate(&self) -> Result<(), Pdf2LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(Pdf2LlmError::Configuration(format!(
                "API key is missing. Set {ENV_API_KEY} or pass --api-key."
            )));
        }
        if self.agent_id.trim().is_empty() {
            return Err(Pdf2LlmError::Configuration(format!(
                "Agent id is missing. Set {ENV_AGENT_ID} or pass --agent-id."
            )));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Pdf2LlmError::Configuration(format!(
                "Base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.ocr_model.trim().is_empty() {
            return Err(Pdf2LlmError::Configuration("OCR model must not be empty".into()));
        }
        if self.concurrency == 0 {
            return Err(Pdf2LlmError::Configuration(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(())
    }

    /// `base_url` joined with an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn agent_id(mut self, agent: impl Into<String>) -> Self {
        self.config.agent_id = agent.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, Pdf2LlmError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
