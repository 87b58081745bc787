//! Configuration types for the summarization pipeline and the HTTP server.
//!
//! Pipeline behaviour is controlled through [`SummaryConfig`], built via its
//! [`SummaryConfigBuilder`]. The server wraps it in [`ServerConfig`] together
//! with the bind address, database URL and request limits.
//!
//! The chunking window (1000 / 200 characters) is intentionally *not* a
//! knob: see [`crate::pipeline::chunk`].

use crate::error::PdfDeckError;
use crate::retry::RetryPolicy;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default LLM provider used when nothing else is configured.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Default model for the default provider.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Largest accepted request body / upload: 32 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 32 * 1024 * 1024;

/// Configuration for one summarization pipeline invocation.
///
/// # Example
/// ```rust
/// use pdfdeck::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .model("gemini-1.5-pro")
///     .slide_range(4, 6)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_slides, 6);
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    /// If None, the provider is resolved from the environment.
    pub provider_name: Option<String>,

    /// Model identifier. If None, uses [`DEFAULT_MODEL`] for the default
    /// provider, or the provider's own default.
    pub model: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.4.
    pub temperature: f32,

    /// Maximum tokens the model may generate for the whole deck. Default: 8192.
    ///
    /// Seven slides of ~200 words plus JSON framing need roughly 2 500
    /// tokens; a response truncated mid-JSON falls back to best-effort
    /// extraction, so the limit is generous.
    pub max_tokens: usize,

    /// Fewest slides the prompt asks for. Default: 5.
    pub min_slides: usize,

    /// Most slides the prompt asks for. Default: 7. Never above
    /// [`crate::pipeline::summarize::MAX_SLIDES`].
    pub max_slides: usize,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Retries for a failed model call (transient errors only). Default: 2.
    pub max_retries: u32,

    /// Initial retry delay for model calls in milliseconds, doubled per
    /// attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Retry policy wrapped around fetch + parse. Default: a single attempt.
    pub extraction_retry: RetryPolicy,

    /// Download timeout for the PDF URL in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per model call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            provider_name: None,
            model: None,
            provider: None,
            temperature: 0.4,
            max_tokens: 8192,
            min_slides: 5,
            max_slides: 7,
            system_prompt: None,
            max_retries: 2,
            retry_backoff_ms: 500,
            extraction_retry: RetryPolicy::none(),
            download_timeout_secs: 120,
            api_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field(
                "provider",
                &self.provider.as_ref().map(|_| "<dyn LLMProvider>"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("min_slides", &self.min_slides)
            .field("max_slides", &self.max_slides)
            .field("max_retries", &self.max_retries)
            .field("extraction_retry", &self.extraction_retry)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn slide_range(mut self, min: usize, max: usize) -> Self {
        self.config.min_slides = min;
        self.config.max_slides = max;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn extraction_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.extraction_retry = policy;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, PdfDeckError> {
        let c = &self.config;
        if c.min_slides == 0 || c.min_slides > c.max_slides {
            return Err(PdfDeckError::InvalidConfig(format!(
                "slide range must satisfy 1 <= min <= max, got {}..={}",
                c.min_slides, c.max_slides
            )));
        }
        if c.max_slides > crate::pipeline::summarize::MAX_SLIDES {
            return Err(PdfDeckError::InvalidConfig(format!(
                "at most {} slides are supported, got {}",
                crate::pipeline::summarize::MAX_SLIDES,
                c.max_slides
            )));
        }
        if c.extraction_retry.max_attempts == 0 {
            return Err(PdfDeckError::InvalidConfig(
                "extraction retry needs at least one attempt".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "127.0.0.1:3000".
    pub bind: String,
    /// sqlx connection URL, e.g. "sqlite://pdfdeck.db" or "sqlite::memory:".
    pub database_url: String,
    /// Largest accepted request body in bytes. Default: [`MAX_UPLOAD_BYTES`].
    pub max_request_bytes: usize,
    /// Pipeline settings used for every request.
    pub summary: SummaryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            database_url: "sqlite://pdfdeck.db".to_string(),
            max_request_bytes: MAX_UPLOAD_BYTES as usize,
            summary: SummaryConfig::default(),
        }
    }
}
