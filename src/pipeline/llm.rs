//! LLM interaction: the [`SummaryModel`] seam and its edgequake-llm backend.
//!
//! The summarizer only needs "send a system prompt and a user prompt, get
//! text back". That is captured by [`SummaryModel`] so the pipeline and the
//! HTTP layer can be driven by a scripted model in tests, while production
//! uses [`LlmSummaryModel`] over any `edgequake_llm` provider.
//!
//! ## Provider resolution
//!
//! [`resolve_provider`] walks from most specific to least specific:
//!
//! 1. **Pre-built provider** (`config.provider`), used as-is.
//! 2. **Named provider + model** (`config.provider_name`).
//! 3. **Environment pair** `PDFDECK_LLM_PROVIDER` + `PDFDECK_MODEL`, when both
//!    are set and non-empty.
//! 4. **Gemini key present** (`GEMINI_API_KEY`): the default provider and
//!    model, so the out-of-the-box behaviour is Gemini Flash.
//! 5. **Full auto-detection** via `ProviderFactory::from_env`.

use crate::config::{SummaryConfig, DEFAULT_MODEL, DEFAULT_PROVIDER};
use crate::error::PdfDeckError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Raw text returned by one model call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Anything that can turn a system + user prompt into text.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<ModelReply, PdfDeckError>;
}

/// [`SummaryModel`] backed by an `edgequake_llm` provider.
pub struct LlmSummaryModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl std::fmt::Debug for LlmSummaryModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSummaryModel")
            .field("provider", &"<dyn LLMProvider>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmSummaryModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &SummaryConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    /// Resolve a provider from `config` (see module docs) and wrap it.
    pub fn from_config(config: &SummaryConfig) -> Result<Self, PdfDeckError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }
}

/// Build `CompletionOptions` from the summary config.
fn build_options(config: &SummaryConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl SummaryModel for LlmSummaryModel {
    async fn generate(&self, system: &str, prompt: &str) -> Result<ModelReply, PdfDeckError> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];
        let call = self.provider.chat(&messages, Some(&self.options));
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => {
                return Err(PdfDeckError::Summarization {
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(PdfDeckError::Summarization {
                    message: format!("model call timed out after {}s", self.timeout.as_secs()),
                })
            }
        };

        debug!(
            "Model reply: {} input tokens, {} output tokens, {} chars",
            response.prompt_tokens,
            response.completion_tokens,
            response.content.len()
        );

        Ok(ModelReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens as usize,
            completion_tokens: response.completion_tokens as usize,
        })
    }
}

// ── Provider resolution ──────────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PdfDeckError> {
    debug!("Creating provider {} with model {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PdfDeckError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Model to use when only a provider name is known.
fn model_for(provider_name: &str, configured: Option<&str>) -> String {
    match configured {
        Some(m) => m.to_string(),
        None if provider_name == DEFAULT_PROVIDER => DEFAULT_MODEL.to_string(),
        None => String::new(),
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
pub fn resolve_provider(config: &SummaryConfig) -> Result<Arc<dyn LLMProvider>, PdfDeckError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = model_for(name, config.model.as_deref());
        return create_provider(name, &model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("PDFDECK_LLM_PROVIDER"),
        std::env::var("PDFDECK_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            let model = model_for(DEFAULT_PROVIDER, config.model.as_deref());
            return create_provider(DEFAULT_PROVIDER, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PdfDeckError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_gets_default_model() {
        assert_eq!(model_for("gemini", None), "gemini-1.5-flash");
        assert_eq!(
            model_for("gemini", Some("gemini-1.5-pro")),
            "gemini-1.5-pro"
        );
        assert_eq!(model_for("openai", None), "");
    }

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&SummaryConfig::default());
        assert_eq!(opts.temperature, Some(0.4));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[test]
    fn build_options_follow_builder() {
        let config = SummaryConfig::builder().temperature(0.2).max_tokens(1000).build().unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(1000));
    }
}
