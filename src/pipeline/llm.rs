//! Model interaction: one request in, raw text out.
//!
//! The extraction and validation cycles talk to models through the
//! [`ModelClient`] trait rather than a provider type. Production code wraps an
//! `edgequake_llm` provider in [`ProviderClient`]; tests substitute canned
//! clients. All prompt engineering lives in [`crate::prompts`] and all
//! response parsing in [`crate::pipeline::json`].
//!
//! Each call is made exactly once: no retry, no timeout. A failure is logged
//! and returned as [`InvoiceError::ModelCallFailed`].

use crate::config::ExtractorConfig;
use crate::error::InvoiceError;
use crate::pipeline::encode::PageImage;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, OpenAIProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// A single-message model request: one text block plus inline images.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub prompt: String,
    pub images: Vec<PageImage>,
    /// Ask the provider for a JSON-object response.
    pub json_response: bool,
}

impl ModelRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_images(mut self, images: Vec<PageImage>) -> Self {
        self.images = images;
        self
    }

    pub fn json_response(mut self, v: bool) -> Self {
        self.json_response = v;
        self
    }
}

/// What came back from the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Anything that can answer a [`ModelRequest`].
pub trait ModelClient: Send + Sync {
    /// Model identifier, for logs and error messages.
    fn model(&self) -> &str;

    fn invoke<'a>(&'a self, request: &'a ModelRequest) -> BoxFuture<'a, Result<ModelReply, InvoiceError>>;
}

/// [`ModelClient`] backed by an `edgequake_llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
    options: CompletionOptions,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, config: &ExtractorConfig) -> Self {
        Self {
            provider,
            model: model.into(),
            options: build_options(config),
        }
    }

    /// Build a provider by name via `ProviderFactory`, which reads the API
    /// key (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, …) from the environment.
    pub fn from_factory(
        provider_name: &str,
        model: &str,
        config: &ExtractorConfig,
    ) -> Result<Self, InvoiceError> {
        // The factory only reads OPENAI_API_KEY; OPENAI_KEY needs an explicit key.
        if provider_name == "openai" && env_key(&["OPENAI_API_KEY"]).is_none() {
            if let Some(key) = env_key(&["OPENAI_KEY"]) {
                debug!("Using OPENAI_KEY for the OpenAI provider");
                let provider: Arc<dyn LLMProvider> = Arc::new(OpenAIProvider::new(key).with_model(model));
                return Ok(Self::new(provider, model, config));
            }
        }
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            InvoiceError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, model, config))
    }
}

impl ModelClient for ProviderClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn invoke<'a>(&'a self, request: &'a ModelRequest) -> BoxFuture<'a, Result<ModelReply, InvoiceError>> {
        Box::pin(async move {
            let message = if request.images.is_empty() {
                ChatMessage::user(request.prompt.as_str())
            } else {
                ChatMessage::user_with_images(
                    request.prompt.as_str(),
                    request.images.iter().map(PageImage::to_image_data).collect(),
                )
            };

            let mut options = self.options.clone();
            if request.json_response {
                options.response_format = Some("json_object".to_string());
            }

            let start = Instant::now();
            info!(
                "Invoking model '{}' with {} image(s)",
                self.model,
                request.images.len()
            );
            let response = self
                .provider
                .chat(&[message], Some(&options))
                .await
                .map_err(|e| {
                    error!("Error during model '{}' invoke: {}", self.model, e);
                    InvoiceError::ModelCallFailed {
                        model: self.model.clone(),
                        detail: e.to_string(),
                    }
                })?;

            debug!(
                "Model '{}': {} input tokens, {} output tokens, {:?}",
                self.model,
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );

            Ok(ModelReply {
                content: response.content.trim().to_string(),
                input_tokens: response.prompt_tokens,
                output_tokens: response.completion_tokens,
            })
        })
    }
}

/// Build `CompletionOptions` from the config.
fn build_options(config: &ExtractorConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: config.temperature,
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// The two model clients a run needs, created once and passed explicitly.
#[derive(Clone)]
pub struct InvoiceModels {
    /// Vision model for extraction.
    pub extractor: Arc<dyn ModelClient>,
    /// Text model for validation.
    pub validator: Arc<dyn ModelClient>,
}

impl InvoiceModels {
    pub fn new(extractor: Arc<dyn ModelClient>, validator: Arc<dyn ModelClient>) -> Self {
        Self {
            extractor,
            validator,
        }
    }

    /// Create both clients from the configured provider and model names.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, InvoiceError> {
        ensure_credentials(&config.provider_name)?;
        let extractor =
            ProviderClient::from_factory(&config.provider_name, &config.extraction_model, config)?;
        let validator =
            ProviderClient::from_factory(&config.provider_name, &config.validation_model, config)?;
        info!(
            "Model clients ready: provider={}, extraction={}, validation={}",
            config.provider_name, config.extraction_model, config.validation_model
        );
        Ok(Self::new(Arc::new(extractor), Arc::new(validator)))
    }
}

/// Environment variables accepted for the OpenAI key, in lookup order.
const OPENAI_KEY_VARS: [&str; 2] = ["OPENAI_API_KEY", "OPENAI_KEY"];

/// Fail early with a readable hint when the OpenAI key is missing.
///
/// Other providers are left to `ProviderFactory`, which knows their variables.
fn ensure_credentials(provider_name: &str) -> Result<(), InvoiceError> {
    if provider_name != "openai" || env_key(&OPENAI_KEY_VARS).is_some() {
        return Ok(());
    }
    Err(InvoiceError::ProviderNotConfigured {
        provider: provider_name.to_string(),
        hint: "Set OPENAI_API_KEY or OPENAI_KEY.".to_string(),
    })
}

fn env_key(names: &[&str]) -> Option<String> {
    first_key(names, |name| std::env::var(name).ok())
}

/// First non-blank value among `names`.
fn first_key(names: &[&str], lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    names
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
