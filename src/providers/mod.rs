/*!
 * Provider implementations for different completion services.
 *
 * This module contains client implementations for the supported endpoints:
 * - OpenAI: OpenAI-compatible chat completions (DeepSeek, OpenAI)
 * - Anthropic: Anthropic messages API
 * - Mock: scripted provider used by tests and benches
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the typed interface that all provider implementations
/// follow, allowing them to be used interchangeably.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// A single system + user exchange sent to a completion endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    /// System role instructions
    pub system: String,
    /// User message carrying the texts to translate
    pub user: String,
}

/// Sampling parameters shared by every request of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    /// Temperature for generation
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

/// Untyped completion seam used by the translation client.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait CompletionBackend: Send + Sync + Debug {
    /// Send one prompt and return the text of the reply
    async fn chat(&self, prompt: &ChatPrompt, params: SamplingParams) -> Result<String, ProviderError>;

    /// Check that the endpoint accepts our credentials
    async fn check_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Build the backend selected by the configuration
pub fn backend_from_config(config: &TranslationConfig) -> Arc<dyn CompletionBackend> {
    let timeout = config.get_timeout();
    match config.provider {
        TranslationProvider::DeepSeek | TranslationProvider::OpenAI => Arc::new(openai::OpenAI::new(
            config.get_api_key(),
            config.get_endpoint(),
            config.get_model(),
            timeout,
        )),
        TranslationProvider::Anthropic => Arc::new(anthropic::Anthropic::new(
            config.get_api_key(),
            config.get_endpoint(),
            config.get_model(),
            timeout,
        )),
    }
}

/// Map a reqwest transport failure onto the provider taxonomy
pub(crate) fn classify_transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() {
        ProviderError::ConnectionError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

pub mod anthropic;
pub mod mock;
pub mod openai;
