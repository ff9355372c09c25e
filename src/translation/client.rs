/*!
 * Translation client adapter.
 *
 * Turns a batch of items into one chat request and aligns the numbered reply
 * back to the items. One request per call; retries live in the batch
 * translator.
 */

use async_trait::async_trait;
use log::debug;
use std::fmt::Debug;
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::language_utils::language_display_name;
use crate::providers::{CompletionBackend, SamplingParams};

use super::prompts::{decode_line_breaks, parse_numbered_blocks, TranslationPromptBuilder};
use super::result::{FailureKind, TranslationResult};

/// One source text, optionally paired with a reference translation
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub text: String,
    pub reference: Option<String>,
}

impl BatchItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reference: None,
        }
    }

    pub fn with_reference(text: impl Into<String>, reference: Option<String>) -> Self {
        Self {
            text: text.into(),
            reference,
        }
    }
}

/// Languages of one batch, as codes or names
#[derive(Debug, Clone, PartialEq)]
pub struct BatchLanguages {
    pub source: String,
    pub target: String,
    pub reference: Option<String>,
}

impl BatchLanguages {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }
}

/// Contract between the batch translator and a translation service.
///
/// Implementations make at most one remote call per invocation. Missing
/// items are reported in band with [`FailureKind::FormatError`].
#[async_trait]
pub trait TranslationClient: Send + Sync + Debug {
    async fn translate(
        &self,
        items: &[BatchItem],
        languages: &BatchLanguages,
    ) -> Result<Vec<TranslationResult>, ProviderError>;
}

/// Translation client backed by a chat completion endpoint
#[derive(Debug, Clone)]
pub struct LlmTranslationClient {
    backend: Arc<dyn CompletionBackend>,
    params: SamplingParams,
}

impl LlmTranslationClient {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            params: SamplingParams::default(),
        }
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }
}

#[async_trait]
impl TranslationClient for LlmTranslationClient {
    async fn translate(
        &self,
        items: &[BatchItem],
        languages: &BatchLanguages,
    ) -> Result<Vec<TranslationResult>, ProviderError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let reference_name = languages.reference.as_deref().map(language_display_name);
        let prompt = TranslationPromptBuilder::new(
            &language_display_name(&languages.source),
            &language_display_name(&languages.target),
        )
        .with_reference_language(reference_name.as_deref())
        .with_items(items)
        .build();

        let response = self.backend.chat(&prompt, self.params).await?;
        debug!("Received {} characters for a batch of {}", response.len(), items.len());

        let line_limits: Vec<usize> = items.iter().map(|item| item.text.lines().count().max(1)).collect();
        let parsed = parse_numbered_blocks(&response, &line_limits);
        Ok(items
            .iter()
            .zip(parsed)
            .map(|(item, translation)| match translation {
                // Only multi-line sources were encoded; other `\N` text is literal
                Some(translation) if item.text.contains('\n') => {
                    TranslationResult::translated(item.text.clone(), decode_line_breaks(&translation))
                }
                Some(translation) => TranslationResult::translated(item.text.clone(), translation),
                None => TranslationResult::failed(item.text.clone(), FailureKind::FormatError),
            })
            .collect())
    }
}
