/*!
 * Free-form text translation.
 *
 * Long input is split on line boundaries into segments of at most
 * `max_chars` characters; segments are translated one after another with the
 * relevant glossary terms and joined with newlines.
 */

use log::{info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::ProviderError;
use crate::language_utils::language_display_name;
use crate::providers::{CompletionBackend, SamplingParams};

use super::glossary::Glossary;
use super::prompts::build_text_prompt;
use super::retry::{sleep_or_cancel, RetryPolicy};

/// Translator for free-form text
#[derive(Debug, Clone)]
pub struct TextTranslator {
    backend: Arc<dyn CompletionBackend>,
    params: SamplingParams,
    retry: RetryPolicy,
    max_chars: usize,
    cancel: CancellationToken,
}

impl TextTranslator {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            params: SamplingParams::default(),
            retry: RetryPolicy::default(),
            max_chars: 1000,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Translate `text`, consulting `glossary` for terms it mentions
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        glossary: &Glossary,
    ) -> Result<String, ProviderError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }

        let terms = glossary.relevant_terms(text);
        if !terms.is_empty() {
            info!("Using {} glossary terms", terms.len());
        }

        let source = language_display_name(source_language);
        let target = language_display_name(target_language);
        let segments = split_text(text, self.max_chars);
        let mut translated = Vec::with_capacity(segments.len());

        for (index, segment) in segments.iter().enumerate() {
            let prompt = build_text_prompt(segment, &source, &target, &terms);
            translated.push(self.translate_segment(&prompt).await?);
            info!("Translated segment {}/{}", index + 1, segments.len());
        }

        Ok(translated.join("\n"))
    }

    async fn translate_segment(&self, prompt: &crate::providers::ChatPrompt) -> Result<String, ProviderError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;
        loop {
            if self.cancel.is_cancelled() {
                return Err(ProviderError::RequestFailed("Translation cancelled".to_string()));
            }
            match self.backend.chat(prompt, self.params).await {
                Ok(reply) => return Ok(reply.trim().to_string()),
                Err(error) if error.is_fatal() || attempt >= max_attempts => return Err(error),
                Err(error) => warn!("Attempt {}/{} failed: {}", attempt, max_attempts, error),
            }
            if !sleep_or_cancel(self.retry.delay_for(attempt), &self.cancel).await {
                return Err(ProviderError::RequestFailed("Translation cancelled".to_string()));
            }
            attempt += 1;
        }
    }
}

/// Split text on line boundaries into segments of at most `max_chars`.
///
/// Only line characters count toward the limit, so a segment may exceed
/// `max_chars` by the newlines joining its lines. A single line longer than
/// the limit becomes its own segment.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            segments.push(current.join("\n"));
            current.clear();
            current_len = 0;
        }
        current.push(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        segments.push(current.join("\n"));
    }
    segments
}
