/*!
 * Batch translation processing.
 *
 * This module splits item lists into fixed-size batches, sends each batch
 * through a translation client, and retries failed batches with a bounded
 * loop. Results always line up one-to-one with the input.
 */

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::JobConfig;
use crate::errors::ProviderError;

use super::client::{BatchItem, BatchLanguages, TranslationClient};
use super::result::{FailureKind, TranslationResult};
use super::retry::{sleep_or_cancel, RetryPolicy};

/// Result of running the attempt loop on one batch
enum Outcome {
    /// Final per-item results
    Finished(Vec<TranslationResult>),
    /// The batch should be halved; halves resume at `next_attempt`
    Split { next_attempt: u32 },
}

/// Batch translator for processing items in batches
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    /// The translation client to use
    client: Arc<dyn TranslationClient>,

    /// Maximum items per request
    batch_size: usize,

    /// Attempt bound and back-off
    retry: RetryPolicy,

    /// Batches larger than this are halved after a failed attempt
    split_threshold: usize,

    /// Checked before every request
    cancel: CancellationToken,
}

impl BatchTranslator {
    /// Create a new batch translator with default retry settings
    pub fn new(client: Arc<dyn TranslationClient>, batch_size: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
            retry: RetryPolicy::default(),
            split_threshold: 10,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a translator configured from job settings
    pub fn from_job_config(
        client: Arc<dyn TranslationClient>,
        config: &JobConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(client, config.batch_size)
            .with_retry_policy(RetryPolicy::fixed(config.max_retries, config.retry_backoff()))
            .with_split_threshold(config.split_threshold)
            .with_cancellation(cancel)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_split_threshold(mut self, split_threshold: usize) -> Self {
        self.split_threshold = split_threshold;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Translate plain texts, returning `(text, translation)` pairs in input order
    pub async fn translate_texts(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<(String, String)>, ProviderError> {
        let items: Vec<BatchItem> = texts.iter().map(|text| BatchItem::new(text.clone())).collect();
        let languages = BatchLanguages::new(source_language, target_language);

        let results = self.translate_items(&items, &languages).await?;
        Ok(results
            .into_iter()
            .map(|result| (result.text, result.translation))
            .collect())
    }

    /// Translate items batch by batch, in order.
    ///
    /// Fatal provider errors stop the run and are returned as-is. Every other
    /// failure is reported in band through markers.
    pub async fn translate_items(
        &self,
        items: &[BatchItem],
        languages: &BatchLanguages,
    ) -> Result<Vec<TranslationResult>, ProviderError> {
        let batches: Vec<Vec<TranslationResult>> = stream::iter(items.chunks(self.batch_size))
            .then(|batch| self.translate_batch(batch, languages))
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    /// Translate one batch with retries and the halving policy
    pub async fn translate_batch(
        &self,
        batch: &[BatchItem],
        languages: &BatchLanguages,
    ) -> Result<Vec<TranslationResult>, ProviderError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let may_split = batch.len() > self.split_threshold;
        let next_attempt = match self.run_attempts(batch, languages, 1, may_split).await? {
            Outcome::Finished(results) => return Ok(results),
            Outcome::Split { next_attempt } => next_attempt,
        };

        let middle = batch.len().div_ceil(2);
        debug!(
            "Splitting batch of {} into {} + {}",
            batch.len(),
            middle,
            batch.len() - middle
        );

        let mut results = Vec::with_capacity(batch.len());
        for half in [&batch[..middle], &batch[middle..]] {
            match self.run_attempts(half, languages, next_attempt, false).await? {
                Outcome::Finished(half_results) => results.extend(half_results),
                Outcome::Split { .. } => results.extend(failed_all(half, FailureKind::TranslationError)),
            }
        }
        Ok(results)
    }

    async fn run_attempts(
        &self,
        batch: &[BatchItem],
        languages: &BatchLanguages,
        first_attempt: u32,
        may_split: bool,
    ) -> Result<Outcome, ProviderError> {
        let max_attempts = self.retry.max_attempts();
        let mut partial: Option<Vec<TranslationResult>> = None;
        let mut attempt = first_attempt;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(Outcome::Finished(failed_all(batch, FailureKind::Cancelled)));
            }

            match self.client.translate(batch, languages).await {
                Ok(results) => {
                    let results = align_results(batch, results);
                    let unparsed = results
                        .iter()
                        .filter(|r| r.error_kind.is_some_and(|kind| kind.is_parse_failure()))
                        .count();

                    if unparsed == 0 || attempt >= max_attempts {
                        if unparsed > 0 {
                            warn!(
                                "Keeping partial result: {} of {} items unparsed after {} attempts",
                                unparsed,
                                batch.len(),
                                attempt
                            );
                        }
                        return Ok(Outcome::Finished(results));
                    }

                    warn!(
                        "Attempt {}/{}: {} of {} items missing from response",
                        attempt,
                        max_attempts,
                        unparsed,
                        batch.len()
                    );
                    partial = Some(results);
                }
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    warn!("Attempt {}/{} failed: {}", attempt, max_attempts, error);
                    if attempt >= max_attempts {
                        let results = partial
                            .take()
                            .unwrap_or_else(|| failed_all(batch, FailureKind::TranslationError));
                        return Ok(Outcome::Finished(results));
                    }
                }
            }

            if !sleep_or_cancel(self.retry.delay_for(attempt), &self.cancel).await {
                return Ok(Outcome::Finished(failed_all(batch, FailureKind::Cancelled)));
            }

            if may_split && attempt == first_attempt {
                return Ok(Outcome::Split { next_attempt: attempt + 1 });
            }
            attempt += 1;
        }
    }
}

/// Pad with missing markers or drop surplus so results match the batch
fn align_results(batch: &[BatchItem], mut results: Vec<TranslationResult>) -> Vec<TranslationResult> {
    if results.len() > batch.len() {
        debug!("Dropping {} surplus results", results.len() - batch.len());
        results.truncate(batch.len());
    }
    for item in &batch[results.len()..] {
        results.push(TranslationResult::failed(item.text.clone(), FailureKind::Missing));
    }
    results
}

fn failed_all(batch: &[BatchItem], kind: FailureKind) -> Vec<TranslationResult> {
    batch
        .iter()
        .map(|item| TranslationResult::failed(item.text.clone(), kind))
        .collect()
}
