/*!
 * Concurrent job orchestration.
 *
 * Valid rows are processed in strictly sequential outer chunks. Inside a
 * chunk every target language with pending cells becomes one unit of work;
 * units run on spawned tasks gated by a semaphore of `max_workers` permits.
 * Results are written into the shared sink under its lock, counted per cell,
 * and checkpointed to disk every `save_interval` cells.
 */

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::app_config::JobConfig;
use crate::document::DocumentAdapter;
use crate::errors::{DocumentError, TranslationError};
use crate::file_utils::FileManager;

use super::batch::BatchTranslator;
use super::client::{BatchItem, BatchLanguages, TranslationClient};
use super::job::{JobState, TranslationJob};
use super::progress::ProgressReporter;
use super::result::FailureKind;
use super::retry::RetryPolicy;

/// How a job run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Cancelled,
}

/// Statistics of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub outcome: JobOutcome,
    /// Cells pending at the start of the run
    pub total: usize,
    /// Cells written during the run, markers included
    pub completed: usize,
    /// Cells written with a failure marker
    pub failed: usize,
    /// Cells that already held a translation
    pub already_translated: usize,
    pub elapsed: Duration,
}

/// Status of one outer chunk after joining its units
enum ChunkStatus {
    Done,
    Cancelled,
    Fatal(TranslationError),
}

/// Periodic checkpoint writer with a high-water mark
struct Checkpointer {
    path: PathBuf,
    interval: usize,
    last_saved: Mutex<usize>,
}

impl Checkpointer {
    fn new(path: &Path, interval: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            interval: interval.max(1),
            last_saved: Mutex::new(0),
        }
    }

    fn is_due(&self, count: usize) -> bool {
        count % self.interval == 0
    }

    /// Save the sink for `count` completed cells unless a newer save exists.
    ///
    /// The file write runs on the blocking pool.
    async fn checkpoint<D: DocumentAdapter>(self: &Arc<Self>, job: &TranslationJob<D>, count: usize) {
        let bytes = match job.snapshot() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to render checkpoint at {} cells: {}", count, e);
                return;
            }
        };

        let checkpointer = Arc::clone(self);
        if let Err(e) = tokio::task::spawn_blocking(move || checkpointer.write(&bytes, count)).await {
            error!("Checkpoint task for {} cells failed: {}", count, e);
        }
    }

    fn write(&self, bytes: &[u8], count: usize) {
        let mut last_saved = self.last_saved.lock();
        if count <= *last_saved {
            debug!("Skipping stale checkpoint {} (already saved {})", count, *last_saved);
            return;
        }
        match FileManager::write_atomic(&self.path, bytes) {
            Ok(()) => {
                *last_saved = count;
                info!("Checkpoint saved: {} cells translated", count);
            }
            Err(e) => error!("Failed to write checkpoint {:?}: {}", self.path, e),
        }
    }

    /// Write the final output; checkpoints still in flight are dropped afterwards
    fn save_final(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut last_saved = self.last_saved.lock();
        FileManager::write_atomic(&self.path, bytes)?;
        *last_saved = usize::MAX;
        Ok(())
    }
}

/// Dispatches a job's units onto a bounded worker pool
#[derive(Debug, Clone)]
pub struct JobOrchestrator {
    client: Arc<dyn TranslationClient>,
    config: JobConfig,
    retry: RetryPolicy,
}

impl JobOrchestrator {
    /// Create an orchestrator; the configuration is validated here
    pub fn new(client: Arc<dyn TranslationClient>, config: JobConfig) -> Result<Self, TranslationError> {
        config.validate()?;
        let retry = RetryPolicy::fixed(config.max_retries, config.retry_backoff());
        Ok(Self { client, config, retry })
    }

    /// Replace the fixed back-off derived from the configuration
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Run a planned job to completion, cancellation or failure.
    ///
    /// Output is checkpointed to `output` while running and saved once more at
    /// the end. Auth and quota failures abort the job and are returned as
    /// errors after a best-effort save.
    pub async fn run<D: DocumentAdapter>(
        &self,
        job: &Arc<TranslationJob<D>>,
        output: &Path,
        reporter: &Arc<ProgressReporter>,
    ) -> Result<JobSummary, TranslationError> {
        job.begin()?;
        reporter.reset();
        let started = Instant::now();

        if job.already_translated() > 0 {
            info!("{} cells already translated, they will be kept", job.already_translated());
        }
        info!(
            "Starting job {}: {} cells in {} chunks with {} workers",
            job.id(),
            job.total(),
            job.chunk_count(),
            self.config.max_workers
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let checkpointer = Arc::new(Checkpointer::new(output, self.config.save_interval));
        let mut outcome = JobOutcome::Completed;

        for chunk in 0..job.chunk_count() {
            if job.is_cancelled() {
                outcome = JobOutcome::Cancelled;
                break;
            }

            let mut units = JoinSet::new();
            for (group_index, group) in job.groups().iter().enumerate() {
                if group.chunk(chunk).is_empty() {
                    continue;
                }
                units.spawn(run_unit(
                    Arc::clone(job),
                    group_index,
                    chunk,
                    self.translator(job.cancellation_token()),
                    Arc::clone(&semaphore),
                    Arc::clone(reporter),
                    Arc::clone(&checkpointer),
                ));
            }
            debug!("Chunk {}/{}: {} units dispatched", chunk + 1, job.chunk_count(), units.len());

            match self.join_chunk(job, &mut units).await {
                ChunkStatus::Done => {}
                ChunkStatus::Cancelled => {
                    outcome = JobOutcome::Cancelled;
                    break;
                }
                ChunkStatus::Fatal(error) => {
                    error!("Job {} aborted: {}", job.id(), error);
                    job.cancel();
                    units.abort_all();
                    while units.join_next().await.is_some() {}
                    let saved = job
                        .snapshot()
                        .and_then(|bytes| checkpointer.save_final(&bytes).map_err(DocumentError::from));
                    if let Err(save_error) = saved {
                        error!("Failed to save partial output {:?}: {}", output, save_error);
                    }
                    job.finish(JobState::Failed);
                    return Err(error);
                }
            }
        }

        if outcome == JobOutcome::Completed && job.is_cancelled() && job.completed() < job.total() {
            outcome = JobOutcome::Cancelled;
        }

        let bytes = job.snapshot();
        if let Err(e) = bytes.and_then(|bytes| checkpointer.save_final(&bytes).map_err(DocumentError::from)) {
            job.finish(JobState::Failed);
            return Err(e.into());
        }

        let summary = JobSummary {
            job_id: job.id(),
            outcome,
            total: job.total(),
            completed: job.completed(),
            failed: job.failed_cells(),
            already_translated: job.already_translated(),
            elapsed: started.elapsed(),
        };

        match outcome {
            JobOutcome::Completed => {
                reporter.report(summary.completed, summary.total, true);
                job.finish(JobState::Completed);
                info!(
                    "Job {} completed: {}/{} cells, {} failed, in {:.1}s",
                    summary.job_id,
                    summary.completed,
                    summary.total,
                    summary.failed,
                    summary.elapsed.as_secs_f64()
                );
            }
            JobOutcome::Cancelled => {
                job.finish(JobState::Cancelled);
                warn!(
                    "Job {} cancelled after {}/{} cells; partial output saved to {:?}",
                    summary.job_id, summary.completed, summary.total, output
                );
            }
        }
        Ok(summary)
    }

    fn translator(&self, cancel: CancellationToken) -> BatchTranslator {
        BatchTranslator::from_job_config(Arc::clone(&self.client), &self.config, cancel)
            .with_retry_policy(self.retry.clone())
    }

    /// Wait for every unit of a chunk.
    ///
    /// Once cancellation is seen, outstanding units get the grace period to
    /// finish before they are aborted.
    async fn join_chunk<D: DocumentAdapter>(
        &self,
        job: &Arc<TranslationJob<D>>,
        units: &mut JoinSet<Result<usize, TranslationError>>,
    ) -> ChunkStatus {
        let token = job.cancellation_token();
        let mut deadline: Option<tokio::time::Instant> = None;

        loop {
            if deadline.is_none() && token.is_cancelled() {
                deadline = Some(tokio::time::Instant::now() + self.config.cancel_grace_period());
            }

            let joined = match deadline {
                Some(at) => match tokio::time::timeout_at(at, units.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!("Grace period elapsed, aborting {} outstanding units", units.len());
                        units.abort_all();
                        while units.join_next().await.is_some() {}
                        return ChunkStatus::Cancelled;
                    }
                },
                None => tokio::select! {
                    joined = units.join_next() => joined,
                    _ = token.cancelled() => continue,
                },
            };

            match joined {
                None => {
                    return if deadline.is_some() { ChunkStatus::Cancelled } else { ChunkStatus::Done };
                }
                Some(Ok(Ok(written))) => debug!("Unit finished, {} cells written", written),
                Some(Ok(Err(error))) => return ChunkStatus::Fatal(error),
                Some(Err(join_error)) if join_error.is_cancelled() => {}
                Some(Err(join_error)) => {
                    return ChunkStatus::Fatal(TranslationError::Setup(format!("Worker failed: {}", join_error)));
                }
            }
        }
    }
}

/// Translate one language's slice of one chunk and write the results
async fn run_unit<D: DocumentAdapter>(
    job: Arc<TranslationJob<D>>,
    group_index: usize,
    chunk: usize,
    translator: BatchTranslator,
    semaphore: Arc<Semaphore>,
    reporter: Arc<ProgressReporter>,
    checkpointer: Arc<Checkpointer>,
) -> Result<usize, TranslationError> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| TranslationError::Setup(e.to_string()))?;

    let group = &job.groups()[group_index];
    let tasks = group.chunk(chunk);
    let items: Vec<BatchItem> = tasks.iter().map(|task| task.to_item()).collect();
    let languages = BatchLanguages::new(job.source_language(), group.language.clone())
        .with_reference(job.reference_language().map(str::to_string));

    let results = translator.translate_items(&items, &languages).await?;

    let mut written = 0;
    let mut failed = 0;
    {
        let mut sink = job.sink().lock();
        for (task, result) in tasks.iter().zip(&results) {
            if result.error_kind == Some(FailureKind::Cancelled) {
                continue;
            }
            sink.write_cell(task.row, task.column, &result.translation)?;
            written += 1;
            if result.error_kind.is_some() {
                failed += 1;
            }
        }
    }
    job.record_failed(failed);

    for _ in 0..written {
        let current = job.record_completed();
        reporter.report(current, job.total(), false);
        if checkpointer.is_due(current) {
            checkpointer.checkpoint(job.as_ref(), current).await;
        }
    }

    Ok(written)
}
