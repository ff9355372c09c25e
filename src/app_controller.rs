use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::document::{load_reference_map, DocumentAdapter, Spreadsheet, SubtitleDocument, SubtitleFormat};
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::providers::{backend_from_config, CompletionBackend, SamplingParams};
use crate::translation::{
    GlossaryStore, JobOrchestrator, JobOutcome, JobRequest, JobSummary, LlmTranslationClient, ProgressReporter,
    ProgressUpdate, ReferenceSource, RetryPolicy, TextTranslator, TranslationClient, TranslationJob,
};

// @module: Application controller for document translation

/// Options of a spreadsheet run
#[derive(Debug, Clone, Default)]
pub struct SheetOptions {
    /// Output directory, next to the input when unset
    pub output_dir: Option<PathBuf>,
    /// Language of the reference translations
    pub reference_language: Option<String>,
    /// Second sheet holding reference translations
    pub reference_file: Option<PathBuf>,
    /// Start from the input even when an output exists
    pub force_overwrite: bool,
}

/// Options of a subtitle run
#[derive(Debug, Clone, Default)]
pub struct SubtitleOptions {
    pub output_dir: Option<PathBuf>,
    pub force_overwrite: bool,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Completion backend shared by every job
    backend: Arc<dyn CompletionBackend>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let backend = backend_from_config(&config.translation);
        Ok(Self::with_backend(config, backend))
    }

    /// Create a controller talking to an explicit backend
    pub fn with_backend(config: Config, backend: Arc<dyn CompletionBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn sampling_params(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.config.translation.common.temperature,
            max_tokens: self.config.translation.common.max_tokens,
        }
    }

    /// Check the backend before any work; auth and quota failures stop the run
    async fn check_connection(&self) -> Result<()> {
        match self.backend.check_connection().await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(TranslationError::from(e).into()),
            Err(e) => {
                warn!("Connection check failed, continuing: {}", e);
                Ok(())
            }
        }
    }

    fn translation_client(&self) -> Arc<dyn TranslationClient> {
        Arc::new(LlmTranslationClient::new(Arc::clone(&self.backend)).with_params(self.sampling_params()))
    }

    /// Translate a CSV/TSV sheet, or every sheet of a directory
    pub async fn run_sheet(&self, input: &Path, options: &SheetOptions) -> Result<Vec<JobSummary>> {
        self.check_connection().await?;
        if FileManager::dir_exists(input) {
            let mut files = FileManager::find_files(input, "csv")?;
            files.extend(FileManager::find_files(input, "tsv")?);
            files.retain(|file| !is_sheet_output(file, &self.config.target_languages));
            if files.is_empty() {
                return Err(anyhow!("No spreadsheet files found in directory: {:?}", input));
            }
            return self.run_folder(&files, |file| self.run_sheet_file(file, options)).await;
        }

        if !FileManager::file_exists(input) {
            return Err(anyhow!("Input file does not exist: {:?}", input));
        }
        Ok(vec![self.run_sheet_file(input, options).await?])
    }

    async fn run_sheet_file(&self, input: &Path, options: &SheetOptions) -> Result<JobSummary> {
        let output_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| FileManager::default_output_dir(input));
        FileManager::ensure_dir(&output_dir)?;
        let output_path = self.sheet_output_path(input, &output_dir);

        // Resume from a previous run's output
        let document = if output_path.exists() && !options.force_overwrite {
            info!("Resuming from existing output: {}", output_path.display());
            Spreadsheet::from_path(&output_path)
        } else {
            Spreadsheet::from_path(input)
        }
        .with_context(|| format!("Failed to read spreadsheet: {:?}", input))?;

        let request = JobRequest::new(self.config.source_language.clone(), self.config.target_languages.clone())
            .with_reference(self.reference_source(options)?);

        info!("Translating {}", input.display());
        self.run_job(document, &request, &output_path).await
    }

    fn sheet_output_path(&self, input: &Path, output_dir: &Path) -> PathBuf {
        let extension = input.extension().and_then(|e| e.to_str()).unwrap_or("csv");
        let suffix = match self.config.target_languages.as_slice() {
            [single] => single.as_str(),
            _ => "translated",
        };
        FileManager::generate_output_path(input, output_dir, suffix, extension)
    }

    fn reference_source(&self, options: &SheetOptions) -> Result<ReferenceSource> {
        match (&options.reference_file, &options.reference_language) {
            (Some(file), Some(language)) => {
                let translations = load_reference_map(file, &self.config.source_language, language)
                    .with_context(|| format!("Failed to load reference file: {:?}", file))?;
                Ok(ReferenceSource::External {
                    language: language.clone(),
                    translations,
                })
            }
            (Some(_), None) => Err(anyhow!("A reference file requires --reference-language")),
            (None, Some(language)) => Ok(ReferenceSource::Column {
                language: language.clone(),
            }),
            (None, None) => Ok(ReferenceSource::None),
        }
    }

    /// Translate an SRT/ASS file, or every subtitle file of a directory.
    ///
    /// Each target language is written to its own output file.
    pub async fn run_subtitle(&self, input: &Path, options: &SubtitleOptions) -> Result<Vec<JobSummary>> {
        self.check_connection().await?;
        if FileManager::dir_exists(input) {
            let mut files = FileManager::find_files(input, "srt")?;
            files.extend(FileManager::find_files(input, "ass")?);
            files.retain(|file| !is_language_output(file, &self.config.target_languages));
            if files.is_empty() {
                return Err(anyhow!("No subtitle files found in directory: {:?}", input));
            }
            let nested = self
                .run_folder(&files, |file| self.run_subtitle_file(file, options))
                .await?;
            return Ok(nested.into_iter().flatten().collect());
        }

        if !FileManager::file_exists(input) {
            return Err(anyhow!("Input file does not exist: {:?}", input));
        }
        self.run_subtitle_file(input, options).await
    }

    async fn run_subtitle_file(&self, input: &Path, options: &SubtitleOptions) -> Result<Vec<JobSummary>> {
        let format = SubtitleFormat::from_path(input)
            .ok_or_else(|| anyhow!("Unsupported subtitle format: {:?}", input))?;
        let output_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| FileManager::default_output_dir(input));
        FileManager::ensure_dir(&output_dir)?;

        let mut summaries = Vec::new();
        for language in &self.config.target_languages {
            let output_path = FileManager::generate_output_path(input, &output_dir, language, format.extension());
            if output_path.exists() && !options.force_overwrite {
                warn!("Skipping {}, translation already exists (use -f to force overwrite)", output_path.display());
                continue;
            }

            let document = SubtitleDocument::from_path(input)
                .with_context(|| format!("Failed to parse subtitle file: {:?}", input))?;
            let request = JobRequest::new(self.config.source_language.clone(), vec![language.clone()]);

            info!("Translating {} into {}", input.display(), language);
            let summary = self.run_job(document, &request, &output_path).await?;
            let cancelled = summary.outcome == JobOutcome::Cancelled;
            summaries.push(summary);
            if cancelled {
                break;
            }
        }
        Ok(summaries)
    }

    /// Process files one after another; a fatal provider error stops the loop
    async fn run_folder<'a, T, F, Fut>(&'a self, files: &'a [PathBuf], mut run_file: F) -> Result<Vec<T>>
    where
        F: FnMut(&'a Path) -> Fut,
        Fut: std::future::Future<Output = Result<T>> + 'a,
    {
        let folder_pb = Self::create_progress_bar(files.len() as u64, "files");
        folder_pb.set_message("Processing files");

        let mut results = Vec::new();
        let mut error_count = 0;
        for file in files {
            let file_name = file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            match run_file(file.as_path()).await {
                Ok(result) => results.push(result),
                Err(e) if is_fatal(&e) => {
                    folder_pb.abandon();
                    return Err(e);
                }
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    error_count += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_and_clear();
        info!(
            "Folder processing completed: {} processed, {} errors",
            results.len(),
            error_count
        );
        Ok(results)
    }

    /// Plan and run one document through the orchestrator
    async fn run_job<D: DocumentAdapter>(&self, document: D, request: &JobRequest, output: &Path) -> Result<JobSummary> {
        let orchestrator = JobOrchestrator::new(self.translation_client(), self.config.job.clone())?;
        let job = Arc::new(TranslationJob::plan(document, request, &self.config.job)?);

        info!(
            "{} - {}: {} cells to translate",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model(),
            job.total()
        );

        let progress_bar = Self::create_progress_bar(job.total() as u64, "cells");
        progress_bar.set_message("Translating");
        let pb = progress_bar.clone();
        let reporter = Arc::new(ProgressReporter::with_callback(
            self.config.job.progress_interval,
            Arc::new(move |update: ProgressUpdate| pb.set_position(update.current as u64)),
        ));

        let cancel = job.cancellation_token();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, waiting for in-flight batches");
                cancel.cancel();
            }
        });

        let result = orchestrator.run(&job, output, &reporter).await;
        signal.abort();
        progress_bar.finish_and_clear();

        let summary = result?;
        match summary.outcome {
            JobOutcome::Completed => info!(
                "Success: {} ({} translated, {} failed) in {}",
                output.display(),
                summary.completed,
                summary.failed,
                Self::format_duration(summary.elapsed)
            ),
            JobOutcome::Cancelled => warn!(
                "Cancelled: {} of {} cells saved to {}, run again to resume",
                summary.completed,
                summary.total,
                output.display()
            ),
        }
        Ok(summary)
    }

    /// Translate free-form text into every target language
    pub async fn run_text(&self, text: &str) -> Result<Vec<(String, String)>> {
        self.check_connection().await?;
        let store = self.glossary_store();
        let cancel = CancellationToken::new();
        let translator = TextTranslator::new(Arc::clone(&self.backend))
            .with_params(self.sampling_params())
            .with_retry_policy(RetryPolicy::fixed(self.config.job.max_retries, self.config.job.retry_backoff()))
            .with_max_chars(self.config.translation.common.max_chars_per_segment)
            .with_cancellation(cancel.clone());

        let signal_token = cancel.clone();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping text translation");
                signal_token.cancel();
            }
        });

        let result = self.translate_text_targets(&translator, &store, text).await;
        signal.abort();
        result
    }

    async fn translate_text_targets(
        &self,
        translator: &TextTranslator,
        store: &GlossaryStore,
        text: &str,
    ) -> Result<Vec<(String, String)>> {
        let mut results = Vec::new();
        for language in &self.config.target_languages {
            let glossary = store.load(&self.config.source_language, language)?;
            let translation = translator
                .translate(text, &self.config.source_language, language, &glossary)
                .await
                .map_err(TranslationError::from)
                .with_context(|| format!("Failed to translate text into {}", language))?;
            results.push((language.clone(), translation));
        }
        Ok(results)
    }

    /// Glossary files of the configured directory
    pub fn glossary_store(&self) -> GlossaryStore {
        GlossaryStore::new(&self.config.glossary_dir)
    }

    fn create_progress_bar(len: u64, unit: &str) -> ProgressBar {
        let progress_bar = ProgressBar::new(len);
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
            unit
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

fn is_fatal(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<TranslationError>(),
        Some(TranslationError::Auth(_)) | Some(TranslationError::Quota(_))
    )
}

/// Whether a file looks like `<stem>.<lang>.<ext>` for one of `languages`
fn is_language_output(file: &Path, languages: &[String]) -> bool {
    let stem = file.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    languages.iter().any(|language| stem.ends_with(&format!(".{}", language)))
}

fn is_sheet_output(file: &Path, languages: &[String]) -> bool {
    is_language_output(file, languages)
        || file
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy().ends_with(".translated"))
}
