/*!
 * Translation jobs: the planned work for one document run.
 *
 * Planning reads the document once, decides which `(row, language)` cells
 * still need a translation, and groups them by target language with one
 * range per outer chunk of `batch_size` valid rows.
 */

use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::app_config::JobConfig;
use crate::document::DocumentAdapter;
use crate::errors::{DocumentError, TranslationError};
use crate::language_utils::language_codes_match;

use super::client::BatchItem;
use super::result::is_marker;

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One cell to translate
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationTask {
    pub row: usize,
    pub source_text: String,
    pub reference: Option<String>,
    pub target_language: String,
    pub column: usize,
}

impl TranslationTask {
    pub fn to_item(&self) -> BatchItem {
        BatchItem::with_reference(self.source_text.clone(), self.reference.clone())
    }
}

/// Pending tasks for one target language
#[derive(Debug, Clone)]
pub struct LanguageTasks {
    pub language: String,
    pub column: usize,
    /// Tasks in row order
    pub tasks: Vec<TranslationTask>,
    /// `chunk_ranges[c]` indexes the tasks of outer chunk `c`
    pub chunk_ranges: Vec<Range<usize>>,
}

impl LanguageTasks {
    pub fn chunk(&self, index: usize) -> &[TranslationTask] {
        self.chunk_ranges
            .get(index)
            .map(|range| &self.tasks[range.clone()])
            .unwrap_or(&[])
    }
}

/// Where reference translations come from
#[derive(Debug, Clone, Default)]
pub enum ReferenceSource {
    #[default]
    None,
    /// A column of the same document
    Column { language: String },
    /// A source text to reference text map loaded from elsewhere
    External {
        language: String,
        translations: HashMap<String, String>,
    },
}

impl ReferenceSource {
    pub fn language(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Column { language } | Self::External { language, .. } => Some(language),
        }
    }
}

/// What to translate in a document
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub source_language: String,
    pub target_languages: Vec<String>,
    pub reference: ReferenceSource,
}

impl JobRequest {
    pub fn new(source_language: impl Into<String>, target_languages: Vec<String>) -> Self {
        Self {
            source_language: source_language.into(),
            target_languages,
            reference: ReferenceSource::None,
        }
    }

    pub fn with_reference(mut self, reference: ReferenceSource) -> Self {
        self.reference = reference;
        self
    }
}

/// Shared context of one document run
pub struct TranslationJob<D: DocumentAdapter> {
    id: Uuid,
    source_language: String,
    reference_language: Option<String>,
    groups: Vec<LanguageTasks>,
    chunk_count: usize,
    total: usize,
    already_translated: usize,
    cancel: CancellationToken,
    completed: AtomicUsize,
    failed: AtomicUsize,
    sink: Arc<Mutex<D>>,
    state: Mutex<JobState>,
}

impl<D: DocumentAdapter> fmt::Debug for TranslationJob<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationJob")
            .field("id", &self.id)
            .field("total", &self.total)
            .field("completed", &self.completed())
            .field("state", &self.state())
            .finish()
    }
}

impl<D: DocumentAdapter> TranslationJob<D> {
    /// Plan the pending cells of `document`.
    ///
    /// Target columns are created when missing. Cells that already hold text
    /// are skipped; with `retranslate_markers` a marker literal counts as
    /// empty.
    pub fn plan(mut document: D, request: &JobRequest, config: &JobConfig) -> Result<Self, TranslationError> {
        if request.target_languages.is_empty() {
            return Err(TranslationError::Validation("No target language selected".to_string()));
        }

        let source_column = document.source_column(&request.source_language)?;
        let reference_column = match &request.reference {
            ReferenceSource::Column { language } => Some(
                document
                    .find_column(language)
                    .ok_or_else(|| DocumentError::MissingColumn(language.clone()))?,
            ),
            _ => None,
        };

        let rows: Vec<usize> = document
            .enumerate_rows()
            .into_iter()
            .filter(|row| {
                document
                    .read_cell(*row, source_column)
                    .is_some_and(|text| !text.trim().is_empty())
            })
            .collect();

        let batch_size = config.batch_size.max(1);
        let chunk_count = rows.len().div_ceil(batch_size);

        let mut groups: Vec<LanguageTasks> = Vec::new();
        let mut already_translated = 0;

        for language in &request.target_languages {
            if groups.iter().any(|group| language_codes_match(&group.language, language) || &group.language == language) {
                debug!("Ignoring duplicate target language {}", language);
                continue;
            }
            if language_codes_match(language, &request.source_language) {
                return Err(TranslationError::Validation(format!(
                    "Target language {} is the source language",
                    language
                )));
            }

            let column = document.target_column(language)?;
            if column == source_column {
                return Err(TranslationError::Validation(format!(
                    "Target column for {} is the source column",
                    language
                )));
            }

            let mut tasks = Vec::new();
            let mut chunk_ranges = Vec::with_capacity(chunk_count);
            for chunk_rows in rows.chunks(batch_size) {
                let start = tasks.len();
                for &row in chunk_rows {
                    let existing = document.read_cell(row, column).unwrap_or_default().trim();
                    let pending = existing.is_empty() || (config.retranslate_markers && is_marker(existing));
                    if !pending {
                        already_translated += 1;
                        continue;
                    }

                    let source_text = document.read_cell(row, source_column).unwrap_or_default().trim().to_string();
                    let reference = match &request.reference {
                        ReferenceSource::None => None,
                        ReferenceSource::Column { .. } => reference_column
                            .and_then(|col| document.read_cell(row, col))
                            .map(str::trim)
                            .filter(|text| !text.is_empty())
                            .map(str::to_string),
                        ReferenceSource::External { translations, .. } => translations.get(&source_text).cloned(),
                    };

                    tasks.push(TranslationTask {
                        row,
                        source_text,
                        reference,
                        target_language: language.clone(),
                        column,
                    });
                }
                chunk_ranges.push(start..tasks.len());
            }

            groups.push(LanguageTasks {
                language: language.clone(),
                column,
                tasks,
                chunk_ranges,
            });
        }

        let total = groups.iter().map(|group| group.tasks.len()).sum();
        let id = Uuid::new_v4();
        info!(
            "Planned job {}: {} rows, {} languages, {} pending cells, {} already translated",
            id,
            rows.len(),
            groups.len(),
            total,
            already_translated
        );

        Ok(Self {
            id,
            source_language: request.source_language.clone(),
            reference_language: request.reference.language().map(str::to_string),
            groups,
            chunk_count,
            total,
            already_translated,
            cancel: CancellationToken::new(),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            sink: Arc::new(Mutex::new(document)),
            state: Mutex::new(JobState::Idle),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn reference_language(&self) -> Option<&str> {
        self.reference_language.as_deref()
    }

    pub fn groups(&self) -> &[LanguageTasks] {
        &self.groups
    }

    /// Number of outer chunks of valid rows
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Pending cells at planning time
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn already_translated(&self) -> usize {
        self.already_translated
    }

    /// Token that requests cooperative cancellation of this job
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Count one written cell; returns the new total
    pub(crate) fn record_completed(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn failed_cells(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub(crate) fn record_failed(&self, cells: usize) {
        self.failed.fetch_add(cells, Ordering::SeqCst);
    }

    /// Output sink shared with workers
    pub fn sink(&self) -> &Arc<Mutex<D>> {
        &self.sink
    }

    pub fn state(&self) -> JobState {
        *self.state.lock()
    }

    /// Move `Idle` to `Running`; any other state is rejected
    pub(crate) fn begin(&self) -> Result<(), TranslationError> {
        let mut state = self.state.lock();
        if *state != JobState::Idle {
            return Err(TranslationError::InvalidState(format!(
                "Job {} cannot start from state {}",
                self.id, *state
            )));
        }
        *state = JobState::Running;
        Ok(())
    }

    pub(crate) fn finish(&self, terminal: JobState) {
        let mut state = self.state.lock();
        debug!("Job {} {} -> {}", self.id, *state, terminal);
        *state = terminal;
    }

    /// Render the sink under its lock
    pub fn snapshot(&self) -> Result<Vec<u8>, DocumentError> {
        self.sink.lock().render()
    }
}

impl<D: DocumentAdapter + Clone> TranslationJob<D> {
    /// Copy of the document in its current state
    pub fn document(&self) -> D {
        self.sink.lock().clone()
    }
}
