/*!
 * Batch translation of tabular and subtitle documents using AI providers.
 *
 * The module is split into several submodules:
 *
 * - `job`: Planning a job into per-language chunks of pending cells
 * - `orchestrator`: Concurrent execution with checkpoints and cancellation
 * - `batch`: Retry, halving and alignment of a single batch
 * - `client`: The seam between batches and completion backends
 * - `prompts`: Prompt templates and numbered response parsing
 * - `progress`: Throttled progress reporting
 * - `glossary`: Per language pair terminology
 * - `text`: Free-form text translation
 */

// Re-export main types for easier usage
pub use self::batch::BatchTranslator;
pub use self::client::{BatchItem, BatchLanguages, LlmTranslationClient, TranslationClient};
pub use self::glossary::{Glossary, GlossaryPage, GlossaryStore};
pub use self::job::{JobRequest, JobState, LanguageTasks, ReferenceSource, TranslationJob, TranslationTask};
pub use self::orchestrator::{JobOrchestrator, JobOutcome, JobSummary};
pub use self::progress::{ProgressCallback, ProgressReporter, ProgressUpdate};
pub use self::result::{is_marker, FailureKind, TranslationResult};
pub use self::retry::{Backoff, RetryPolicy};
pub use self::text::{split_text, TextTranslator};

// Re-export prompt types
pub use self::prompts::{parse_numbered_response, PromptTemplate, TranslationPromptBuilder};

// Submodules
pub mod batch;
pub mod client;
pub mod glossary;
pub mod job;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod result;
pub mod retry;
pub mod text;
