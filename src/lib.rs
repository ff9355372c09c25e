/*!
 * # LingoBatch - Concurrent batch translation with AI
 *
 * A Rust library for translating spreadsheets, subtitles and free-form text
 * using LLM chat completion APIs.
 *
 * ## Features
 *
 * - Translate every source cell of a CSV/TSV sheet into one or more languages
 * - Translate SRT and ASS subtitles while preserving timing
 * - Bounded concurrency with numbered-list batching and retry with halving
 * - Periodic atomic checkpoints and idempotent resume
 * - Cooperative cancellation with a grace period
 * - Per language pair glossaries
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Spreadsheet and subtitle document adapters
 * - `translation`: Job planning, orchestration and batching:
 *   - `translation::job`: Job planning and shared state
 *   - `translation::orchestrator`: Worker pool, checkpoints and cancellation
 *   - `translation::batch`: Retry and halving of a single batch
 *   - `translation::glossary`: Terminology per language pair
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for chat completion APIs:
 *   - `providers::openai`: OpenAI compatible API client (OpenAI, DeepSeek)
 *   - `providers::anthropic`: Anthropic API client
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use document::{DocumentAdapter, Spreadsheet, SubtitleDocument, SubtitleEntry};
pub use errors::{DocumentError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use translation::{JobOrchestrator, JobRequest, TranslationJob};
