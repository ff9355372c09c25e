use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::TranslationError;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO) or English language name
    pub source_language: String,

    /// Target languages, one output column per language
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<String>,

    /// Translation config
    pub translation: TranslationConfig,

    /// Batch job tunables
    #[serde(default)]
    pub job: JobConfig,

    /// Directory holding per-language-pair glossary files
    #[serde(default = "default_glossary_dir")]
    pub glossary_dir: PathBuf,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: DeepSeek (OpenAI-compatible chat completions)
    #[default]
    DeepSeek,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::DeepSeek => "DeepSeek",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::DeepSeek => "deepseek".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(provider_type),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Sampling settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Temperature parameter for text generation (0.0 to 1.0)
    /// Lower values make output more deterministic
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum characters per segment for free-form text translation
    #[serde(default = "default_max_chars_per_segment")]
    pub max_chars_per_segment: usize,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_chars_per_segment: default_max_chars_per_segment(),
        }
    }
}

/// Tunables for one batch translation job.
///
/// The value is built once, validated, and passed into the orchestrator at job
/// start. Workers only read it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JobConfig {
    /// Units translated concurrently (1-20)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Rows per batch and per outer chunk (1-50)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Retries per batch after the first attempt (1-10)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Completed cells between checkpoints (10-1000)
    #[serde(default = "default_save_interval")]
    pub save_interval: usize,

    /// Completed cells between progress reports (1-100)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Fixed back-off between retries, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Batches larger than this are halved after a failed attempt
    #[serde(default = "default_split_threshold")]
    pub split_threshold: usize,

    /// How long a cancelled job waits for in-flight units, in seconds
    #[serde(default = "default_cancel_grace_secs")]
    pub cancel_grace_secs: u64,

    /// Treat cells holding a failure marker as empty on resume
    #[serde(default)]
    pub retranslate_markers: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            save_interval: default_save_interval(),
            progress_interval: default_progress_interval(),
            retry_backoff_ms: default_retry_backoff_ms(),
            split_threshold: default_split_threshold(),
            cancel_grace_secs: default_cancel_grace_secs(),
            retranslate_markers: false,
        }
    }
}

impl JobConfig {
    /// Reject out-of-range values before a run starts
    pub fn validate(&self) -> std::result::Result<(), TranslationError> {
        check_range("max_workers", self.max_workers, 1, 20)?;
        check_range("batch_size", self.batch_size, 1, 50)?;
        check_range("max_retries", self.max_retries as usize, 1, 10)?;
        check_range("save_interval", self.save_interval, 10, 1000)?;
        check_range("progress_interval", self.progress_interval, 1, 100)?;
        Ok(())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn cancel_grace_period(&self) -> Duration {
        Duration::from_secs(self.cancel_grace_secs)
    }
}

fn check_range(name: &str, value: usize, min: usize, max: usize) -> std::result::Result<(), TranslationError> {
    if value < min || value > max {
        return Err(TranslationError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_target_languages() -> Vec<String> {
    vec!["zh".to_string()]
}

fn default_glossary_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("lingobatch").join("glossary"))
        .unwrap_or_else(|| PathBuf::from("glossary"))
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_max_chars_per_segment() -> usize {
    1000
}

fn default_max_workers() -> usize {
    5
}

fn default_batch_size() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_save_interval() -> usize {
    100
}

fn default_progress_interval() -> usize {
    10
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_split_threshold() -> usize {
    10
}

fn default_cancel_grace_secs() -> u64 {
    30
}

fn default_endpoint(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::DeepSeek => "https://api.deepseek.com".to_string(),
        TranslationProvider::OpenAI => "https://api.openai.com/v1".to_string(),
        TranslationProvider::Anthropic => "https://api.anthropic.com".to_string(),
    }
}

fn default_model(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::DeepSeek => "deepseek-chat".to_string(),
        TranslationProvider::OpenAI => "gpt-4o-mini".to_string(),
        TranslationProvider::Anthropic => "claude-3-haiku-20240307".to_string(),
    }
}

impl Config {
    /// Load a config file, or write and return the defaults when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let config: Config = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok((config, false));
        }

        let config = Config::default();
        config.save(path)?;
        Ok((config, true))
    }

    /// Save the config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> std::result::Result<(), TranslationError> {
        crate::language_utils::get_language_name(&self.source_language)
            .map_err(|e| TranslationError::Validation(e.to_string()))?;

        if self.target_languages.is_empty() {
            return Err(TranslationError::Validation(
                "At least one target language must be selected".to_string(),
            ));
        }
        for target in &self.target_languages {
            crate::language_utils::get_language_name(target)
                .map_err(|e| TranslationError::Validation(e.to_string()))?;
        }

        if self.translation.get_api_key().trim().is_empty() {
            return Err(TranslationError::Validation(format!(
                "Translation API key is required for {} provider",
                self.translation.provider.display_name()
            )));
        }

        self.job.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_languages: default_target_languages(),
            translation: TranslationConfig::default(),
            job: JobConfig::default(),
            glossary_dir: default_glossary_dir(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, created on demand
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        if let Some(index) = self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            return &mut self.available_providers[index];
        }
        self.available_providers.push(ProviderConfig::new(self.provider));
        let last = self.available_providers.len() - 1;
        &mut self.available_providers[last]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.model.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_model(self.provider))
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.endpoint.clone())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| default_endpoint(self.provider))
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout(&self) -> Duration {
        let secs = self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|s| *s > 0)
            .unwrap_or_else(default_timeout_secs);
        Duration::from_secs(secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::DeepSeek),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
