/*!
 * Error types for the lingobatch application.
 *
 * Provider errors describe a single endpoint call, translation errors describe
 * a whole job, document errors describe reading and writing the files the
 * jobs operate on. All of them use thiserror.
 */

use thiserror::Error;

/// Errors that can occur when talking to a completion endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid or unauthorized credential
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Insufficient balance or quota on the remote service
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
}

impl ProviderError {
    /// Fatal errors abort the whole job and are never retried
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthenticationError(_) | Self::QuotaExceeded(_))
    }

    /// Classify a non-success HTTP response
    pub fn from_status(status_code: u16, body: &str) -> Self {
        let lowered = body.to_lowercase();
        if lowered.contains("insufficient balance") || lowered.contains("insufficient_quota") {
            return Self::QuotaExceeded(body.to_string());
        }

        match status_code {
            401 | 403 => Self::AuthenticationError(body.to_string()),
            402 => Self::QuotaExceeded(body.to_string()),
            429 => Self::RateLimitExceeded(body.to_string()),
            _ => Self::ApiError {
                status_code,
                message: body.to_string(),
            },
        }
    }
}

/// Errors raised by document adapters
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Underlying file system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is not present in the header row
    #[error("Column not found: {0}")]
    MissingColumn(String),

    /// Subtitle content could not be parsed
    #[error("Malformed subtitle: {0}")]
    MalformedSubtitle(String),

    /// Row or column outside the document
    #[error("Cell out of range: row {row}, column {column}")]
    OutOfRange {
        /// Row index
        row: usize,
        /// Column index
        column: usize,
    },

    /// Operation the document type cannot perform
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Job-level errors surfaced to the caller of the orchestrator
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Invalid or unauthorized credential; the job was aborted
    #[error("Authentication failed, check the API key: {0}")]
    Auth(String),

    /// Insufficient balance or quota; the job was aborted
    #[error("Insufficient balance or quota on the translation service: {0}")]
    Quota(String),

    /// Bad configuration or missing selection, raised before any job starts
    #[error("Validation error: {0}")]
    Validation(String),

    /// Document could not be read, prepared or saved
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Job was used outside its lifecycle
    #[error("Invalid job state: {0}")]
    InvalidState(String),

    /// Unexpected failure while setting up or dispatching the job
    #[error("Job setup failed: {0}")]
    Setup(String),
}

impl From<ProviderError> for TranslationError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::AuthenticationError(message) => Self::Auth(message),
            ProviderError::QuotaExceeded(message) => Self::Quota(message),
            other => Self::Setup(other.to_string()),
        }
    }
}
