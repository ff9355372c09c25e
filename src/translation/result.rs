/*!
 * Per-item translation results and the in-band failure markers.
 */

use std::fmt;

/// Why an item carries a marker instead of a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Retries were exhausted on a transient error
    TranslationError,
    /// The job was cancelled before the item was sent
    Cancelled,
    /// The response had no line for this item
    FormatError,
    /// The client returned fewer results than items
    Missing,
}

impl FailureKind {
    /// Literal written into the output cell
    pub fn marker(&self) -> &'static str {
        match self {
            Self::TranslationError => "[translation-error]",
            Self::Cancelled => "[cancelled]",
            Self::FormatError => "[format-error]",
            Self::Missing => "[missing-translation]",
        }
    }

    /// Parse failures are worth another attempt, the rest are final
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::FormatError | Self::Missing)
    }

    pub const ALL: [FailureKind; 4] = [
        Self::TranslationError,
        Self::Cancelled,
        Self::FormatError,
        Self::Missing,
    ];
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Whether a cell value is one of the failure markers
pub fn is_marker(value: &str) -> bool {
    let value = value.trim();
    FailureKind::ALL.iter().any(|kind| kind.marker() == value)
}

/// Outcome for one source text
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    /// The source text
    pub text: String,
    /// The translation, or the marker literal when `error_kind` is set
    pub translation: String,
    /// Set when the item failed
    pub error_kind: Option<FailureKind>,
}

impl TranslationResult {
    pub fn translated(text: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            translation: translation.into(),
            error_kind: None,
        }
    }

    pub fn failed(text: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            text: text.into(),
            translation: kind.marker().to_string(),
            error_kind: Some(kind),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }
}
