use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use log::{debug, warn};

use crate::errors::DocumentError;

use super::DocumentAdapter;

// @module: Subtitle documents (SRT and ASS)

// @const: SRT timestamp regex, accepting ',' or '.' before milliseconds
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("valid timestamp pattern")
});

/// Column holding the original text
pub const TEXT_COLUMN: usize = 0;
/// Column holding the translation
pub const TRANSLATION_COLUMN: usize = 1;

/// Fields before the text in an ASS `Dialogue:` line
const ASS_FIELDS_BEFORE_TEXT: usize = 9;

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Parse an SRT timestamp (HH:MM:SS,mmm) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64, DocumentError> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();
        let invalid = || DocumentError::MalformedSubtitle(format!("Invalid timestamp: {}", timestamp));

        if parts.len() != 4 {
            return Err(invalid());
        }

        let mut values = [0u64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part.parse().map_err(|_| invalid())?;
        }
        let [hours, minutes, seconds, fraction] = values;
        // ASS uses centiseconds
        let millis = match parts[3].len() {
            1 => fraction * 100,
            2 => fraction * 10,
            _ => fraction,
        };

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(invalid());
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    fn write_srt(&self, f: &mut impl fmt::Write, text: &str) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        )?;
        writeln!(f, "{}", text)?;
        writeln!(f)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_srt(f, &self.text)
    }
}

/// Supported subtitle file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Ass,
}

impl SubtitleFormat {
    /// Detect the format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "srt" => Some(Self::Srt),
            "ass" | "ssa" => Some(Self::Ass),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
        }
    }
}

/// Line of an ASS script, kept for lossless rendering
#[derive(Debug, Clone, PartialEq)]
enum AssLine {
    Raw(String),
    Dialogue { prefix: String, entry: usize },
}

/// Subtitle file viewed as a two-column document: text and translation.
///
/// Only one target language fits in a subtitle file; rendering writes the
/// translation where present and the original text elsewhere.
#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    format: SubtitleFormat,
    entries: Vec<SubtitleEntry>,
    translations: Vec<Option<String>>,
    target_language: Option<String>,
    ass_lines: Vec<AssLine>,
}

impl SubtitleDocument {
    /// Parse SRT content
    pub fn parse_srt(content: &str) -> Result<Self, DocumentError> {
        let entries = parse_srt_string(content)?;
        Ok(Self::from_entries(SubtitleFormat::Srt, entries, Vec::new()))
    }

    /// Parse ASS content; every `Dialogue:` line becomes an entry
    pub fn parse_ass(content: &str) -> Result<Self, DocumentError> {
        let mut entries = Vec::new();
        let mut lines = Vec::new();

        for line in content.lines() {
            let Some(body) = line.strip_prefix("Dialogue:") else {
                lines.push(AssLine::Raw(line.to_string()));
                continue;
            };

            let fields: Vec<&str> = body.splitn(ASS_FIELDS_BEFORE_TEXT + 1, ',').collect();
            if fields.len() <= ASS_FIELDS_BEFORE_TEXT {
                warn!("Keeping dialogue line with too few fields as-is: {}", line);
                lines.push(AssLine::Raw(line.to_string()));
                continue;
            }

            let text = fields[ASS_FIELDS_BEFORE_TEXT];
            let prefix_len = line.len() - text.len();
            let start = SubtitleEntry::parse_timestamp(fields[1]).unwrap_or(0);
            let end = SubtitleEntry::parse_timestamp(fields[2]).unwrap_or(start);

            lines.push(AssLine::Dialogue {
                prefix: line[..prefix_len].to_string(),
                entry: entries.len(),
            });
            entries.push(SubtitleEntry::new(entries.len() + 1, start, end, text.to_string()));
        }

        if entries.is_empty() {
            return Err(DocumentError::MalformedSubtitle(
                "No Dialogue lines found in ASS content".to_string(),
            ));
        }
        Ok(Self::from_entries(SubtitleFormat::Ass, entries, lines))
    }

    /// Load a subtitle file, picking the parser from its extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let format = SubtitleFormat::from_path(path).ok_or_else(|| {
            DocumentError::Unsupported(format!("Unknown subtitle format: {:?}", path))
        })?;
        let content = std::fs::read_to_string(path)?;
        let content = content.trim_start_matches('\u{feff}');
        match format {
            SubtitleFormat::Srt => Self::parse_srt(content),
            SubtitleFormat::Ass => Self::parse_ass(content),
        }
    }

    fn from_entries(format: SubtitleFormat, entries: Vec<SubtitleEntry>, ass_lines: Vec<AssLine>) -> Self {
        let translations = vec![None; entries.len()];
        Self {
            format,
            entries,
            translations,
            target_language: None,
            ass_lines,
        }
    }

    pub fn format(&self) -> SubtitleFormat {
        self.format
    }

    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    fn output_text(&self, index: usize) -> &str {
        self.translations[index]
            .as_deref()
            .unwrap_or(self.entries[index].text.as_str())
    }

    fn render_srt(&self) -> String {
        let mut output = String::new();
        for (index, entry) in self.entries.iter().enumerate() {
            // Writing into a String cannot fail
            let _ = entry.write_srt(&mut output, self.output_text(index));
        }
        output
    }

    fn render_ass(&self) -> String {
        let mut output = String::new();
        for line in &self.ass_lines {
            match line {
                AssLine::Raw(raw) => output.push_str(raw),
                AssLine::Dialogue { prefix, entry } => {
                    output.push_str(prefix);
                    output.push_str(&self.output_text(*entry).replace('\n', "\\N"));
                }
            }
            output.push('\n');
        }
        output
    }
}

impl DocumentAdapter for SubtitleDocument {
    fn enumerate_rows(&self) -> Vec<usize> {
        (0..self.entries.len()).collect()
    }

    fn source_column(&self, _source_language: &str) -> Result<usize, DocumentError> {
        Ok(TEXT_COLUMN)
    }

    fn find_column(&self, language: &str) -> Option<usize> {
        match &self.target_language {
            Some(target) if crate::language_utils::header_matches_language(target, language) => {
                Some(TRANSLATION_COLUMN)
            }
            _ => None,
        }
    }

    fn target_column(&mut self, language: &str) -> Result<usize, DocumentError> {
        if let Some(column) = self.find_column(language) {
            return Ok(column);
        }
        if let Some(existing) = &self.target_language {
            return Err(DocumentError::Unsupported(format!(
                "Subtitle documents hold one target language; {} is already set, got {}",
                existing, language
            )));
        }
        self.target_language = Some(language.to_string());
        Ok(TRANSLATION_COLUMN)
    }

    fn read_cell(&self, row: usize, column: usize) -> Option<&str> {
        match column {
            TEXT_COLUMN => self.entries.get(row).map(|entry| entry.text.as_str()),
            TRANSLATION_COLUMN => self.translations.get(row).map(|t| t.as_deref().unwrap_or("")),
            _ => None,
        }
    }

    fn write_cell(&mut self, row: usize, column: usize, text: &str) -> Result<(), DocumentError> {
        match column {
            TEXT_COLUMN => {
                let entry = self.entries.get_mut(row).ok_or(DocumentError::OutOfRange { row, column })?;
                entry.text = text.to_string();
            }
            TRANSLATION_COLUMN => {
                let slot = self.translations.get_mut(row).ok_or(DocumentError::OutOfRange { row, column })?;
                *slot = Some(text.to_string());
            }
            _ => return Err(DocumentError::OutOfRange { row, column }),
        }
        Ok(())
    }

    fn render(&self) -> Result<Vec<u8>, DocumentError> {
        let text = match self.format {
            SubtitleFormat::Srt => self.render_srt(),
            SubtitleFormat::Ass => self.render_ass(),
        };
        Ok(text.into_bytes())
    }

    fn extension(&self) -> &str {
        self.format.extension()
    }
}

/// Parse SRT content with a line state machine.
///
/// Malformed blocks are skipped with a warning; content without any valid
/// block is an error.
pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>, DocumentError> {
    let mut entries = Vec::new();

    let mut current_seq_num: Option<usize> = None;
    let mut current_times: Option<(u64, u64)> = None;
    let mut current_text = String::new();

    let mut flush = |seq_num: Option<usize>, times: Option<(u64, u64)>, text: &mut String| {
        if let (Some(seq_num), Some((start, end))) = (seq_num, times) {
            if text.trim().is_empty() {
                warn!("Skipping empty subtitle entry {}", seq_num);
            } else if end < start {
                warn!("Skipping subtitle entry {} with end before start", seq_num);
            } else {
                entries.push(SubtitleEntry::new(seq_num, start, end, text.trim().to_string()));
            }
        }
        text.clear();
    };

    for (line_number, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if current_times.is_some() && !current_text.is_empty() {
                flush(current_seq_num.take(), current_times.take(), &mut current_text);
            }
            continue;
        }

        if current_seq_num.is_none() && current_text.is_empty() {
            if let Ok(num) = trimmed.parse::<usize>() {
                current_seq_num = Some(num);
                continue;
            }
        }

        if current_seq_num.is_some() && current_times.is_none() {
            if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                let start = format!("{}:{}:{},{}", &caps[1], &caps[2], &caps[3], &caps[4]);
                let end = format!("{}:{}:{},{}", &caps[5], &caps[6], &caps[7], &caps[8]);
                match (SubtitleEntry::parse_timestamp(&start), SubtitleEntry::parse_timestamp(&end)) {
                    (Ok(start_ms), Ok(end_ms)) => {
                        current_times = Some((start_ms, end_ms));
                        continue;
                    }
                    _ => warn!("Invalid timestamp at line {}: {}", line_number + 1, trimmed),
                }
            }
        }

        if current_seq_num.is_some() && current_times.is_some() {
            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        } else {
            warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_number + 1, trimmed);
            current_seq_num = None;
        }
    }
    flush(current_seq_num, current_times, &mut current_text);

    if entries.is_empty() {
        return Err(DocumentError::MalformedSubtitle(
            "No valid subtitle entries were found in the SRT content".to_string(),
        ));
    }
    debug!("Parsed {} subtitle entries", entries.len());
    Ok(entries)
}
