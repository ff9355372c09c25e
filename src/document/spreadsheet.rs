/*!
 * CSV spreadsheet documents.
 *
 * The first record is the header row. Columns are matched to languages by
 * header, so a sheet with headers `English,French` translates English into
 * French and a missing target column is appended on demand.
 */

use log::debug;
use std::collections::HashMap;
use std::path::Path;

use crate::errors::DocumentError;
use crate::file_utils::FileManager;
use crate::language_utils::header_matches_language;

use super::DocumentAdapter;

/// In-memory CSV sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Spreadsheet {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    delimiter: u8,
}

impl Spreadsheet {
    /// Build a sheet from headers and rows; short rows are padded
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut sheet = Self {
            headers,
            rows,
            delimiter: b',',
        };
        sheet.normalize_width();
        sheet
    }

    /// Parse CSV text with a header row
    pub fn parse(content: &str) -> Result<Self, DocumentError> {
        Self::parse_with_delimiter(content, b',')
    }

    pub fn parse_with_delimiter(content: &str, delimiter: u8) -> Result<Self, DocumentError> {
        let content = FileManager::strip_bom(content.to_string());
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let mut sheet = Self::new(headers, rows);
        sheet.delimiter = delimiter;
        debug!("Parsed sheet with {} columns and {} rows", sheet.headers.len(), sheet.rows.len());
        Ok(sheet)
    }

    /// Load a sheet from disk; `.tsv` files use tabs
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_tsv = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("tsv"));
        Self::parse_with_delimiter(&content, if is_tsv { b'\t' } else { b',' })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn normalize_width(&mut self) {
        let width = self
            .rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.headers.len());
        while self.headers.len() < width {
            self.headers.push(String::new());
        }
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
    }
}

impl DocumentAdapter for Spreadsheet {
    fn enumerate_rows(&self) -> Vec<usize> {
        (0..self.rows.len()).collect()
    }

    fn source_column(&self, source_language: &str) -> Result<usize, DocumentError> {
        self.find_column(source_language)
            .ok_or_else(|| DocumentError::MissingColumn(source_language.to_string()))
    }

    fn find_column(&self, language: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| header_matches_language(header, language))
    }

    fn target_column(&mut self, language: &str) -> Result<usize, DocumentError> {
        if let Some(column) = self.find_column(language) {
            return Ok(column);
        }
        self.headers.push(language.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        Ok(self.headers.len() - 1)
    }

    fn read_cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    fn write_cell(&mut self, row: usize, column: usize, text: &str) -> Result<(), DocumentError> {
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(column))
            .ok_or(DocumentError::OutOfRange { row, column })?;
        *cell = text.to_string();
        Ok(())
    }

    fn render(&self) -> Result<Vec<u8>, DocumentError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| DocumentError::Io(e.into_error()))
    }

    fn extension(&self) -> &str {
        if self.delimiter == b'\t' { "tsv" } else { "csv" }
    }
}

/// Read a second sheet mapping source texts to reference translations.
///
/// Rows where either cell is empty are skipped; on duplicate source texts the
/// first row wins.
pub fn load_reference_map<P: AsRef<Path>>(
    path: P,
    source_language: &str,
    reference_language: &str,
) -> Result<HashMap<String, String>, DocumentError> {
    let sheet = Spreadsheet::from_path(path)?;
    let source = sheet.source_column(source_language)?;
    let reference = sheet
        .find_column(reference_language)
        .ok_or_else(|| DocumentError::MissingColumn(reference_language.to_string()))?;

    let mut map = HashMap::new();
    for row in sheet.enumerate_rows() {
        let text = sheet.read_cell(row, source).unwrap_or_default().trim();
        let translation = sheet.read_cell(row, reference).unwrap_or_default().trim();
        if !text.is_empty() && !translation.is_empty() {
            map.entry(text.to_string()).or_insert_with(|| translation.to_string());
        }
    }
    debug!("Loaded {} reference translations", map.len());
    Ok(map)
}
