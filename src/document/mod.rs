/*!
 * Document adapters consumed by the job orchestrator.
 *
 * A document is a grid of cells addressed by `(row, column)`. Rows are the
 * translatable records (spreadsheet data rows, subtitle entries); columns
 * hold the source text, optional reference translations, and one column per
 * target language.
 *
 * - `spreadsheet`: CSV sheets with a header row naming each language
 * - `subtitle`: SRT and ASS subtitle files
 */

use std::path::Path;

use crate::errors::DocumentError;
use crate::file_utils::FileManager;

pub mod spreadsheet;
pub mod subtitle;

pub use spreadsheet::{load_reference_map, Spreadsheet};
pub use subtitle::{SubtitleDocument, SubtitleEntry, SubtitleFormat};

/// Cell-level access to a translatable document
pub trait DocumentAdapter: Send + 'static {
    /// Identifiers of every data row, in document order
    fn enumerate_rows(&self) -> Vec<usize>;

    /// Column holding the text to translate
    fn source_column(&self, source_language: &str) -> Result<usize, DocumentError>;

    /// Existing column for a language, if any
    fn find_column(&self, language: &str) -> Option<usize>;

    /// Column receiving translations into `language`, created when missing
    fn target_column(&mut self, language: &str) -> Result<usize, DocumentError>;

    /// Cell content; `None` when the cell does not exist
    fn read_cell(&self, row: usize, column: usize) -> Option<&str>;

    /// Overwrite one cell
    fn write_cell(&mut self, row: usize, column: usize, text: &str) -> Result<(), DocumentError>;

    /// Serialize the whole document in its file format
    fn render(&self) -> Result<Vec<u8>, DocumentError>;

    /// File extension of the rendered format, without the dot
    fn extension(&self) -> &str;

    /// Write the rendered document through a temp file and rename
    fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let bytes = self.render()?;
        FileManager::write_atomic(path, &bytes)?;
        Ok(())
    }
}
