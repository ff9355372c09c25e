/*!
 * Common test utilities for the lingobatch test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use lingobatch::app_config::JobConfig;
use lingobatch::document::Spreadsheet;


/// Routes library logs to the test output, once per binary
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Sheet with an `English` column holding `row 0` .. `row {rows-1}`
pub fn sample_sheet(rows: usize) -> Spreadsheet {
    Spreadsheet::new(
        vec!["English".to_string()],
        (0..rows).map(|i| vec![format!("row {}", i)]).collect(),
    )
}

/// CSV text of `sample_sheet`
pub fn sample_sheet_csv(rows: usize) -> String {
    let mut content = String::from("English\n");
    for i in 0..rows {
        content.push_str(&format!("row {}\n", i));
    }
    content
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
"#;
    create_test_file(dir, filename, content)
}

/// Job settings without back-off so retries run instantly
pub fn fast_job_config() -> JobConfig {
    JobConfig {
        retry_backoff_ms: 0,
        ..JobConfig::default()
    }
}
