/*!
 * Controller workflows end to end with a mock completion backend
 */

use std::path::Path;
use std::sync::Arc;

use lingobatch::app_config::Config;
use lingobatch::app_controller::{Controller, SheetOptions, SubtitleOptions};
use lingobatch::document::{DocumentAdapter, Spreadsheet};
use lingobatch::errors::TranslationError;
use lingobatch::providers::mock::MockProvider;
use lingobatch::translation::JobOutcome;

use crate::common::{
    create_temp_dir, create_test_file, create_test_subtitle, fast_job_config, init_test_logging, sample_sheet_csv,
};

fn test_config(glossary_dir: &Path, targets: &[&str]) -> Config {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_languages = targets.iter().map(|t| t.to_string()).collect();
    config.glossary_dir = glossary_dir.to_path_buf();
    config.job = fast_job_config();
    config.translation.active_provider_config_mut().api_key = "sk-test".to_string();
    config
}

fn controller(config: Config, provider: MockProvider) -> Controller {
    Controller::with_backend(config, Arc::new(provider))
}

#[tokio::test]
async fn test_runSheet_withTwoTargets_shouldWriteTranslatedSheet() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "data.csv", &sample_sheet_csv(12)).unwrap();
    let controller = controller(test_config(dir.path(), &["fr", "de"]), MockProvider::working());

    let summaries = controller.run_sheet(&input, &SheetOptions::default()).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].outcome, JobOutcome::Completed);
    assert_eq!(summaries[0].completed, 24);

    let output = dir.path().join("data.translated.csv");
    let sheet = Spreadsheet::from_path(&output).unwrap();
    assert_eq!(sheet.headers(), &["English", "fr", "de"]);
    assert_eq!(sheet.read_cell(3, 1), Some("[French] row 3"));
    assert_eq!(sheet.read_cell(11, 2), Some("[German] row 11"));
}

#[tokio::test]
async fn test_runSheet_twice_shouldResumeFromOutput() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "data.csv", &sample_sheet_csv(5)).unwrap();
    let provider = MockProvider::working();
    let counter = provider.clone();
    let controller = controller(test_config(dir.path(), &["fr"]), provider);

    controller.run_sheet(&input, &SheetOptions::default()).await.unwrap();
    assert!(dir.path().join("data.fr.csv").exists());
    let calls = counter.request_count();

    let summaries = controller.run_sheet(&input, &SheetOptions::default()).await.unwrap();
    assert_eq!(summaries[0].total, 0);
    assert_eq!(summaries[0].already_translated, 5);
    assert_eq!(counter.request_count(), calls);

    let forced = SheetOptions { force_overwrite: true, ..SheetOptions::default() };
    let summaries = controller.run_sheet(&input, &forced).await.unwrap();
    assert_eq!(summaries[0].total, 5);
}

#[tokio::test]
async fn test_runSheet_withReferenceFile_requiresReferenceLanguage() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "data.csv", &sample_sheet_csv(2)).unwrap();
    let refs = create_test_file(dir.path(), "refs.csv", "English,Spanish\nrow 0,fila 0\n").unwrap();
    let controller = controller(test_config(dir.path(), &["fr"]), MockProvider::working());

    let missing_language = SheetOptions { reference_file: Some(refs.clone()), ..SheetOptions::default() };
    assert!(controller.run_sheet(&input, &missing_language).await.is_err());

    let options = SheetOptions {
        reference_file: Some(refs),
        reference_language: Some("es".to_string()),
        ..SheetOptions::default()
    };
    let summaries = controller.run_sheet(&input, &options).await.unwrap();
    assert_eq!(summaries[0].completed, 2);
}

#[tokio::test]
async fn test_runSheet_withDirectory_shouldSkipGeneratedOutputs() {
    let dir = create_temp_dir().unwrap();
    let out = create_temp_dir().unwrap();
    create_test_file(dir.path(), "a.csv", &sample_sheet_csv(3)).unwrap();
    create_test_file(dir.path(), "b.csv", &sample_sheet_csv(4)).unwrap();
    create_test_file(dir.path(), "old.fr.csv", &sample_sheet_csv(1)).unwrap();
    let controller = controller(test_config(dir.path(), &["fr"]), MockProvider::working());

    let options = SheetOptions { output_dir: Some(out.path().to_path_buf()), ..SheetOptions::default() };
    let summaries = controller.run_sheet(dir.path(), &options).await.unwrap();

    assert_eq!(summaries.len(), 2);
    assert!(out.path().join("a.fr.csv").exists());
    assert!(out.path().join("b.fr.csv").exists());
}

#[tokio::test]
async fn test_runSheet_withUnauthorized_shouldSurfaceAuthError() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(dir.path(), "data.csv", &sample_sheet_csv(5)).unwrap();
    let provider = MockProvider::unauthorized();
    let counter = provider.clone();
    let controller = controller(test_config(dir.path(), &["fr"]), provider);

    let error = controller.run_sheet(&input, &SheetOptions::default()).await.unwrap_err();
    assert!(matches!(error.downcast_ref::<TranslationError>(), Some(TranslationError::Auth(_))));
    assert_eq!(counter.request_count(), 1);
}

#[tokio::test]
async fn test_runSubtitle_shouldWriteOneFilePerLanguage() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_subtitle(dir.path(), "movie.srt").unwrap();
    let controller = controller(test_config(dir.path(), &["fr", "es"]), MockProvider::working());

    let summaries = controller.run_subtitle(&input, &SubtitleOptions::default()).await.unwrap();
    assert_eq!(summaries.len(), 2);

    let french = std::fs::read_to_string(dir.path().join("movie.fr.srt")).unwrap();
    assert!(french.contains("00:00:01,000 --> 00:00:04,000\n[French] This is a test subtitle."));
    let spanish = std::fs::read_to_string(dir.path().join("movie.es.srt")).unwrap();
    assert!(spanish.contains("[Spanish] For testing purposes."));

    // Existing outputs are skipped without force
    let again = controller.run_subtitle(&input, &SubtitleOptions::default()).await.unwrap();
    assert!(again.is_empty());
}

#[test]
fn test_runText_shouldTranslateIntoEveryTarget() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let controller = controller(test_config(dir.path(), &["fr", "de"]), MockProvider::working());
    controller.glossary_store().add_term("en", "fr", "engine", "moteur").unwrap();

    let results = tokio_test::block_on(controller.run_text("The engine\nstarts")).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "fr");
    assert_eq!(results[0].1, "[translated] The engine\nstarts");
    assert!(dir.path().join("fr_en.json").exists());
}

#[tokio::test]
async fn test_runSubtitle_withMultiLineEntry_shouldKeepBothLines() {
    let dir = create_temp_dir().unwrap();
    let input = create_test_file(
        dir.path(),
        "talk.srt",
        "1\n00:00:01,000 --> 00:00:02,000\nTwo\nlines\n\n2\n00:00:03,000 --> 00:00:04,000\nOne line\n",
    )
    .unwrap();
    let controller = controller(test_config(dir.path(), &["fr"]), MockProvider::working());

    let summaries = controller.run_subtitle(&input, &SubtitleOptions::default()).await.unwrap();
    assert_eq!(summaries[0].completed, 2);

    let french = std::fs::read_to_string(dir.path().join("talk.fr.srt")).unwrap();
    assert!(french.contains("00:00:01,000 --> 00:00:02,000\n[French] Two\nlines\n"));
    assert!(french.contains("00:00:03,000 --> 00:00:04,000\n[French] One line"));
}

#[test]
fn test_runText_withInsufficientBalance_shouldStopAtConnectionCheck() {
    let dir = create_temp_dir().unwrap();
    let provider = MockProvider::insufficient_balance();
    let counter = provider.clone();
    let controller = controller(test_config(dir.path(), &["fr", "de"]), provider);

    let error = tokio_test::block_on(controller.run_text("Hello")).unwrap_err();
    assert!(matches!(error.downcast_ref::<TranslationError>(), Some(TranslationError::Quota(_))));
    assert_eq!(counter.request_count(), 1);
}
