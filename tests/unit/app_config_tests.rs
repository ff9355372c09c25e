/*!
 * Tests for configuration loading and validation
 */

use lingobatch::app_config::{Config, JobConfig, TranslationProvider};
use lingobatch::errors::TranslationError;

use crate::common::create_temp_dir;

fn valid_config() -> Config {
    let mut config = Config::default();
    config.translation.active_provider_config_mut().api_key = "sk-test".to_string();
    config
}

#[test]
fn test_loadOrCreate_whenMissing_shouldWriteDefaults() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let (config, created) = Config::load_or_create(&path).unwrap();
    assert!(created);
    assert!(path.exists());
    assert_eq!(config.translation.provider, TranslationProvider::DeepSeek);

    let (reloaded, created) = Config::load_or_create(&path).unwrap();
    assert!(!created);
    assert_eq!(reloaded.job, config.job);
}

#[test]
fn test_load_withPartialJobSection_shouldFillDefaults() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "source_language": "en",
            "target_languages": ["fr", "de"],
            "translation": { "provider": "openai", "available_providers": [] },
            "job": { "max_workers": 8 }
        }"#,
    )
    .unwrap();

    let (config, _) = Config::load_or_create(&path).unwrap();
    assert_eq!(config.job.max_workers, 8);
    assert_eq!(config.job.batch_size, 10);
    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation.get_model(), "gpt-4o-mini");
    assert_eq!(config.target_languages, vec!["fr".to_string(), "de".to_string()]);
}

#[test]
fn test_validate_withoutApiKey_shouldFail() {
    let config = Config::default();
    assert!(matches!(config.validate(), Err(TranslationError::Validation(_))));
    assert!(valid_config().validate().is_ok());
}

#[test]
fn test_validate_withUnknownTarget_shouldFail() {
    let mut config = valid_config();
    config.target_languages = vec!["fr".to_string(), "qq".to_string()];
    assert!(config.validate().is_err());

    config.target_languages.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_jobConfigValidate_atRangeEdges_shouldAccept() {
    let edges = JobConfig {
        max_workers: 20,
        batch_size: 50,
        max_retries: 1,
        save_interval: 1000,
        progress_interval: 1,
        ..JobConfig::default()
    };
    assert!(edges.validate().is_ok());

    let lower = JobConfig {
        max_workers: 1,
        batch_size: 1,
        max_retries: 10,
        save_interval: 10,
        progress_interval: 100,
        ..JobConfig::default()
    };
    assert!(lower.validate().is_ok());
}
