/*!
 * Tests for application configuration functionality
 */

use fictrans::app_config::{Config, LogLevel};
use fictrans::providers::Backend;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.target_language, "zh-CN");
    assert_eq!(config.translation.backend, Backend::Original);
    assert_eq!(config.translation.batch_size, 5);
    assert_eq!(config.translation.max_batch_size, 50);
    assert_eq!(config.translation.context_window, 2);
    assert!(config.translation.include_tags);
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.base_delay_ms, 2000);
    assert_eq!(config.retry.max_jitter_ms, 500);
    assert_eq!(config.reconcile.similarity_warning_threshold, 20);
    assert!(!config.autosave.enabled);
    assert_eq!(config.autosave.interval_minutes, 30);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.target_language = "xyz".to_string();
    assert!(config.validate().is_err());

    config.target_language = "pt-BR".to_string();
    assert!(config.validate().is_ok());

    config.target_language = "original".to_string();
    assert!(config.validate().is_ok());

    config.model = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_fromFile_withPartialJson_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{
            "target_language": "de",
            "model": "my-model",
            "log_level": "debug",
            "retry": { "max_retries": 5 },
            "autosave": { "enabled": true, "backup_dir": "/tmp/fictrans-backups" }
        }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.target_language, "de");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.base_delay_ms, 2000);
    assert!(config.autosave.enabled);
    assert_eq!(config.autosave.interval().as_secs(), 30 * 60);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_fromFile_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_config_retryPolicy_shouldMirrorRetrySection() {
    let mut config = Config::default();
    config.retry.max_retries = 4;
    config.retry.base_delay_ms = 100;

    let policy = config.retry_policy();
    assert_eq!(policy.attempts(), 4);
    assert_eq!(policy.base_backoff(2).as_millis(), 400);
}
