use super::*;
use crate::core::errors::QualgateError;

fn expect_validation_error<T: std::fmt::Debug>(result: Result<T>) -> QualgateError {
    result.expect_err("expected validation failure")
}

#[test]
fn default_configs_validate_successfully() {
    QualgateConfig::default()
        .validate()
        .expect("qualgate default");
    IndexingConfig::default()
        .validate()
        .expect("indexing default");
    StoreConfig::default().validate().expect("store default");
    LoggingConfig::default()
        .validate()
        .expect("logging default");
}

#[test]
fn indexing_config_rejects_zero_limits() {
    let mut config = IndexingConfig::default();
    config.bulk_size = 0;
    let err = expect_validation_error(config.validate());
    assert!(
        format!("{err}").contains("bulk_size"),
        "unexpected error message: {err}"
    );

    config.bulk_size = 10;
    config.delete_chunk_size = 0;
    let err = expect_validation_error(config.validate());
    assert!(matches!(err, QualgateError::Validation { .. }));
}

#[test]
fn logging_config_rejects_blank_level() {
    let config = LoggingConfig {
        level: "  ".to_string(),
        format: LogFormat::Json,
    };
    let err = expect_validation_error(config.validate());
    assert!(format!("{err}").contains("logging.level"));
}

#[test]
fn partial_yaml_falls_back_to_defaults() {
    let yaml = "indexing:\n  bulk_size: 42\nlogging:\n  format: json\n";
    let config: QualgateConfig = serde_yaml::from_str(yaml).expect("parse yaml");

    assert_eq!(config.indexing.bulk_size, 42);
    assert_eq!(config.indexing.delete_chunk_size, 1000);
    assert!(!config.indexing.force_startup_indexing);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.store.busy_timeout_ms, 5_000);
}

#[test]
fn yaml_file_round_trip_preserves_settings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("qualgate.yml");

    let mut config = QualgateConfig::default();
    config.indexing.force_startup_indexing = true;
    config.store.path = dir.path().join("store.db");
    config.to_yaml_file(&path).expect("write config");

    let loaded = QualgateConfig::from_yaml_file(&path).expect("read config");
    assert!(loaded.indexing.force_startup_indexing);
    assert_eq!(loaded.store.path, dir.path().join("store.db"));
}

#[test]
fn missing_config_file_is_io_error() {
    let err = QualgateConfig::from_yaml_file("/definitely/not/here.yml").unwrap_err();
    assert!(matches!(err, QualgateError::Io { .. }));
}
