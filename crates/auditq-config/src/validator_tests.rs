use super::*;
use crate::schema::PriorityRule;

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid(), "{:?}", result.errors);
}

#[test]
fn test_validate_zero_concurrency() {
    let mut config = Config::default();
    config.queue.max_concurrent = 0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "queue.max_concurrent"));
}

#[test]
fn test_validate_high_concurrency_warning() {
    let mut config = Config::default();
    config.queue.max_concurrent = 200;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(!result.warnings.is_empty());
}

#[test]
fn test_validate_zero_intervals() {
    let mut config = Config::default();
    config.queue.hard_timeout_ms = 0;
    config.monitor.sample_interval_ms = 0;
    config.persistence.auto_save_interval_ms = 0;

    let result = ConfigValidator::validate(&config).unwrap();
    let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
    assert!(paths.contains(&"queue.hard_timeout_ms"));
    assert!(paths.contains(&"monitor.sample_interval_ms"));
    assert!(paths.contains(&"persistence.auto_save_interval_ms"));
}

#[test]
fn test_validate_inverted_thresholds() {
    let mut config = Config::default();
    config.backpressure.activation_threshold = 0.5;
    config.backpressure.deactivation_threshold = 0.7;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(
        result
            .errors
            .iter()
            .any(|e| e.path == "backpressure.deactivation_threshold")
    );
}

#[test]
fn test_validate_threshold_range() {
    let mut config = Config::default();
    config.backpressure.activation_threshold = 1.5;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(
        result
            .errors
            .iter()
            .any(|e| e.path == "backpressure.activation_threshold")
    );
}

#[test]
fn test_validate_delay_range() {
    let mut config = Config::default();
    config.backpressure.min_delay_ms = 10_000;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "backpressure.min_delay_ms"));
}

#[test]
fn test_validate_backpressure_against_global_timeout() {
    let mut config = Config::default();
    config.queue.global_timeout_ms = 4000;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.path == "backpressure.max_delay_ms")
    );

    config.backpressure.enabled = false;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(
        !result
            .warnings
            .iter()
            .any(|w| w.path == "backpressure.max_delay_ms")
    );
}

#[test]
fn test_validate_queue_size_below_worker_count() {
    let mut config = Config::default();
    config.backpressure.max_queue_size = 3;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.path == "backpressure.max_queue_size")
    );
}

#[test]
fn test_validate_state_id_characters() {
    let mut config = Config::default();
    config.persistence.state_id = Some("nightly.v2".to_string());

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "persistence.state_id"));

    config.persistence.state_id = Some("nightly_v2".to_string());
    assert!(ConfigValidator::validate(&config).unwrap().is_valid());
}

#[test]
fn test_validate_memory_thresholds() {
    let mut config = Config::default();
    config.monitor.memory_warning_mb = 2000.0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "monitor.memory_warning_mb"));
}

#[test]
fn test_validate_empty_priority_pattern() {
    let mut config = Config::default();
    config.queue.priority_patterns.push(PriorityRule::new("", 5));

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(
        result
            .errors
            .iter()
            .any(|e| e.path == "queue.priority_patterns[0].pattern")
    );
}

#[test]
fn test_into_result() {
    let mut config = Config::default();
    config.queue.max_concurrent = 0;

    let err = ConfigValidator::validate(&config)
        .unwrap()
        .into_result()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "queue.max_concurrent"));

    let warnings = ConfigValidator::validate(&Config::default())
        .unwrap()
        .into_result()
        .unwrap();
    assert!(warnings.is_empty());
}
