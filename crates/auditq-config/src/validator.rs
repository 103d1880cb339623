//! Configuration validation.

use auditq_checkpoint::QueueState;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a [`ConfigError`], or `Ok` with the warnings.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_queue(config, &mut result);
        Self::validate_backpressure(config, &mut result);
        Self::validate_monitor(config, &mut result);
        Self::validate_persistence(config, &mut result);
        Self::validate_pipeline(config, &mut result);

        Ok(result)
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        let queue = &config.queue;

        if queue.max_concurrent == 0 {
            result.add_error(ValidationError::new(
                "queue.max_concurrent",
                "max_concurrent must be greater than 0",
            ));
        }

        if queue.max_concurrent > 64 {
            result.add_warning(ValidationWarning::new(
                "queue.max_concurrent",
                "max_concurrent is very high (>64), target sites may throttle requests",
            ));
        }

        if queue.max_retries == 0 {
            result.add_error(ValidationError::new(
                "queue.max_retries",
                "max_retries counts the first attempt and must be at least 1",
            ));
        }

        if queue.hard_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "queue.hard_timeout_ms",
                "hard_timeout_ms must be greater than 0",
            ));
        }

        if queue.idle_poll_ms == 0 {
            result.add_error(ValidationError::new(
                "queue.idle_poll_ms",
                "idle_poll_ms must be greater than 0",
            ));
        }

        if queue.global_timeout_ms > 0 && queue.global_timeout_ms < queue.hard_timeout_ms {
            result.add_warning(ValidationWarning::new(
                "queue.global_timeout_ms",
                "global_timeout_ms is shorter than hard_timeout_ms",
            ));
        }

        for (i, rule) in queue.priority_patterns.iter().enumerate() {
            if rule.pattern.is_empty() {
                result.add_error(ValidationError::new(
                    format!("queue.priority_patterns[{}].pattern", i),
                    "Pattern cannot be empty",
                ));
            }
        }
    }

    fn validate_backpressure(config: &Config, result: &mut ValidationResult) {
        let bp = &config.backpressure;

        for (path, value) in [
            ("backpressure.activation_threshold", bp.activation_threshold),
            ("backpressure.deactivation_threshold", bp.deactivation_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                result.add_error(ValidationError::new(
                    path,
                    "Threshold must be in (0, 1]",
                ));
            }
        }

        if bp.deactivation_threshold >= bp.activation_threshold {
            result.add_error(ValidationError::new(
                "backpressure.deactivation_threshold",
                "deactivation_threshold must be lower than activation_threshold",
            ));
        }

        if bp.min_delay_ms > bp.max_delay_ms {
            result.add_error(ValidationError::new(
                "backpressure.min_delay_ms",
                "min_delay_ms cannot exceed max_delay_ms",
            ));
        }

        if bp.max_queue_size == 0 {
            result.add_error(ValidationError::new(
                "backpressure.max_queue_size",
                "max_queue_size must be greater than 0",
            ));
        }

        if bp.max_memory_mb <= 0.0 || bp.max_cpu_percent <= 0.0 {
            result.add_error(ValidationError::new(
                "backpressure",
                "max_memory_mb and max_cpu_percent must be positive",
            ));
        }

        if !bp.enabled {
            return;
        }

        let global_timeout = config.queue.global_timeout_ms;
        if global_timeout > 0 && bp.max_delay_ms >= global_timeout {
            result.add_warning(ValidationWarning::new(
                "backpressure.max_delay_ms",
                "a single backpressure delay can use up the whole global_timeout_ms",
            ));
        }

        let busy = config.queue.max_concurrent as f64;
        if bp.max_queue_size > 0
            && busy / bp.max_queue_size as f64 >= bp.activation_threshold
        {
            result.add_warning(ValidationWarning::new(
                "backpressure.max_queue_size",
                "a full worker pool alone activates backpressure; every dequeue will be delayed",
            ));
        }
    }

    fn validate_monitor(config: &Config, result: &mut ValidationResult) {
        let monitor = &config.monitor;

        if monitor.sample_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "monitor.sample_interval_ms",
                "sample_interval_ms must be greater than 0",
            ));
        }

        if monitor.memory_warning_mb >= monitor.memory_critical_mb {
            result.add_error(ValidationError::new(
                "monitor.memory_warning_mb",
                "memory_warning_mb must be lower than memory_critical_mb",
            ));
        }

        if monitor.cpu_warning_percent >= monitor.cpu_critical_percent {
            result.add_error(ValidationError::new(
                "monitor.cpu_warning_percent",
                "cpu_warning_percent must be lower than cpu_critical_percent",
            ));
        }
    }

    fn validate_persistence(config: &Config, result: &mut ValidationResult) {
        let persistence = &config.persistence;

        if persistence.auto_save_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "persistence.auto_save_interval_ms",
                "auto_save_interval_ms must be greater than 0",
            ));
        }

        if persistence.enabled && persistence.storage_path.as_os_str().is_empty() {
            result.add_error(ValidationError::new(
                "persistence.storage_path",
                "storage_path cannot be empty when persistence is enabled",
            ));
        }

        if let Some(id) = &persistence.state_id {
            if let Err(e) = QueueState::validate_id(id) {
                result.add_error(ValidationError::new("persistence.state_id", e.to_string()));
            }
        }
    }

    fn validate_pipeline(config: &Config, result: &mut ValidationResult) {
        if config.pipeline.request_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "pipeline.request_timeout_secs",
                "request_timeout_secs must be greater than 0",
            ));
        }

        if config.pipeline.user_agent.is_empty() {
            result.add_warning(ValidationWarning::new(
                "pipeline.user_agent",
                "Empty user agent, some sites reject such requests",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
