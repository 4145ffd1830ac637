use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Services base URL is set and timeout is not 0
/// - Dispatch call timeout is not 0
/// - Default recipient address looks like an address
/// - Scheduler tick interval is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.services.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "services.base_url cannot be empty".to_string(),
        ));
    }

    if config.services.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "services.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.dispatch.call_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.call_timeout_secs cannot be 0".to_string(),
        ));
    }

    if !config.dispatch.default_recipient_address.contains('@') {
        return Err(ConfigError::ValidationError(format!(
            "dispatch.default_recipient_address is not an address: {}",
            config.dispatch.default_recipient_address
        )));
    }

    if config.scheduler.tick_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.tick_interval_ms cannot be 0".to_string(),
        ));
    }

    Ok(())
}
