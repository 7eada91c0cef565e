// Settings validation

use crate::{ConfigError, Result};
use std::time::Duration;

/// Settings that can check themselves before use.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Field checks shared by the settings types.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Reject blank strings.
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(invalid(field, "cannot be empty"));
        }
        Ok(())
    }

    /// Require an absolute route such as `/api/ws/progress`.
    pub fn is_route(value: &str, field: &str) -> Result<()> {
        if !value.starts_with('/') || value.contains(char::is_whitespace) {
            return Err(invalid(field, "must be an absolute path"));
        }
        Ok(())
    }

    /// Reject port 0.
    pub fn is_port(value: u16, field: &str) -> Result<()> {
        if value == 0 {
            return Err(invalid(field, "must be a valid port number"));
        }
        Ok(())
    }

    /// Reject a zero interval.
    pub fn non_zero(value: Duration, field: &str) -> Result<()> {
        if value.is_zero() {
            return Err(invalid(field, "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::ValidationError(format!("{} {}", field, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_rejected() {
        assert!(ConfigValidator::not_empty("minio", "storage_type").is_ok());
        let err = ConfigValidator::not_empty(" ", "storage_type").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: storage_type cannot be empty");
    }

    #[test]
    fn test_route_must_be_absolute() {
        assert!(ConfigValidator::is_route("/api/ws/progress", "progress_path").is_ok());
        assert!(ConfigValidator::is_route("api/ws", "progress_path").is_err());
        assert!(ConfigValidator::is_route("/api/ws progress", "progress_path").is_err());
    }

    #[test]
    fn test_port_and_interval() {
        assert!(ConfigValidator::is_port(5051, "progress_addr").is_ok());
        assert!(ConfigValidator::is_port(0, "progress_addr").is_err());
        assert!(ConfigValidator::non_zero(Duration::from_secs(1), "sweep_interval_secs").is_ok());
        assert!(ConfigValidator::non_zero(Duration::ZERO, "sweep_interval_secs").is_err());
    }
}
