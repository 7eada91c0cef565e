// Environment variable loading

use crate::{ConfigError, Result};
use std::env;
use std::str::FromStr;

/// Environment variable loader
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Full variable name for `key`, with the prefix applied
    pub fn key(&self, key: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a specific environment variable; empty values count as unset
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = self.key(key);
        match env::var(&full_key) {
            Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => Err(ConfigError::KeyNotFound(full_key)),
        }
    }

    /// Load an optional variable
    pub fn load_var_opt(&self, key: &str) -> Option<String> {
        self.load_var(key).ok()
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Load a boolean; unset or unparsable values keep the default
    pub fn load_bool_or(&self, key: &str, default: bool) -> bool {
        match self.load_var(key) {
            Ok(value) => parse_bool(&value).unwrap_or(default),
            Err(_) => default,
        }
    }

    /// Load and parse a value; unset values keep the default
    pub fn load_parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        match self.load_var(key) {
            Ok(value) => value.parse().map_err(|e: T::Err| {
                ConfigError::ParseError(format!("{}: {}", self.key(key), e))
            }),
            Err(_) => Ok(default),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // std::env::set_var is unsafe; tests only touch variables under their own prefix.

    #[test]
    fn test_env_loader_with_default() {
        let loader = EnvLoader::new(None);
        let value = loader.load_var_or("NONEXISTENT_VAR_12345", "default");

        assert_eq!(value, "default");
    }

    #[test]
    fn test_env_loader_missing_var_names_full_key() {
        let loader = EnvLoader::new(Some("FERRY_ENV_TEST".to_string()));
        let err = loader.load_var("missing_var").unwrap_err();
        assert_eq!(err.to_string(), "Environment variable not set: FERRY_ENV_TEST_MISSING_VAR");
    }

    #[test]
    fn test_bool_parsing() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_bool_and_parse_defaults() {
        let loader = EnvLoader::new(Some("FERRY_ENV_BOOL".to_string()));
        unsafe {
            env::set_var("FERRY_ENV_BOOL_SSL", "not-a-bool");
            env::set_var("FERRY_ENV_BOOL_EMPTY", "  ");
            env::set_var("FERRY_ENV_BOOL_PORT", "80x");
        }

        assert!(loader.load_bool_or("SSL", true));
        assert!(!loader.load_bool_or("SSL", false));
        assert!(loader.load_var_opt("EMPTY").is_none());
        assert_eq!(loader.load_parse_or("MISSING", 7u16).unwrap(), 7);
        assert!(loader.load_parse_or("PORT", 7u16).is_err());

        unsafe {
            env::remove_var("FERRY_ENV_BOOL_SSL");
            env::remove_var("FERRY_ENV_BOOL_EMPTY");
            env::remove_var("FERRY_ENV_BOOL_PORT");
        }
    }
}
