// Configuration file loaders

use crate::{ConfigError, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    /// Load and deserialize a configuration file
    pub fn load_file<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.parse(&content)
    }

    /// Deserialize configuration from a string
    pub fn parse<T: DeserializeOwned>(&self, content: &str) -> Result<T> {
        match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e))),
            FileFormat::Toml => toml::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e))),
        }
    }
}

/// Load a `.env` file into the process environment.
///
/// With no path, a missing `.env` in the working directory is not an error.
/// Returns the file that was loaded.
pub fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => {
                debug!("No .env file found");
                Ok(None)
            }
            Err(e) => Err(ConfigError::LoadError(e.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        key: String,
        number: u32,
    }

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let parsed: Sample = loader.parse(r#"{"key": "value", "number": 42}"#).unwrap();
        assert_eq!(parsed.number, 42);
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            key = "value"
            number = 42
        "#;

        let parsed: Sample = loader.parse(toml).unwrap();
        assert_eq!(parsed, Sample { key: "value".into(), number: 42 });
    }

    #[test]
    fn test_parse_error_is_reported() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let err = loader.parse::<Sample>("key = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("env"), None);
        assert!(ConfigLoader::auto(Path::new("ferry")).is_err());
    }

    #[test]
    fn test_missing_explicit_dotenv_fails() {
        assert!(load_dotenv(Some(Path::new("/nonexistent/ferry/.env"))).is_err());
    }
}
