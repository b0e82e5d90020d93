//! Store configuration
//!
//! Stored as `config.json` at the store root:
//! ```json
//! { "start-file": "index" }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the configuration under the store root
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Logical name of the default document
    #[serde(rename = "start-file", default, skip_serializing_if = "Option::is_none")]
    pub start_file: Option<String>,
}

impl Config {
    pub fn path(root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(CONFIG_FILE)
    }

    /// Load the configuration, creating an empty one if absent.
    ///
    /// An empty file means defaults; anything else that fails to decode is
    /// an error.
    pub fn load_or_create(root: impl AsRef<Path>) -> Result<Self> {
        let path = Self::path(root);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let config = Config::default();
                config.write_to(&path)?;
                return Ok(config);
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Write the configuration back to the store root
    pub fn save(&self, root: impl AsRef<Path>) -> Result<()> {
        self.write_to(&Self::path(root))
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_created_when_absent() {
        let dir = tempdir().unwrap();

        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(), "{}");
    }

    #[test]
    fn test_empty_file_is_default() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "").unwrap();

        assert_eq!(Config::load_or_create(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_reads_start_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"start-file": "home", "theme": "ignored"}"#,
        )
        .unwrap();

        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config.start_file.as_deref(), Some("home"));
    }

    #[test]
    fn test_malformed_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{not json").unwrap();

        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempdir().unwrap();
        let config = Config {
            start_file: Some("index".into()),
        };
        config.save(dir.path()).unwrap();

        let raw = fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        assert!(raw.contains("\"start-file\": \"index\""));
        assert_eq!(Config::load_or_create(dir.path()).unwrap(), config);
    }
}
