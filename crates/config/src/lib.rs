//! Configuration file lookup for Mailscope
//!
//! All on-disk configuration lives in `~/.config/mailscope/`. The
//! `MAILSCOPE_CONFIG_DIR` environment variable relocates it, which is how
//! containers and tests point the server somewhere writable.
//!
//! Call [`init`] at startup so the directory exists before anything tries to
//! open the session database inside it.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "MAILSCOPE_CONFIG_DIR";

const APP_DIR: &str = "mailscope";

/// Create the config directory if needed and return its path.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// The Mailscope config directory
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

/// Path of a file inside the config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Whether a file exists inside the config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Load and parse a JSON file from the config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Ensure the config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        port: u16,
    }

    #[test]
    fn test_config_path_joins_filename() {
        let Some(path) = config_path("sessions.db") else {
            return;
        };
        assert!(path.ends_with("sessions.db"));
        assert_eq!(path.parent(), config_dir().as_deref());
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        std::fs::write(&path, r#"{ "name": "mailscope", "port": 8000 }"#).unwrap();

        let sample: Sample = load_json_file(&path).unwrap();
        assert_eq!(sample.name, "mailscope");
        assert_eq!(sample.port, 8000);
    }

    #[test]
    fn test_load_json_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let err = load_json_file::<Sample>(&path).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_load_json_file_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_json_file::<Sample>(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
