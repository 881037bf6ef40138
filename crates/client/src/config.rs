//! Runtime configuration for the panel client.
//!
//! The dashboard is served with a small JSON document:
//!
//! ```json
//! { "apiUrl": "https://panel.example.com", "apiSecret": "..." }
//! ```
//!
//! Environment variables override file values.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use panel_core::{PanelError, PanelResult};

pub const CONFIG_ENV: &str = "PANEL_CONFIG";
pub const API_URL_ENV: &str = "PANEL_API_URL";
pub const API_SECRET_ENV: &str = "PANEL_API_SECRET";
pub const STORAGE_PATH_ENV: &str = "PANEL_STORAGE_PATH";

const API_SUFFIX: &str = "/api";
const APP_DIR: &str = "emoji-panel";
const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelConfig {
    /// Base address of the API. Required.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Shared service secret sent on every request.
    #[serde(default)]
    pub api_secret: String,

    /// Where the durable local slots live.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
}

impl PanelConfig {
    pub fn new(api_url: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_url: Some(api_url.into()),
            api_secret: api_secret.into(),
            storage_path: None,
        }
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn from_json_str(raw: &str) -> PanelResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| PanelError::configuration(format!("invalid config document: {e}")))
    }

    /// Read a config document from disk.
    pub fn load(path: &Path) -> PanelResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PanelError::configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Load from `PANEL_CONFIG` (when set) and apply environment overrides.
    pub fn from_env(explicit: Option<&Path>) -> PanelResult<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let config = match path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply overrides from a key lookup (the process environment in practice).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV) {
            self.api_url = Some(url);
        }
        if let Some(secret) = lookup(API_SECRET_ENV) {
            self.api_secret = secret;
        }
        if let Some(path) = lookup(STORAGE_PATH_ENV) {
            self.storage_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Base URL every request path is appended to.
    ///
    /// Fails with a configuration error when `apiUrl` is absent; the client
    /// cannot start without it.
    pub fn api_base(&self) -> PanelResult<String> {
        match self.api_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(normalize_api_base(url)),
            _ => Err(PanelError::configuration(
                "API URL not set. Please check your config.json file.",
            )),
        }
    }

    pub fn storage_path_or_default(&self) -> PanelResult<PathBuf> {
        if let Some(path) = &self.storage_path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(STORAGE_FILE))
            .ok_or_else(|| {
                PanelError::configuration("no data directory available for local storage")
            })
    }
}

/// Append `/api` unless the URL already ends with it.
pub fn normalize_api_base(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with(API_SUFFIX) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{API_SUFFIX}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_suffix_is_appended_once() {
        assert_eq!(normalize_api_base("https://panel.example.com"), "https://panel.example.com/api");
        assert_eq!(normalize_api_base("https://panel.example.com/"), "https://panel.example.com/api");
        assert_eq!(normalize_api_base("https://panel.example.com/api"), "https://panel.example.com/api");
        assert_eq!(normalize_api_base("http://h:8080/api/"), "http://h:8080/api");
    }

    #[test]
    fn parses_runtime_document() {
        let config = PanelConfig::from_json_str(
            r#"{"apiUrl":"https://panel.example.com","apiSecret":"s3cret"}"#,
        )
        .unwrap();

        assert_eq!(config.api_base().unwrap(), "https://panel.example.com/api");
        assert_eq!(config.api_secret, "s3cret");
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn missing_api_url_is_fatal() {
        let config = PanelConfig::from_json_str(r#"{"apiSecret":"x"}"#).unwrap();
        let err = config.api_base().unwrap_err();
        assert!(matches!(err, PanelError::Configuration(_)));

        let blank = PanelConfig::new("   ", "");
        assert!(blank.api_base().is_err());
    }

    #[test]
    fn secret_defaults_to_empty() {
        let config = PanelConfig::from_json_str(r#"{"apiUrl":"http://localhost"}"#).unwrap();
        assert_eq!(config.api_secret, "");
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config = PanelConfig::new("http://file", "file-secret").with_overrides(|key| match key {
            API_URL_ENV => Some("http://env".to_string()),
            STORAGE_PATH_ENV => Some("/tmp/panel.json".to_string()),
            _ => None,
        });

        assert_eq!(config.api_base().unwrap(), "http://env/api");
        assert_eq!(config.api_secret, "file-secret");
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/panel.json")));
    }

    #[test]
    fn malformed_document_is_a_configuration_error() {
        let err = PanelConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, PanelError::Configuration(_)));
    }
}
