//! Application settings.
//!
//! Settings are loaded from `settings.json` in the XDG config directory,
//! with environment variable overrides for the backend URL and frontend
//! origin. Defaults point at a local development stack.

use super::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Error type for settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file {path}: {source}")]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Google OAuth client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleOAuthSettings {
    /// OAuth client ID registered with Google.
    pub client_id: String,

    /// Redirect URI the popup lands on after authorization.
    pub redirect_uri: String,

    /// Scopes requested during authorization.
    pub scopes: Vec<String>,
}

impl Default for GoogleOAuthSettings {
    fn default() -> Self {
        Self {
            client_id: "715767866519-dr537aonsft7kmipo9rnlielpjjnkusr.apps.googleusercontent.com"
                .to_string(),
            redirect_uri: "http://localhost:5173/auth/google/callback".to_string(),
            scopes: vec![
                "https://www.googleapis.com/auth/spreadsheets".to_string(),
                "https://www.googleapis.com/auth/drive.file".to_string(),
            ],
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the Dream Job Search backend.
    pub backend_url: String,

    /// Origin of this client. Relay messages from any other origin are
    /// rejected.
    pub frontend_origin: String,

    /// Google OAuth client configuration.
    pub google: GoogleOAuthSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            frontend_origin: "http://localhost:5173".to_string(),
            google: GoogleOAuthSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the default location, falling back to defaults
    /// when no settings file exists.
    pub fn load() -> Result<Self, SettingsError> {
        let path = XdgDirs::new().config.join("settings.json");
        let mut settings = if path.exists() {
            Self::load_from(&path)?
        } else {
            debug!(path = %path.display(), "no settings file, using defaults");
            Self::default()
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|source| SettingsError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save settings to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self).expect("settings serialize");
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DREAMJOB_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Ok(origin) = std::env::var("DREAMJOB_FRONTEND_ORIGIN") {
            self.frontend_origin = origin;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.backend_url, "http://localhost:8000");
        assert_eq!(settings.frontend_origin, "http://localhost:5173");
        assert_eq!(settings.google.scopes.len(), 2);
    }

    #[test]
    fn test_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");

        let mut settings = Settings::default();
        settings.backend_url = "http://example.com:9000".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.backend_url, "http://example.com:9000");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{"backend_url": "http://api.local"}"#).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.backend_url, "http://api.local");
        assert_eq!(loaded.frontend_origin, "http://localhost:5173");
    }

    #[test]
    fn test_invalid_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(SettingsError::Invalid { .. })
        ));
    }
}
