use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
    #[error("failed to resolve home directory for global config path")]
    HomeDirectoryUnavailable,
}

pub const GLOBAL_STATE_DIR: &str = ".specboard";
pub const GLOBAL_SETTINGS_FILE_NAME: &str = "config.yaml";

pub const DEFAULT_ORCHESTRATOR_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_FEEDBACK_MIN_CHARS: usize = 8;
pub const DEFAULT_MERMAID_BINARY: &str = "mmdc";

const MIN_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_orchestrator_url")]
    pub orchestrator_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_feedback_min_chars")]
    pub feedback_min_chars: usize,
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    #[serde(default = "default_mermaid_binary")]
    pub mermaid_binary: String,
}

fn default_orchestrator_url() -> String {
    DEFAULT_ORCHESTRATOR_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_feedback_min_chars() -> usize {
    DEFAULT_FEEDBACK_MIN_CHARS
}

fn default_mermaid_binary() -> String {
    DEFAULT_MERMAID_BINARY.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            orchestrator_url: default_orchestrator_url(),
            poll_interval_ms: default_poll_interval_ms(),
            feedback_min_chars: default_feedback_min_chars(),
            export_dir: None,
            mermaid_binary: default_mermaid_binary(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.orchestrator_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Settings(
                "orchestrator_url must be non-empty".to_string(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Settings(format!(
                "orchestrator_url `{url}` must start with http:// or https://"
            )));
        }
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::Settings(format!(
                "poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}"
            )));
        }
        if self.mermaid_binary.trim().is_empty() {
            return Err(ConfigError::Settings(
                "mermaid_binary must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn default_state_root() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(GLOBAL_STATE_DIR))
}

pub fn default_settings_path() -> Result<PathBuf, ConfigError> {
    Ok(default_state_root()?.join(GLOBAL_SETTINGS_FILE_NAME))
}

// Missing file means defaults; a present file must parse and validate.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let settings: Settings = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    settings.validate()?;
    Ok(settings)
}

// SPECBOARD_CONFIG overrides the global path; used by tests and scripted
// environments.
pub fn resolve_settings_path() -> Result<PathBuf, ConfigError> {
    match std::env::var_os("SPECBOARD_CONFIG") {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => default_settings_path(),
    }
}
