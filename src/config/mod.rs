//! Configuration management.
//!
//! Resolves where the collaborator API lives and how long to wait for it.
//!
//! Priority, per setting:
//! 1. Explicit CLI flag
//! 2. Environment (`RUSUNAWA_API_URL`, `RUSUNAWA_TIMEOUT_SECS`)
//! 3. Config file (`~/.rusunawa/config.json`, or the path in `RUSUNAWA_CONFIG`)
//! 4. Built-in default

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_URL: &str = "RUSUNAWA_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "RUSUNAWA_TIMEOUT_SECS";
pub const ENV_CONFIG: &str = "RUSUNAWA_CONFIG";

/// Contents of `config.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Flag,
    Env,
    File,
    Default,
}

/// Effective settings after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub api_url: String,
    pub api_url_source: Source,
    pub timeout_secs: u64,
    pub timeout_source: Source,
    pub config_path: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings from flags, the process environment and the config
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the config file is needed but cannot be
    /// read or parsed, or a resolved value is invalid.
    pub fn resolve(api_url: Option<&str>, timeout_secs: Option<u64>) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let path = env(ENV_CONFIG).map(PathBuf::from).or_else(default_config_path);

        // The file is only read when some value falls through to it
        let needs_file = (api_url.is_none() && env(ENV_API_URL).is_none())
            || (timeout_secs.is_none() && env(ENV_TIMEOUT_SECS).is_none());
        let file = match &path {
            Some(p) if needs_file => load_config_from(p)?,
            _ => ConfigFile::default(),
        };
        let mut settings = Self::resolve_with(api_url, timeout_secs, env, &file)?;
        settings.config_path = path;
        Ok(settings)
    }

    /// Resolve settings against an explicit environment lookup and config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a non-HTTP URL or an invalid timeout.
    pub fn resolve_with(
        api_url: Option<&str>,
        timeout_secs: Option<u64>,
        env: impl Fn(&str) -> Option<String>,
        file: &ConfigFile,
    ) -> Result<Self> {
        let (api_url, api_url_source) = if let Some(url) = api_url {
            (url.to_string(), Source::Flag)
        } else if let Some(url) = env(ENV_API_URL) {
            (url, Source::Env)
        } else if let Some(url) = file.api_url.clone() {
            (url, Source::File)
        } else {
            (DEFAULT_API_URL.to_string(), Source::Default)
        };

        let (timeout_secs, timeout_source) = if let Some(secs) = timeout_secs {
            (secs, Source::Flag)
        } else if let Some(raw) = env(ENV_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds, got '{raw}'"))
            })?;
            (secs, Source::Env)
        } else if let Some(secs) = file.timeout_secs {
            (secs, Source::File)
        } else {
            (DEFAULT_TIMEOUT_SECS, Source::Default)
        };

        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "API URL must start with http:// or https://, got '{api_url}'"
            )));
        }
        if timeout_secs == 0 {
            return Err(Error::Config("Timeout must be at least 1 second".to_string()));
        }

        Ok(Self {
            api_url,
            api_url_source,
            timeout_secs,
            timeout_source,
            config_path: None,
        })
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Default config file location: `~/.rusunawa/config.json`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".rusunawa").join("config.json"))
}

/// Load a config file. A missing file yields the empty config.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
}
