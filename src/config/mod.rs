//! Configuration management for portal

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_API_HOST;
use crate::error::{ConfigError, Result};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "PORTAL_CONFIG";

/// Environment variable overriding the API host
pub const API_HOST_ENV: &str = "PORTAL_API_HOST";

/// Environment variable overriding the interface language
pub const LANG_ENV: &str = "PORTAL_LANG";

/// File name of the shared session store, kept next to the config
pub const STATE_DB_FILE: &str = "state.db";

const DEFAULT_LANGUAGE: &str = "en";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Portal API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,

    /// Preferred interface language (primary subtag, e.g. `en`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Ask the server to remember this device on login
    #[serde(default)]
    pub remember_device: bool,

    /// Days a remembered device stays signed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember_days: Option<u32>,

    /// Cookies set by the API (refresh and anti-forgery)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".portal").join("config.yaml"))
    }

    /// Resolve the config path from an explicit override or the default.
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) if !p.is_empty() => Ok(PathBuf::from(p)),
            _ => Self::default_path(),
        }
    }

    /// Path of the shared session store for the config at `path`.
    pub fn state_path(path: Option<&str>) -> Result<PathBuf> {
        let config = Self::resolve_path(path)?;
        Ok(config
            .parent()
            .map(|dir| dir.join(STATE_DB_FILE))
            .unwrap_or_else(|| PathBuf::from(STATE_DB_FILE)))
    }

    /// Load configuration, falling back to defaults when the file is missing.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        Self::load_from(&Self::resolve_path(path)?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to an explicit path or the default.
    pub fn save_at(&self, path: Option<&str>) -> Result<()> {
        self.save_to(&Self::resolve_path(path)?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Cookies include the refresh token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// API host: flag > `PORTAL_API_HOST` > config > default.
    pub fn resolve_api_host(&self, flag: Option<&str>) -> String {
        self.resolve_api_host_with(flag, std::env::var(API_HOST_ENV).ok().as_deref())
    }

    fn resolve_api_host_with(&self, flag: Option<&str>, env: Option<&str>) -> String {
        first_set([flag, env, self.api_host.as_deref()])
            .unwrap_or(DEFAULT_API_HOST)
            .trim_end_matches('/')
            .to_string()
    }

    /// Language: flag > `PORTAL_LANG` > config > `LANG` > `en`.
    pub fn resolve_language(&self, flag: Option<&str>) -> String {
        self.resolve_language_with(
            flag,
            std::env::var(LANG_ENV).ok().as_deref(),
            std::env::var("LANG").ok().as_deref(),
        )
    }

    fn resolve_language_with(
        &self,
        flag: Option<&str>,
        env: Option<&str>,
        system: Option<&str>,
    ) -> String {
        // `C` and `POSIX` locales carry no language
        let system = system.filter(|s| !matches!(*s, "C" | "POSIX") && !s.starts_with("C."));
        let tag = first_set([flag, env, self.language.as_deref(), system]).unwrap_or(DEFAULT_LANGUAGE);
        crate::client::http::primary_language(tag)
    }
}

fn first_set<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
}
