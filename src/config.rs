//! Storage configuration
//!
//! One immutable [`StorageConfig`] is built at startup (from defaults or a
//! JSON file) and handed to every component explicitly.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

pub const DEFAULT_ID_CHARSET: &str = "abcdefghijklmnopqrstuvwxyz";
pub const DEFAULT_ID_LENGTH: usize = 6;
pub const DEFAULT_MAX_SIZE: u64 = 50 * 1024 * 1024;
pub const DEFAULT_CSP: &str = "default-src 'none'; media-src 'self'";
/// 30 days
pub const DEFAULT_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// How the filter sets are interpreted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Reject uploads matching the sets
    #[default]
    Blacklist,
    /// Reject uploads not matching the sets
    Whitelist,
}

/// Admission filter settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub mode: FilterMode,
    /// MIME types, e.g. `application/x-dosexec`
    pub mime: Vec<String>,
    /// Extensions, with or without the leading dot
    pub ext: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            mode: FilterMode::Blacklist,
            mime: vec![
                "application/x-dosexec".to_string(),
                "application/x-msdos-program".to_string(),
            ],
            ext: ["exe", "dll", "msi", "scr", "com", "pif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Settings for serving files back to clients
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Prefix for public URLs in upload results
    pub base_url: String,
    /// Serve (X)HTML uploads with their real content type
    pub allow_html: bool,
    /// Content-Security-Policy for served files; `None` disables the header
    pub csp: Option<String>,
    /// Lifetime for `Cache-Control` and `Expires`
    pub max_age_secs: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        ServeConfig {
            base_url: "http://localhost:8080/u/".to_string(),
            allow_html: false,
            csp: Some(DEFAULT_CSP.to_string()),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

/// Configuration for a storage root
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `temp/`, `files/` and `ids/`
    pub root: PathBuf,
    /// Characters public IDs are drawn from
    pub id_charset: String,
    /// Length of the random part of public IDs
    pub id_length: usize,
    /// Upload ceiling in bytes; 0 disables the limit
    pub max_size: u64,
    pub filter: FilterConfig,
    /// MIME type → extension registrations that replace the built-in table
    /// for their type. The first entry is the preferred extension.
    pub extra_types: BTreeMap<String, Vec<String>>,
    pub serve: ServeConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mut extra_types = BTreeMap::new();
        extra_types.insert(
            "text/plain".to_string(),
            [".txt", ".text", ".conf", ".def", ".list", ".log", ".in", ".ini"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        StorageConfig {
            root: PathBuf::from("upload"),
            id_charset: DEFAULT_ID_CHARSET.to_string(),
            id_length: DEFAULT_ID_LENGTH,
            max_size: DEFAULT_MAX_SIZE,
            filter: FilterConfig::default(),
            extra_types,
            serve: ServeConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Default config for the given root directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        StorageConfig {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Load config from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: StorageConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config file location (~/.config/upbox/config.json)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("upbox").join("config.json"))
    }

    /// Check invariants the storage layout depends on
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::Config("root must not be empty".into()));
        }
        if self.id_length == 0 {
            return Err(Error::Config("id_length must be at least 1".into()));
        }
        if self.id_charset.is_empty() {
            return Err(Error::Config("id_charset must not be empty".into()));
        }
        // IDs become path components and are split on the last dot
        if let Some(c) = self
            .id_charset
            .chars()
            .find(|c| !c.is_ascii_graphic() || matches!(c, '.' | '/' | '\\'))
        {
            return Err(Error::Config(format!(
                "id_charset contains unusable character {:?}",
                c
            )));
        }
        let mut seen = HashSet::new();
        if let Some(c) = self.id_charset.chars().find(|c| !seen.insert(*c)) {
            return Err(Error::Config(format!(
                "id_charset repeats character {:?}",
                c
            )));
        }
        Ok(())
    }
}
