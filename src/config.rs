//! Process settings, read once at startup and passed explicitly.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::email::{EmailSettings, EmailTemplate};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Please provide a valid database url")]
    MissingDatabaseUrl,
    #[error("invalid database url `{url}`: {source}")]
    InvalidDatabaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("at JSON path {path} → {message}")]
    Parse { path: String, message: String },
    #[error("invalid log filter `{0}`")]
    LogFilter(String),
}

fn default_log() -> String { "info".to_string() }

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub database_url: String,
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log")]
    pub log: String,
    #[serde(default)]
    pub email: EmailSettings,
    #[serde(default)]
    pub templates: IndexMap<String, EmailTemplate>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            log: default_log(),
            email: EmailSettings::default(),
            templates: IndexMap::new(),
        }
    }
}

impl Settings {
    pub fn from_json(src: &str) -> Result<Self, ConfigError> {
        crate::path_de::from_str_with_path(src)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        crate::path_de::from_file_with_path(path.as_ref())
    }
}
