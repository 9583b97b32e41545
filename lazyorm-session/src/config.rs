//! Session factory configuration.

use crate::error::SessionResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by every session of a factory.
///
/// ```toml
/// database_path = "app.db"
/// enable_lazy_loading = true
/// show_sql = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// SQLite database file. `None` opens a private in-memory database.
    pub database_path: Option<PathBuf>,
    /// Global switch for basic-property laziness. Types with an explicit
    /// lazy group keep their lazy properties even when this is off.
    pub enable_lazy_loading: bool,
    /// Log every statement at info level.
    pub show_sql: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            enable_lazy_loading: true,
            show_sql: false,
        }
    }
}

impl FactoryConfig {
    /// An in-memory configuration with default settings.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A configuration backed by the database file at `path`.
    pub fn with_database(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn lazy_loading(mut self, enabled: bool) -> Self {
        self.enable_lazy_loading = enabled;
        self
    }

    #[must_use]
    pub const fn show_sql(mut self, enabled: bool) -> Self {
        self.show_sql = enabled;
        self
    }

    /// Parses a TOML document. Missing keys take their default values.
    pub fn from_toml_str(source: &str) -> SessionResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> SessionResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
