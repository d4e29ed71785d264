// ConfigService - layered configuration assembled by a builder

use crate::{ConfigManager, FileFormat, Result, Validate, apply_dotenv};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Read-only facade over a loaded [`ConfigManager`].
#[derive(Clone, Default)]
pub struct ConfigService {
    manager: ConfigManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manager(manager: ConfigManager) -> Self {
        Self { manager }
    }

    pub fn builder() -> ConfigServiceBuilder {
        ConfigServiceBuilder::new()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.manager.get(key)
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.manager.get_or(key, default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.manager.get_string(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.manager.get_bool(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.manager.has(key)
    }

    /// Deserialize and validate the whole document.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        self.manager.load_validated()
    }

    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }
}

enum Source {
    File(PathBuf, Option<FileFormat>),
    Inline(String, FileFormat),
}

/// Builder for [`ConfigService`].
///
/// Sources apply in order: files and inline documents in the order added,
/// then environment variables (including those from `.env`) so deployments
/// can override files. A `.env` at an explicit path must exist.
#[derive(Default)]
pub struct ConfigServiceBuilder {
    prefix: Option<String>,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<String>,
    sources: Vec<Source>,
}

impl ConfigServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment variable prefix, e.g. `ELEMENT`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn load_dotenv(mut self, path: Option<String>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    pub fn add_file(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.sources.push(Source::File(path.into(), Some(format)));
        self
    }

    /// Add a file whose format is detected from its extension.
    pub fn add_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::File(path.into(), None));
        self
    }

    pub fn add_str(mut self, content: impl Into<String>, format: FileFormat) -> Self {
        self.sources.push(Source::Inline(content.into(), format));
        self
    }

    pub fn build(self) -> Result<ConfigService> {
        let manager = match self.prefix {
            Some(prefix) => ConfigManager::with_prefix(prefix),
            None => ConfigManager::new(),
        };

        if self.load_dotenv {
            apply_dotenv(self.dotenv_path.as_deref())?;
        }

        for source in self.sources {
            match source {
                Source::File(path, Some(format)) => manager.load_file(&path, format)?,
                Source::File(path, None) => manager.load_path(&path)?,
                Source::Inline(content, format) => manager.load_str(&content, format)?,
            }
        }

        if self.load_env || self.load_dotenv {
            manager.load_env()?;
        }

        Ok(ConfigService::from_manager(manager))
    }
}
