// Configuration loading for Element rollout definitions

pub mod config_service;
pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use config_service::{ConfigService, ConfigServiceBuilder};
pub use env::{EnvLoader, apply_dotenv};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use element_log::debug;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Layered key/value configuration. Later loads override earlier ones key by
/// key; nested tables are addressed with dotted paths (`rollouts.0.name`).
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<Map<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only environment variables starting with `PREFIX_` are loaded.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Map<String, Value>>> {
        self.config.read().map_err(|_| ConfigError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Map<String, Value>>> {
        self.config.write().map_err(|_| ConfigError::LockPoisoned)
    }

    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;
        debug!("Loaded {} configuration keys from environment", env_vars.len());

        let mut config = self.write()?;
        config.extend(env_vars);
        Ok(())
    }

    /// Apply a `.env` file to the process environment, then load it.
    /// A missing default `.env` is not an error; a missing explicit path is.
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        apply_dotenv(path)?;
        self.load_env()
    }

    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path.as_ref())?;
        self.merge_value(data)?;
        debug!("Loaded configuration file {}", path.as_ref().display());
        Ok(())
    }

    /// Load a file, detecting the format from its extension.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let format = ConfigLoader::auto(path.as_ref())?.format();
        self.load_file(path, format)
    }

    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).parse(content)?;
        self.merge_value(data)
    }

    fn merge_value(&self, data: Value) -> Result<()> {
        if let Value::Object(map) = data {
            self.write()?.extend(map);
        }
        Ok(())
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        self.write()?.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Raw value at `key`, following dotted paths into tables and arrays.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let config = self.read()?;
        if let Some(value) = config.get(key) {
            return Ok(Some(value.clone()));
        }

        let mut segments = key.split('.');
        let Some(mut current) = segments.next().and_then(|first| config.get(first)) else {
            return Ok(None);
        };
        for segment in segments {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return Ok(None),
            }
        }
        Ok(Some(current.clone()))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .get_value(key)?
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value)
            .map_err(|e| ConfigError::DeserializationError(format!("{}: {}", key, e)))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        matches!(self.get_value(key), Ok(Some(_)))
    }

    pub fn keys(&self) -> Vec<String> {
        self.read()
            .map(|config| config.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Copy every key of `other` over this manager's keys.
    pub fn merge(&self, other: &ConfigManager) -> Result<()> {
        let other_config = other.read()?.clone();
        self.write()?.extend(other_config);
        Ok(())
    }

    /// Deserialize the whole document into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let document = Value::Object(self.read()?.clone());
        serde_json::from_value(document)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Deserialize the whole document and run its [`Validate`] checks.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let validated: T = self.deserialize()?;
        validated.validate()?;
        Ok(validated)
    }
}
