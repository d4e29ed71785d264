// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::env;

/// Loads `PREFIX_KEY=value` variables as lowercase `key` entries.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Collect matching variables, values coerced with [`parse_scalar`].
    pub fn load(&self) -> Result<HashMap<String, Value>> {
        Ok(self.load_from(env::vars()))
    }

    pub(crate) fn load_from(
        &self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> HashMap<String, Value> {
        let mut config = HashMap::new();

        for (key, value) in vars {
            let key = match self.prefix {
                Some(ref prefix) => match key.strip_prefix(prefix.as_str()) {
                    Some(rest) if rest.starts_with('_') => rest.trim_start_matches('_').to_string(),
                    _ => continue,
                },
                None => key,
            };
            if key.is_empty() {
                continue;
            }
            config.insert(key.to_lowercase(), parse_scalar(&value));
        }

        config
    }

    /// Load a single variable as a raw string.
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.full_key(key)).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    fn full_key(&self, key: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Interpret an environment string as bool, integer or float when it looks
/// like one, otherwise keep it as a string.
pub fn parse_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = trimmed.parse::<f64>()
        && let Some(number) = serde_json::Number::from_f64(float)
    {
        return Value::Number(number);
    }
    Value::String(raw.to_string())
}

/// Apply a `.env` file to the process environment. Without an explicit
/// path a missing `.env` is skipped; a malformed one is still an error.
pub fn apply_dotenv(path: Option<&str>) -> Result<()> {
    let result = match path {
        Some(path) => dotenvy::from_path(path),
        None => match dotenvy::dotenv() {
            Err(e) if e.not_found() => return Ok(()),
            other => other.map(|_| ()),
        },
    };
    result.map_err(|e| ConfigError::LoadError(e.to_string()))
}
