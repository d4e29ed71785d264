// Configuration validation

use crate::{ConfigError, Result};
use std::collections::HashSet;
use std::fmt::Display;

/// Implemented by typed configuration sections checked after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable field checks producing [`ConfigError::ValidationError`].
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Inclusive range check. NaN never passes.
    pub fn in_range<T: PartialOrd + Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value.partial_cmp(&min).is_none() || value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {}, got {}",
                field, min, max, value
            )));
        }
        Ok(())
    }

    pub fn at_least<T: PartialOrd + Display>(value: T, min: T, field: &str) -> Result<()> {
        if value.partial_cmp(&min).is_none() || value < min {
            return Err(ConfigError::ValidationError(format!(
                "{} must be at least {}, got {}",
                field, min, value
            )));
        }
        Ok(())
    }

    pub fn one_of<T: PartialEq + Display>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            return Err(ConfigError::ValidationError(format!(
                "{} has unknown value {}",
                field, value
            )));
        }
        Ok(())
    }

    /// Reject the first name that appears twice.
    pub fn unique<'a>(names: impl IntoIterator<Item = &'a str>, field: &str) -> Result<()> {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate {} '{}'",
                    field, name
                )));
            }
        }
        Ok(())
    }
}
