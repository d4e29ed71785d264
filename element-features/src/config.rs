//! Feature definitions loaded through `element-config`.
//!
//! ```toml
//! settings_path = "/var/lib/element/settings.json"
//!
//! [[experiments]]
//! name = "composer-layout"
//! variants = 3
//!
//! [[rollouts]]
//! name = "crypto-sdk-rollout"
//! target_percentage = 0.25
//!
//! [[features]]
//! name = "crypto-sdk"
//! settings_key = "enableCryptoSDK"
//! remote_flag = "ios-crypto-sdk"
//! rollout = "crypto-sdk-rollout"
//! ```

use crate::error::FeatureResult;
use crate::feature::FeatureDefinition;
use crate::store::{FileStore, InMemoryStore, SettingsStore};
use element_config::{ConfigService, ConfigValidator, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5_000;

fn default_remote_timeout_ms() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    pub name: String,
    pub variants: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutDefinition {
    pub name: String,
    pub target_percentage: f64,
}

/// All feature definitions of an installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default)]
    pub experiments: Vec<ExperimentDefinition>,

    #[serde(default)]
    pub rollouts: Vec<RolloutDefinition>,

    #[serde(default)]
    pub features: Vec<FeatureDefinition>,

    /// Where overrides persist; in-memory when absent
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    /// Upper bound for one remote flag fetch
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            experiments: Vec::new(),
            rollouts: Vec::new(),
            features: Vec::new(),
            settings_path: None,
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
        }
    }
}

impl Validate for FeaturesConfig {
    fn validate(&self) -> element_config::Result<()> {
        for experiment in &self.experiments {
            ConfigValidator::not_empty(&experiment.name, "experiment name")?;
            ConfigValidator::at_least(
                experiment.variants,
                1,
                &format!("experiment '{}' variants", experiment.name),
            )?;
        }
        ConfigValidator::unique(
            self.experiments.iter().map(|e| e.name.as_str()),
            "experiment",
        )?;

        for rollout in &self.rollouts {
            ConfigValidator::not_empty(&rollout.name, "rollout name")?;
            ConfigValidator::in_range(
                rollout.target_percentage,
                0.0,
                1.0,
                &format!("rollout '{}' target_percentage", rollout.name),
            )?;
        }
        ConfigValidator::unique(self.rollouts.iter().map(|r| r.name.as_str()), "rollout")?;

        let rollout_names: Vec<&str> = self.rollouts.iter().map(|r| r.name.as_str()).collect();
        for feature in &self.features {
            ConfigValidator::not_empty(&feature.name, "feature name")?;
            ConfigValidator::not_empty(
                &feature.settings_key,
                &format!("feature '{}' settings_key", feature.name),
            )?;
            ConfigValidator::not_empty(
                &feature.remote_flag,
                &format!("feature '{}' remote_flag", feature.name),
            )?;
            if let Some(ref rollout) = feature.rollout {
                ConfigValidator::one_of(
                    &rollout.as_str(),
                    &rollout_names,
                    &format!("feature '{}' rollout", feature.name),
                )?;
            }
        }
        ConfigValidator::unique(self.features.iter().map(|f| f.name.as_str()), "feature")?;
        ConfigValidator::unique(
            self.features.iter().map(|f| f.settings_key.as_str()),
            "settings_key",
        )?;

        Ok(())
    }
}

impl FeaturesConfig {
    /// Deserialize and validate from a loaded configuration service.
    pub fn load(service: &ConfigService) -> FeatureResult<Self> {
        Ok(service.load_validated()?)
    }

    /// Load a TOML or JSON file, format picked by extension.
    pub fn from_file(path: impl AsRef<Path>) -> FeatureResult<Self> {
        let service = ConfigService::builder()
            .add_path(path.as_ref().to_path_buf())
            .build()?;
        Self::load(&service)
    }

    pub fn rollout(&self, name: &str) -> Option<&RolloutDefinition> {
        self.rollouts.iter().find(|r| r.name == name)
    }

    pub fn remote_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.remote_timeout_ms)
    }

    /// File-backed store at `settings_path`, or in-memory without one.
    pub fn open_store(&self) -> FeatureResult<Arc<dyn SettingsStore>> {
        match self.settings_path {
            Some(ref path) => Ok(Arc::new(FileStore::open(path.clone())?)),
            None => Ok(Arc::new(InMemoryStore::new())),
        }
    }
}
