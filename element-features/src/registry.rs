//! Feature registry built from [`FeaturesConfig`].

use crate::config::FeaturesConfig;
use crate::error::{FeatureError, FeatureResult};
use crate::experiment::Experiment;
use crate::feature::{OverridableFeature, OverrideState};
use crate::remote::RemoteFeatureClient;
use crate::rollout::PhasedRolloutFeature;
use crate::store::SettingsStore;
use element_log::{debug, error, info};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Named experiments, rollouts and overridable features of one installation.
#[derive(Debug)]
pub struct FeatureRegistry {
    experiments: HashMap<String, Experiment>,
    rollouts: HashMap<String, PhasedRolloutFeature>,
    features: BTreeMap<String, OverridableFeature>,
}

impl FeatureRegistry {
    /// Build every definition in `config`. Invalid definitions fail the
    /// whole registry.
    pub fn from_config(
        config: &FeaturesConfig,
        store: Arc<dyn SettingsStore>,
        remote: Arc<dyn RemoteFeatureClient>,
    ) -> FeatureResult<Self> {
        let experiments = config
            .experiments
            .iter()
            .map(|def| Ok((def.name.clone(), Experiment::new(&def.name, def.variants)?)))
            .collect::<FeatureResult<HashMap<_, _>>>()?;

        let rollouts = config
            .rollouts
            .iter()
            .map(|def| {
                Ok((
                    def.name.clone(),
                    PhasedRolloutFeature::new(&def.name, def.target_percentage)?,
                ))
            })
            .collect::<FeatureResult<HashMap<_, _>>>()?;

        let mut features = BTreeMap::new();
        for def in &config.features {
            let rollout = match def.rollout {
                Some(ref name) => Some(rollouts.get(name).cloned().ok_or_else(|| {
                    FeatureError::InvalidConfiguration(format!(
                        "feature '{}' references unknown rollout '{}'",
                        def.name, name
                    ))
                })?),
                None => None,
            };
            let feature =
                OverridableFeature::from_definition(def, rollout, store.clone(), remote.clone());
            features.insert(def.name.clone(), feature);
        }

        debug!(
            "Feature registry built: {} experiments, {} rollouts, {} features",
            experiments.len(),
            rollouts.len(),
            features.len()
        );

        Ok(Self {
            experiments,
            rollouts,
            features,
        })
    }

    pub fn experiment(&self, name: &str) -> Option<&Experiment> {
        self.experiments.get(name)
    }

    /// Variant of `user_id` in the named experiment.
    pub fn variant(&self, experiment: &str, user_id: &str) -> FeatureResult<u32> {
        self.experiment(experiment)
            .map(|e| e.variant(user_id))
            .ok_or_else(|| FeatureError::UnknownFeature(experiment.to_string()))
    }

    pub fn rollout(&self, name: &str) -> Option<&PhasedRolloutFeature> {
        self.rollouts.get(name)
    }

    pub fn is_rollout_enabled(&self, name: &str, user_id: &str) -> FeatureResult<bool> {
        self.rollout(name)
            .map(|r| r.is_enabled(user_id))
            .ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))
    }

    pub fn feature(&self, name: &str) -> Option<&OverridableFeature> {
        self.features.get(name)
    }

    pub fn features(&self) -> impl Iterator<Item = &OverridableFeature> {
        self.features.values()
    }

    pub fn is_enabled(&self, name: &str) -> FeatureResult<bool> {
        self.feature(name)
            .map(OverridableFeature::is_enabled)
            .ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))
    }

    /// Run [`OverridableFeature::enable_if_available`] for every feature,
    /// typically once at startup after remote flags are resolved. Returns
    /// the names that were switched on.
    ///
    /// A failing feature is logged and skipped so one broken key does not
    /// block the others; the first error is returned after all ran.
    pub fn enable_available(&self, user_id: &str) -> FeatureResult<Vec<String>> {
        let mut enabled = Vec::new();
        let mut first_error = None;

        for (name, feature) in &self.features {
            match feature.enable_if_available(user_id) {
                Ok(true) => enabled.push(name.clone()),
                Ok(false) => {}
                Err(e) => {
                    error!("Automatic enablement of {} failed: {}", name, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if !enabled.is_empty() {
            info!("Automatically enabled {:?} for {}", enabled, user_id);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(enabled),
        }
    }

    /// Override state of every feature, by name.
    pub fn snapshot(&self) -> BTreeMap<String, OverrideState> {
        self.features
            .iter()
            .map(|(name, feature)| (name.clone(), feature.state()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExperimentDefinition, RolloutDefinition};
    use crate::feature::FeatureDefinition;
    use crate::remote::StaticRemoteFlags;
    use crate::store::InMemoryStore;

    fn config() -> FeaturesConfig {
        FeaturesConfig {
            experiments: vec![ExperimentDefinition {
                name: "composer-layout".to_string(),
                variants: 3,
            }],
            rollouts: vec![
                RolloutDefinition {
                    name: "everyone".to_string(),
                    target_percentage: 1.0,
                },
                RolloutDefinition {
                    name: "nobody".to_string(),
                    target_percentage: 0.0,
                },
            ],
            features: vec![
                FeatureDefinition {
                    name: "crypto-sdk".to_string(),
                    settings_key: "enableCryptoSDK".to_string(),
                    remote_flag: "ios-crypto-sdk".to_string(),
                    rollout: Some("everyone".to_string()),
                },
                FeatureDefinition {
                    name: "threads".to_string(),
                    settings_key: "enableThreads".to_string(),
                    remote_flag: "ios-threads".to_string(),
                    rollout: Some("nobody".to_string()),
                },
                FeatureDefinition {
                    name: "voice-broadcast".to_string(),
                    settings_key: "enableVoiceBroadcast".to_string(),
                    remote_flag: "ios-voice-broadcast".to_string(),
                    rollout: None,
                },
            ],
            ..FeaturesConfig::default()
        }
    }

    fn registry(remote: StaticRemoteFlags) -> FeatureRegistry {
        FeatureRegistry::from_config(&config(), Arc::new(InMemoryStore::new()), Arc::new(remote))
            .unwrap()
    }

    #[test]
    fn test_lookup() {
        let registry = registry(StaticRemoteFlags::new());
        assert!(registry.variant("composer-layout", "@alice:example.org").unwrap() < 3);
        assert!(registry.is_rollout_enabled("everyone", "@alice:example.org").unwrap());
        assert!(!registry.is_rollout_enabled("nobody", "@alice:example.org").unwrap());
        assert_eq!(registry.features().count(), 3);
        assert!(matches!(
            registry.is_enabled("missing"),
            Err(FeatureError::UnknownFeature(_))
        ));
        assert!(registry.variant("missing", "@alice:example.org").is_err());
    }

    #[test]
    fn test_enable_available() {
        let remote = StaticRemoteFlags::new()
            .with_flag("ios-crypto-sdk", true)
            .with_flag("ios-threads", true)
            .with_flag("ios-voice-broadcast", false);
        let registry = registry(remote);

        let enabled = registry.enable_available("@alice:example.org").unwrap();
        assert_eq!(enabled, vec!["crypto-sdk".to_string()]);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot["crypto-sdk"], OverrideState::ManuallyEnabled);
        assert_eq!(snapshot["threads"], OverrideState::Unset);
        assert_eq!(snapshot["voice-broadcast"], OverrideState::Unset);

        assert!(registry.enable_available("@alice:example.org").unwrap().is_empty());
    }

    #[test]
    fn test_dangling_rollout_rejected() {
        let mut config = config();
        config.rollouts.clear();
        let err = FeatureRegistry::from_config(
            &config,
            Arc::new(InMemoryStore::new()),
            Arc::new(StaticRemoteFlags::new()),
        )
        .unwrap_err();
        assert!(matches!(err, FeatureError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_invalid_experiment_rejected() {
        let mut config = config();
        config.experiments[0].variants = 0;
        assert!(FeatureRegistry::from_config(
            &config,
            Arc::new(InMemoryStore::new()),
            Arc::new(StaticRemoteFlags::new()),
        )
        .is_err());
    }
}
