//! Overridable Feature
//!
//! Combines a persisted local override, a remote flag and an optional phased
//! rollout into one enablement decision.
//!
//! The override is a two-state machine:
//!
//! ```text
//!            enable()                   reset()
//!   Unset ─────────────▶ ManuallyEnabled ─────────▶ Unset
//!     │                        ▲
//!     └── enable_if_available ─┘  (remote on, user in rollout)
//! ```
//!
//! Once manually enabled, the remote flag can no longer switch the feature
//! off; only [`OverridableFeature::reset`] does.

use crate::error::FeatureResult;
use crate::remote::RemoteFeatureClient;
use crate::rollout::PhasedRolloutFeature;
use crate::store::{SettingsStore, SettingsStoreExt};
use element_log::{debug, error, info, trace};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persisted override state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideState {
    /// No override recorded
    Unset,
    /// Enabled by the user or by automatic opt-in; persisted as `true`
    ManuallyEnabled,
}

/// Declarative description of an overridable feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    pub name: String,

    /// Key of the persisted override in the settings store
    pub settings_key: String,

    /// Flag name asked of the remote client
    pub remote_flag: String,

    /// Name of a rollout gating automatic opt-in
    #[serde(default)]
    pub rollout: Option<String>,
}

/// A feature whose enablement is a persisted local decision, seeded from a
/// remote flag.
pub struct OverridableFeature {
    name: String,
    settings_key: String,
    remote_flag: String,
    rollout: Option<PhasedRolloutFeature>,
    store: Arc<dyn SettingsStore>,
    remote: Arc<dyn RemoteFeatureClient>,
}

impl std::fmt::Debug for OverridableFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverridableFeature")
            .field("name", &self.name)
            .field("settings_key", &self.settings_key)
            .field("remote_flag", &self.remote_flag)
            .field("rollout", &self.rollout)
            .finish_non_exhaustive()
    }
}

impl OverridableFeature {
    pub fn new(
        name: impl Into<String>,
        settings_key: impl Into<String>,
        remote_flag: impl Into<String>,
        store: Arc<dyn SettingsStore>,
        remote: Arc<dyn RemoteFeatureClient>,
    ) -> Self {
        Self {
            name: name.into(),
            settings_key: settings_key.into(),
            remote_flag: remote_flag.into(),
            rollout: None,
            store,
            remote,
        }
    }

    /// Build from a definition. The definition's rollout reference is
    /// resolved by the caller and passed as `rollout`.
    pub fn from_definition(
        definition: &FeatureDefinition,
        rollout: Option<PhasedRolloutFeature>,
        store: Arc<dyn SettingsStore>,
        remote: Arc<dyn RemoteFeatureClient>,
    ) -> Self {
        Self::new(
            definition.name.clone(),
            definition.settings_key.clone(),
            definition.remote_flag.clone(),
            store,
            remote,
        )
        .with_rollout_opt(rollout)
    }

    /// Only users inside `rollout` are opted in automatically.
    pub fn with_rollout(self, rollout: PhasedRolloutFeature) -> Self {
        self.with_rollout_opt(Some(rollout))
    }

    fn with_rollout_opt(mut self, rollout: Option<PhasedRolloutFeature>) -> Self {
        self.rollout = rollout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings_key(&self) -> &str {
        &self.settings_key
    }

    pub fn remote_flag(&self) -> &str {
        &self.remote_flag
    }

    pub fn rollout(&self) -> Option<&PhasedRolloutFeature> {
        self.rollout.as_ref()
    }

    /// Current override state. An unreadable store reads as `Unset`.
    pub fn state(&self) -> OverrideState {
        match self.store.get_bool(&self.settings_key) {
            Ok(Some(true)) => OverrideState::ManuallyEnabled,
            Ok(_) => OverrideState::Unset,
            Err(e) => {
                error!(
                    "Failed to read override {} for {}: {}",
                    self.settings_key, self.name, e
                );
                OverrideState::Unset
            }
        }
    }

    /// True iff the feature has been enabled, manually or by auto opt-in.
    pub fn is_enabled(&self) -> bool {
        self.state() == OverrideState::ManuallyEnabled
    }

    pub fn enable(&self) -> FeatureResult<()> {
        self.store.set(&self.settings_key, &true)?;
        debug!("Feature {} enabled", self.name);
        Ok(())
    }

    /// Clear the override, returning to `Unset`.
    pub fn reset(&self) -> FeatureResult<()> {
        self.store.remove(&self.settings_key)?;
        debug!("Feature {} reset", self.name);
        Ok(())
    }

    /// Opt `user_id` in when the remote flag is on and the user is inside
    /// the rollout. Returns whether the state changed.
    ///
    /// A remote flag that is off never disables an existing override.
    pub fn enable_if_available(&self, user_id: &str) -> FeatureResult<bool> {
        if self.is_enabled() {
            trace!("Feature {} already enabled", self.name);
            return Ok(false);
        }

        if !self.remote.is_feature_enabled(&self.remote_flag) {
            trace!(
                "Feature {} not available: remote flag {} is off",
                self.name, self.remote_flag
            );
            return Ok(false);
        }

        if let Some(ref rollout) = self.rollout
            && !rollout.is_enabled(user_id)
        {
            trace!(
                "Feature {} not available: {} outside rollout {}",
                self.name,
                user_id,
                rollout.name()
            );
            return Ok(false);
        }

        self.enable()?;
        info!("Feature {} automatically enabled for {}", self.name, user_id);
        Ok(true)
    }

    /// Whether the UI should offer a manual toggle: only while the remote
    /// flag is off, since otherwise the feature is remotely managed.
    pub fn can_manually_enable(&self, user_id: &str) -> bool {
        let remote_enabled = self.remote.is_feature_enabled(&self.remote_flag);
        trace!(
            "Feature {} manual toggle for {}: {}",
            self.name, user_id, !remote_enabled
        );
        !remote_enabled
    }
}

/// Defaults for the crypto SDK feature.
pub mod crypto_sdk {
    use super::*;

    pub const NAME: &str = "crypto-sdk";
    pub const SETTINGS_KEY: &str = "enableCryptoSDK";
    pub const REMOTE_FLAG: &str = "ios-crypto-sdk";

    pub fn definition() -> FeatureDefinition {
        FeatureDefinition {
            name: NAME.to_string(),
            settings_key: SETTINGS_KEY.to_string(),
            remote_flag: REMOTE_FLAG.to_string(),
            rollout: None,
        }
    }

    pub fn feature(
        store: Arc<dyn SettingsStore>,
        remote: Arc<dyn RemoteFeatureClient>,
    ) -> OverridableFeature {
        OverridableFeature::from_definition(&definition(), None, store, remote)
    }
}
