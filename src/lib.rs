// Element Rollout - deterministic bucketing and overridable feature flags
//
// Re-exports the member crates behind one dependency.

pub use element_features::*;

pub use element_log;

#[cfg(feature = "config")]
pub use element_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Experiment, FeatureError, FeatureRegistry, FeatureResult, FeaturesConfig, FileStore,
        InMemoryStore, OverridableFeature, OverrideState, PhasedRolloutFeature, RemoteFeatureClient,
        RemoteFeatureSource, RemoteFlags, SettingsStore, SettingsStoreExt, StaticRemoteFlags,
        crypto_sdk,
    };
}
