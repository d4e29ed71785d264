//! Feature Flags for Element
//!
//! Deterministic experiment bucketing, phased rollout and locally overridable
//! feature flags gated by remote configuration.
//!
//! # Features
//!
//! - 🎲 **Experiments** - Stable N-way user bucketing (SHA-256 based)
//! - 📈 **Phased Rollout** - Percentage-based enablement
//! - 🔒 **Local Overrides** - Persisted manual enablement that wins over remote state
//! - 🌐 **Remote Flags** - Async refresh into a synchronous snapshot
//! - 🗂️ **Config-driven** - Definitions loaded from TOML/JSON via `element-config`
//!
//! # Quick Start
//!
//! ```
//! use element_features::*;
//!
//! // Split users three ways
//! let experiment = Experiment::new("composer-layout", 3).unwrap();
//! let variant = experiment.variant("@alice:matrix.org");
//! assert!(variant < 3);
//!
//! // Enable for a quarter of users
//! let rollout = PhasedRolloutFeature::new("new-composer", 0.25).unwrap();
//! let _enabled = rollout.is_enabled("@alice:matrix.org");
//! ```
//!
//! # Local Override with Remote Gate
//!
//! ```
//! use element_features::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let remote = Arc::new(StaticRemoteFlags::new().with_flag(crypto_sdk::REMOTE_FLAG, true));
//! let feature = crypto_sdk::feature(store, remote);
//!
//! assert!(!feature.is_enabled());
//! assert!(!feature.can_manually_enable("@alice:matrix.org"));
//!
//! // Remote flag is on, so the user is opted in
//! assert!(feature.enable_if_available("@alice:matrix.org").unwrap());
//! assert!(feature.is_enabled());
//!
//! feature.reset().unwrap();
//! assert!(!feature.is_enabled());
//! ```

pub mod config;
pub mod error;
pub mod experiment;
pub mod feature;
pub mod registry;
pub mod remote;
pub mod rollout;
pub mod store;

pub use config::{ExperimentDefinition, FeaturesConfig, RolloutDefinition};
pub use error::{FeatureError, FeatureResult, StoreError, StoreResult};
pub use experiment::Experiment;
pub use feature::{FeatureDefinition, OverridableFeature, OverrideState, crypto_sdk};
pub use registry::FeatureRegistry;
pub use remote::{RemoteFeatureClient, RemoteFeatureSource, RemoteFlags, StaticRemoteFlags};
pub use rollout::{PhasedRolloutFeature, ROLLOUT_RESOLUTION};
pub use store::{FileStore, InMemoryStore, SettingsStore, SettingsStoreExt};
