//! Remote feature flags.
//!
//! Decisions read a resolved snapshot through [`RemoteFeatureClient`]. Fetching
//! is a separate async step ([`RemoteFlags::refresh`]) so evaluation never
//! waits on the network.

use crate::error::{FeatureError, FeatureResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use element_log::{debug, error, warn};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Synchronous view of remote flags.
pub trait RemoteFeatureClient: Send + Sync {
    /// Unknown or unavailable flags report `false`.
    fn is_feature_enabled(&self, feature: &str) -> bool;
}

/// Fetches the full set of remote flags.
#[async_trait]
pub trait RemoteFeatureSource: Send + Sync {
    async fn fetch(&self) -> FeatureResult<HashMap<String, bool>>;
}

// A poisoned lock is an error wherever the API returns `Result`; boolean
// queries log it and read the flag as off.

fn read<T>(lock: &RwLock<T>) -> FeatureResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| FeatureError::Poisoned)
}

fn write<T>(lock: &RwLock<T>) -> FeatureResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| FeatureError::Poisoned)
}

fn flag_or_off(flags: FeatureResult<Option<bool>>, feature: &str) -> bool {
    match flags {
        Ok(enabled) => enabled.unwrap_or(false),
        Err(e) => {
            error!("Failed to read remote flag {}: {}", feature, e);
            false
        }
    }
}

// ========== Static flags ==========

/// Fixed flag values, settable at runtime. Serves as both client and source.
#[derive(Debug, Default)]
pub struct StaticRemoteFlags {
    flags: RwLock<HashMap<String, bool>>,
}

impl StaticRemoteFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(self, feature: impl Into<String>, enabled: bool) -> Self {
        let feature = feature.into();
        if let Err(e) = self.set(feature.clone(), enabled) {
            error!("Failed to set remote flag {}: {}", feature, e);
        }
        self
    }

    pub fn set(&self, feature: impl Into<String>, enabled: bool) -> FeatureResult<()> {
        write(&self.flags)?.insert(feature.into(), enabled);
        Ok(())
    }
}

impl RemoteFeatureClient for StaticRemoteFlags {
    fn is_feature_enabled(&self, feature: &str) -> bool {
        flag_or_off(
            read(&self.flags).map(|flags| flags.get(feature).copied()),
            feature,
        )
    }
}

#[async_trait]
impl RemoteFeatureSource for StaticRemoteFlags {
    async fn fetch(&self) -> FeatureResult<HashMap<String, bool>> {
        Ok(read(&self.flags)?.clone())
    }
}

// ========== Refreshed snapshot ==========

#[derive(Debug, Default)]
struct Snapshot {
    flags: HashMap<String, bool>,
    fetched_at: Option<DateTime<Utc>>,
}

/// Last successfully fetched remote flags.
///
/// Until the first successful refresh, and after any failed one, every flag
/// reads as `false`.
#[derive(Debug, Default)]
pub struct RemoteFlags {
    snapshot: RwLock<Snapshot>,
}

impl RemoteFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with a fresh fetch. Returns the number of flags.
    pub async fn refresh(&self, source: &dyn RemoteFeatureSource) -> FeatureResult<usize> {
        match source.fetch().await {
            Ok(flags) => self.install(flags),
            Err(e) => {
                self.clear(&e)?;
                Err(e)
            }
        }
    }

    /// Like [`refresh`](Self::refresh), giving up after `timeout`.
    ///
    /// Needs a Tokio runtime with the time driver enabled.
    pub async fn refresh_with_timeout(
        &self,
        source: &dyn RemoteFeatureSource,
        timeout: Duration,
    ) -> FeatureResult<usize> {
        match tokio::time::timeout(timeout, source.fetch()).await {
            Ok(Ok(flags)) => self.install(flags),
            Ok(Err(e)) => {
                self.clear(&e)?;
                Err(e)
            }
            Err(_) => {
                let e = FeatureError::RemoteTimeout;
                self.clear(&e)?;
                Err(e)
            }
        }
    }

    fn install(&self, flags: HashMap<String, bool>) -> FeatureResult<usize> {
        let count = flags.len();
        let mut snapshot = write(&self.snapshot)?;
        snapshot.flags = flags;
        snapshot.fetched_at = Some(Utc::now());
        debug!("Remote flags refreshed ({} flags)", count);
        Ok(count)
    }

    fn clear(&self, error: &FeatureError) -> FeatureResult<()> {
        warn!("Remote flag refresh failed, treating all flags as off: {}", error);
        *write(&self.snapshot)? = Snapshot::default();
        Ok(())
    }

    /// True once a refresh has succeeded and no later refresh failed.
    pub fn is_available(&self) -> bool {
        self.last_refreshed().is_some()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        match read(&self.snapshot) {
            Ok(snapshot) => snapshot.fetched_at,
            Err(e) => {
                error!("Failed to read remote flag snapshot: {}", e);
                None
            }
        }
    }
}

impl RemoteFeatureClient for RemoteFlags {
    fn is_feature_enabled(&self, feature: &str) -> bool {
        flag_or_off(
            read(&self.snapshot).map(|snapshot| snapshot.flags.get(feature).copied()),
            feature,
        )
    }
}
