//! Experiment Bucketing
//!
//! Assigns an opaque user identifier to one of N variants. The assignment is
//! a pure function of `(experiment name, user id)`: SHA-256 over the name, a
//! zero byte and the user id, with the first eight digest bytes read as a
//! big-endian `u64` and reduced modulo the variant count. The digest is
//! pinned so every process and platform buckets a user identically.

use crate::error::{FeatureError, FeatureResult};
use element_log::trace;
use sha2::{Digest, Sha256};

/// Deterministic N-way split of users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experiment {
    name: String,
    variant_count: u32,
}

impl Experiment {
    /// Create an experiment with `variant_count` buckets.
    ///
    /// A zero variant count has no meaningful assignment and is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use element_features::Experiment;
    ///
    /// let experiment = Experiment::new("composer-layout", 3).unwrap();
    /// let variant = experiment.variant("@alice:matrix.org");
    /// assert!(variant < 3);
    /// assert_eq!(variant, experiment.variant("@alice:matrix.org"));
    /// ```
    pub fn new(name: impl Into<String>, variant_count: u32) -> FeatureResult<Self> {
        let name = name.into();
        if variant_count == 0 {
            return Err(FeatureError::InvalidConfiguration(format!(
                "experiment '{}' must have at least one variant",
                name
            )));
        }
        Ok(Self {
            name,
            variant_count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variant_count(&self) -> u32 {
        self.variant_count
    }

    /// Variant index in `[0, variant_count)` for `user_id`.
    pub fn variant(&self, user_id: &str) -> u32 {
        if self.variant_count == 1 {
            return 0;
        }

        let digest = salted_digest(&self.name, user_id);
        // Remainder is below variant_count, which fits in u32
        let variant = (leading_u64(&digest) % u64::from(self.variant_count)) as u32;
        trace!(
            "experiment {} digest {} -> variant {}",
            self.name,
            hex::encode(&digest[..4]),
            variant
        );
        variant
    }

    /// Pick the value for the user's variant from `variants`, one entry per
    /// variant. `None` if the slice length does not match the variant count.
    pub fn select<'a, T>(&self, user_id: &str, variants: &'a [T]) -> Option<&'a T> {
        if variants.len() != self.variant_count as usize {
            return None;
        }
        variants.get(self.variant(user_id) as usize)
    }
}

fn salted_digest(salt: &str, user_id: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update([0u8]);
    hasher.update(user_id.as_bytes());
    hasher.finalize().into()
}

fn leading_u64(digest: &[u8; 32]) -> u64 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}
