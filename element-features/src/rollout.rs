//! Phased Rollout
//!
//! Enables a feature for a target fraction of users, built on [`Experiment`]
//! bucketing with basis-point resolution.

use crate::error::{FeatureError, FeatureResult};
use crate::experiment::Experiment;
use element_log::trace;

/// Number of buckets a rollout splits users into (0.01% granularity).
pub const ROLLOUT_RESOLUTION: u32 = 10_000;

/// Percentage-based enablement.
#[derive(Debug, Clone, PartialEq)]
pub struct PhasedRolloutFeature {
    experiment: Experiment,
    target_percentage: f64,
    threshold: u32,
}

impl PhasedRolloutFeature {
    /// Roll `name` out to `target_percentage` of users, a fraction in
    /// `[0.0, 1.0]`. Anything outside that range, or NaN, is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use element_features::PhasedRolloutFeature;
    ///
    /// let everyone = PhasedRolloutFeature::new("new-composer", 1.0).unwrap();
    /// assert!(everyone.is_enabled("@alice:matrix.org"));
    ///
    /// let nobody = PhasedRolloutFeature::new("new-composer", 0.0).unwrap();
    /// assert!(!nobody.is_enabled("@alice:matrix.org"));
    ///
    /// assert!(PhasedRolloutFeature::new("new-composer", 1.5).is_err());
    /// ```
    pub fn new(name: impl Into<String>, target_percentage: f64) -> FeatureResult<Self> {
        let name = name.into();
        if !(0.0..=1.0).contains(&target_percentage) {
            return Err(FeatureError::InvalidConfiguration(format!(
                "rollout '{}' target percentage must be within [0, 1], got {}",
                name, target_percentage
            )));
        }

        // In range, so the product is within [0, ROLLOUT_RESOLUTION]
        let threshold = (target_percentage * f64::from(ROLLOUT_RESOLUTION)).round() as u32;

        Ok(Self {
            experiment: Experiment::new(name, ROLLOUT_RESOLUTION)?,
            target_percentage,
            threshold,
        })
    }

    pub fn name(&self) -> &str {
        self.experiment.name()
    }

    pub fn target_percentage(&self) -> f64 {
        self.target_percentage
    }

    /// Whether `user_id` falls inside the rollout.
    pub fn is_enabled(&self, user_id: &str) -> bool {
        let enabled = match self.threshold {
            0 => false,
            ROLLOUT_RESOLUTION => true,
            threshold => self.experiment.variant(user_id) < threshold,
        };
        trace!(
            "rollout {} ({}) for {}: {}",
            self.name(),
            self.target_percentage,
            user_id,
            enabled
        );
        enabled
    }
}
