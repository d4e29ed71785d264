//! Property tests for experiment bucketing and phased rollout.

use element_features::{Experiment, PhasedRolloutFeature};
use proptest::prelude::*;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::collections::{BTreeSet, HashSet};

fn random_user_ids(count: usize) -> Vec<String> {
    let mut rng = rand::rng();
    let mut ids = HashSet::with_capacity(count);
    while ids.len() < count {
        let local: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        ids.insert(format!("@{}:example.org", local.to_lowercase()));
    }
    ids.into_iter().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn variant_is_deterministic(name in ".{0,24}", variants in 1u32..1000, user_id in ".{0,64}") {
        let experiment = Experiment::new(name.clone(), variants).unwrap();
        let rebuilt = Experiment::new(name, variants).unwrap();
        prop_assert_eq!(experiment.variant(&user_id), experiment.variant(&user_id));
        prop_assert_eq!(experiment.variant(&user_id), rebuilt.variant(&user_id));
    }

    #[test]
    fn variant_is_in_range(name in "[a-z-]{1,16}", variants in 1u32..=u32::MAX, user_id in ".{0,64}") {
        let experiment = Experiment::new(name, variants).unwrap();
        prop_assert!(experiment.variant(&user_id) < variants);
    }

    #[test]
    fn single_variant_is_zero(name in ".{0,24}", user_id in ".{0,64}") {
        let experiment = Experiment::new(name, 1).unwrap();
        prop_assert_eq!(experiment.variant(&user_id), 0);
    }

    #[test]
    fn rollout_is_deterministic(percentage in 0.0f64..=1.0, user_id in ".{0,64}") {
        let rollout = PhasedRolloutFeature::new("prop-rollout", percentage).unwrap();
        prop_assert_eq!(rollout.is_enabled(&user_id), rollout.is_enabled(&user_id));
    }

    #[test]
    fn rollout_bounds_hold(user_id in ".{0,64}") {
        let none = PhasedRolloutFeature::new("bounds", 0.0).unwrap();
        let all = PhasedRolloutFeature::new("bounds", 1.0).unwrap();
        prop_assert!(!none.is_enabled(&user_id));
        prop_assert!(all.is_enabled(&user_id));
    }
}

#[test]
fn two_variants_both_reached() {
    let experiment = Experiment::new("two", 2).unwrap();
    let seen: BTreeSet<u32> = random_user_ids(1000)
        .iter()
        .map(|id| experiment.variant(id))
        .collect();

    assert_eq!(seen, BTreeSet::from([0, 1]));
}

#[test]
fn five_variants_stay_in_range() {
    let experiment = Experiment::new("five", 5).unwrap();
    let seen: BTreeSet<u32> = random_user_ids(1000)
        .iter()
        .map(|id| experiment.variant(id))
        .collect();

    assert!((2..=5).contains(&seen.len()), "saw {:?}", seen);
    assert!(seen.iter().all(|v| *v < 5));
}

#[test]
fn small_variant_counts_get_fair_shares() {
    let ids = random_user_ids(2000);
    for variants in 2u32..=5 {
        let experiment = Experiment::new(format!("share-{}", variants), variants).unwrap();
        let mut counts = vec![0usize; variants as usize];
        for id in &ids {
            counts[experiment.variant(id) as usize] += 1;
        }
        let expected = ids.len() / variants as usize;
        for (variant, count) in counts.iter().enumerate() {
            assert!(
                *count > expected / 2,
                "variant {} of {} got only {} of {}",
                variant,
                variants,
                count,
                ids.len()
            );
        }
    }
}

#[test]
fn rollout_boundaries_over_random_ids() {
    let ids = random_user_ids(1000);
    let none = PhasedRolloutFeature::new("boundary", 0.0).unwrap();
    let all = PhasedRolloutFeature::new("boundary", 1.0).unwrap();

    assert!(ids.iter().all(|id| !none.is_enabled(id)));
    assert!(ids.iter().all(|id| all.is_enabled(id)));
}

#[test]
fn rollout_midpoint_produces_both_outcomes() {
    let rollout = PhasedRolloutFeature::new("midpoint", 0.5).unwrap();
    let outcomes: BTreeSet<bool> = random_user_ids(1000)
        .iter()
        .map(|id| rollout.is_enabled(id))
        .collect();

    assert_eq!(outcomes, BTreeSet::from([false, true]));
}

#[test]
fn rollout_fraction_is_approximate() {
    let ids = random_user_ids(4000);
    for percentage in [0.1, 0.25, 0.5, 0.9] {
        let rollout = PhasedRolloutFeature::new("fraction", percentage).unwrap();
        let enabled = ids.iter().filter(|id| rollout.is_enabled(id)).count();
        let fraction = enabled as f64 / ids.len() as f64;
        assert!(
            (fraction - percentage).abs() < 0.05,
            "{} targeted, {} observed",
            percentage,
            fraction
        );
    }
}
