//! Integration tests for common rollout workflows through the facade crate.
//!
//! These tests verify that the most common use cases work end to end.

use element::prelude::*;
use std::io::Write;
use std::sync::Arc;

// =============================================================================
// Bucketing
// =============================================================================

#[test]
fn test_experiment_assigns_typed_variants() {
    let experiment = Experiment::new("room-list-style", 2).unwrap();
    let styles = ["compact", "spacious"];

    let style = experiment.select("@alice:example.org", &styles).unwrap();
    assert_eq!(
        experiment.select("@alice:example.org", &styles).unwrap(),
        style
    );
}

#[test]
fn test_invalid_definitions_fail_fast() {
    assert!(matches!(
        Experiment::new("none", 0),
        Err(FeatureError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        PhasedRolloutFeature::new("negative", -0.5),
        Err(FeatureError::InvalidConfiguration(_))
    ));
}

// =============================================================================
// Config file to registry
// =============================================================================

#[tokio::test]
async fn test_config_file_to_enabled_feature() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("settings.json");
    let config_path = dir.path().join("features.json");

    let mut file = std::fs::File::create(&config_path).unwrap();
    write!(
        file,
        r#"{{
            "settings_path": {settings:?},
            "remote_timeout_ms": 1000,
            "experiments": [{{"name": "composer-layout", "variants": 3}}],
            "rollouts": [{{"name": "all", "target_percentage": 1.0}}],
            "features": [{{
                "name": "crypto-sdk",
                "settings_key": "enableCryptoSDK",
                "remote_flag": "ios-crypto-sdk",
                "rollout": "all"
            }}]
        }}"#,
        settings = settings_path.to_str().unwrap()
    )
    .unwrap();
    drop(file);

    let config = FeaturesConfig::from_file(&config_path).unwrap();
    assert_eq!(config.remote_timeout_ms, 1000);

    let remote = Arc::new(RemoteFlags::new());
    let source = StaticRemoteFlags::new().with_flag(crypto_sdk::REMOTE_FLAG, true);
    remote
        .refresh_with_timeout(&source, config.remote_timeout())
        .await
        .unwrap();

    let registry =
        FeatureRegistry::from_config(&config, config.open_store().unwrap(), remote.clone())
            .unwrap();
    assert_eq!(
        registry.enable_available("@alice:example.org").unwrap(),
        vec!["crypto-sdk".to_string()]
    );

    // A second process sees the persisted override
    let reopened =
        FeatureRegistry::from_config(&config, config.open_store().unwrap(), remote).unwrap();
    assert_eq!(
        reopened.snapshot()["crypto-sdk"],
        OverrideState::ManuallyEnabled
    );
}

// =============================================================================
// Logging
// =============================================================================

#[test]
fn test_state_transitions_are_logged() {
    let guard = element::element_log::capture();

    let feature = crypto_sdk::feature(
        Arc::new(InMemoryStore::new()),
        Arc::new(StaticRemoteFlags::new()),
    );
    feature.enable().unwrap();
    feature.reset().unwrap();

    assert!(guard.contains("Feature crypto-sdk enabled"));
    assert!(guard.contains("Feature crypto-sdk reset"));
}
