//! Integration tests for overridable features: precedence, auto opt-in and
//! persistence across restarts.

use element_features::*;
use std::sync::Arc;

const USER: &str = "@alice:example.org";

fn feature_with(
    store: Arc<dyn SettingsStore>,
    remote: Arc<StaticRemoteFlags>,
) -> OverridableFeature {
    crypto_sdk::feature(store, remote)
}

#[test]
fn test_enable_wins_regardless_of_remote() {
    for remote_on in [false, true] {
        let remote = Arc::new(StaticRemoteFlags::new().with_flag(crypto_sdk::REMOTE_FLAG, remote_on));
        let feature = feature_with(Arc::new(InMemoryStore::new()), remote.clone());

        feature.enable().unwrap();
        assert!(feature.is_enabled());

        remote.set(crypto_sdk::REMOTE_FLAG, !remote_on).unwrap();
        assert!(feature.is_enabled());
    }
}

#[test]
fn test_reset_clears_regardless_of_prior_state() {
    let feature = feature_with(
        Arc::new(InMemoryStore::new()),
        Arc::new(StaticRemoteFlags::new().with_flag(crypto_sdk::REMOTE_FLAG, true)),
    );

    feature.reset().unwrap();
    assert!(!feature.is_enabled());

    feature.enable().unwrap();
    feature.reset().unwrap();
    assert!(!feature.is_enabled());
}

#[test]
fn test_auto_opt_in_gating() {
    let remote = Arc::new(StaticRemoteFlags::new());
    let feature = feature_with(Arc::new(InMemoryStore::new()), remote.clone());

    // Remote off never flips false to true
    for i in 0..50 {
        let user = format!("@user{}:example.org", i);
        assert!(!feature.enable_if_available(&user).unwrap());
    }
    assert!(!feature.is_enabled());

    remote.set(crypto_sdk::REMOTE_FLAG, true).unwrap();
    assert!(feature.enable_if_available(USER).unwrap());
    assert!(feature.is_enabled());

    // Remote going off later does not undo it
    remote.set(crypto_sdk::REMOTE_FLAG, false).unwrap();
    feature.enable_if_available(USER).unwrap();
    assert!(feature.is_enabled());
}

#[test]
fn test_manual_enable_eligibility_is_inverse_of_remote() {
    let remote = Arc::new(StaticRemoteFlags::new());
    let feature = feature_with(Arc::new(InMemoryStore::new()), remote.clone());

    for remote_on in [false, true, false] {
        remote.set(crypto_sdk::REMOTE_FLAG, remote_on).unwrap();
        assert_eq!(feature.can_manually_enable(USER), !remote_on);
    }
}

#[test]
fn test_override_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let remote = Arc::new(StaticRemoteFlags::new().with_flag(crypto_sdk::REMOTE_FLAG, true));

    {
        let feature = feature_with(Arc::new(FileStore::open(&path).unwrap()), remote.clone());
        assert!(feature.enable_if_available(USER).unwrap());
    }

    let feature = feature_with(Arc::new(FileStore::open(&path).unwrap()), remote.clone());
    assert_eq!(feature.state(), OverrideState::ManuallyEnabled);
    feature.reset().unwrap();

    let feature = feature_with(Arc::new(FileStore::open(&path).unwrap()), remote);
    assert_eq!(feature.state(), OverrideState::Unset);
}

#[test]
fn test_features_share_a_store_by_key() {
    let store: Arc<dyn SettingsStore> = Arc::new(InMemoryStore::new());
    let remote = Arc::new(StaticRemoteFlags::new());
    let crypto = feature_with(store.clone(), remote.clone());
    let other = OverridableFeature::new("threads", "enableThreads", "ios-threads", store.clone(), remote);

    crypto.enable().unwrap();
    assert!(crypto.is_enabled());
    assert!(!other.is_enabled());
    assert_eq!(store.keys().unwrap(), vec![crypto_sdk::SETTINGS_KEY.to_string()]);
}

#[tokio::test]
async fn test_startup_flow_with_remote_refresh() {
    let config_source = r#"
[[rollouts]]
name = "crypto-sdk-rollout"
target_percentage = 1.0

[[features]]
name = "crypto-sdk"
settings_key = "enableCryptoSDK"
remote_flag = "ios-crypto-sdk"
rollout = "crypto-sdk-rollout"
"#;
    let service = element_config::ConfigService::builder()
        .add_str(config_source, element_config::FileFormat::Toml)
        .build()
        .unwrap();
    let config = FeaturesConfig::load(&service).unwrap();

    let remote = Arc::new(RemoteFlags::new());
    let registry =
        FeatureRegistry::from_config(&config, config.open_store().unwrap(), remote.clone()).unwrap();

    // Nothing fetched yet: remote reads as off
    assert!(registry.enable_available(USER).unwrap().is_empty());
    assert!(registry.feature("crypto-sdk").unwrap().can_manually_enable(USER));

    let source = StaticRemoteFlags::new().with_flag("ios-crypto-sdk", true);
    remote
        .refresh_with_timeout(&source, config.remote_timeout())
        .await
        .unwrap();

    assert_eq!(registry.enable_available(USER).unwrap(), vec!["crypto-sdk"]);
    assert!(registry.is_enabled("crypto-sdk").unwrap());
    assert!(!registry.feature("crypto-sdk").unwrap().can_manually_enable(USER));
}
