use crate::supervisor::{CONFIG_VERSION, SupervisorConfig, SupervisorError};

use std::net::{IpAddr, Ipv4Addr};

#[test]
fn defaults_match_backend_allocation_window() {
    let config = SupervisorConfig::default();

    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.backend.host, "127.0.0.1");
    assert_eq!(config.backend.base_port, 8090);
    assert_eq!(config.backend.port_range, (8090, 8099));
    assert_eq!(config.health.interval_secs, 10);
    assert_eq!(config.health.failure_threshold, 3);
    assert!(config.validate().is_ok());
}

#[test]
fn rejects_privileged_base_port() {
    let mut config = SupervisorConfig::default();
    config.backend.base_port = 80;
    config.backend.port_range = (80, 89);

    assert!(matches!(
        config.validate().unwrap_err(),
        SupervisorError::ConfigInvalid { .. }
    ));
}

#[test]
fn rejects_inverted_port_range() {
    let mut config = SupervisorConfig::default();
    config.backend.port_range = (8099, 8090);

    assert!(config.validate().is_err());
}

#[test]
fn rejects_base_port_outside_search_range() {
    let mut config = SupervisorConfig::default();
    config.backend.base_port = 8100;

    assert!(config.validate().is_err());
}

#[test]
fn rejects_zero_timing_values() {
    let mut config = SupervisorConfig::default();
    config.health.interval_secs = 0;
    assert!(config.validate().is_err());

    let mut config = SupervisorConfig::default();
    config.health.probe_timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = SupervisorConfig::default();
    config.health.failure_threshold = 0;
    assert!(config.validate().is_err());
}

#[test]
fn rejects_non_local_host() {
    let mut config = SupervisorConfig::default();
    config.backend.host = "0.0.0.0".into();

    assert!(config.validate().is_err());
}

#[test]
fn load_or_create_writes_default_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();

    let created = SupervisorConfig::load_or_create(dir.path()).unwrap();
    assert!(dir.path().join("config.toml").exists());

    let loaded = SupervisorConfig::load_or_create(dir.path()).unwrap();
    assert_eq!(loaded.backend.port_range, created.backend.port_range);
    assert_eq!(loaded.health.interval_secs, created.health.interval_secs);
    assert_eq!(loaded.version, CONFIG_VERSION);
}

#[test]
fn migrates_version_zero_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "version = 0\n").unwrap();

    let config = SupervisorConfig::load_or_create(dir.path()).unwrap();

    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.health.failure_threshold, 3);
}

#[test]
fn rejects_malformed_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "version = \"not a number\"").unwrap();

    assert!(matches!(
        SupervisorConfig::load_or_create(dir.path()).unwrap_err(),
        SupervisorError::ConfigInvalid { .. }
    ));
}

#[test]
fn typed_accessors_derive_from_settings() {
    let mut config = SupervisorConfig::default();
    config.backend.host = "localhost".into();

    assert_eq!(
        config.backend.host_addr(),
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    );

    let range = config.backend.search_range();
    assert_eq!((range.min, range.max, range.base), (8090, 8099, 8090));
    assert_eq!(config.health.probe_timeout().as_millis(), 1000);
    assert_eq!(config.health.shutdown_grace().as_secs(), 5);
}
