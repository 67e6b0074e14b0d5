use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use super::*;

fn missing_file(tmp: &TempDir) -> String {
    tmp.path().join("absent").to_string_lossy().into_owned()
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 12345);
    assert_eq!(settings.server.addr(), "127.0.0.1:12345");
    assert_eq!(settings.broker.lease_ms, 30_000);
    assert_eq!(settings.broker.sweep_interval_ms, 1_000);
    assert_eq!(settings.broker.snapshot_interval_ms, 60_000);
    assert_eq!(settings.storage.backend, StorageBackend::File);
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn load_config_without_sources_uses_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let cfg = load_config_from(&missing_file(&tmp)).expect("load_config failed");
    assert_eq!(cfg.server.port, 12345);
    assert_eq!(cfg.storage.path, "popmq_data");
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [broker]
        lease_ms = 5000
        sweep_interval_ms = 250

        [storage]
        backend = "sled"
        path = "/var/lib/popmq"
    "#;
    fs::write(tmp.path().join("popmq.toml"), toml).expect("write config file");

    let cfg = load_config_from(&tmp.path().join("popmq").to_string_lossy())
        .expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.log_level, "info");
    assert_eq!(cfg.broker.lease(), std::time::Duration::from_secs(5));
    assert_eq!(cfg.broker.sweep_interval_ms, 250);
    assert_eq!(cfg.broker.snapshot_interval_ms, 60_000);
    assert_eq!(cfg.storage.backend, StorageBackend::Sled);
    assert_eq!(cfg.storage.path, "/var/lib/popmq");
}

#[test]
#[serial]
fn load_config_from_env_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    temp_env::with_vars(
        [
            ("POPMQ_SERVER__PORT", Some("4000")),
            ("POPMQ_BROKER__LEASE_MS", Some("9000")),
            ("POPMQ_STORAGE__BACKEND", Some("sled")),
        ],
        || {
            let cfg = load_config_from(&missing_file(&tmp)).expect("load_config failed");
            assert_eq!(cfg.server.port, 4000);
            assert_eq!(cfg.broker.lease_ms, 9000);
            assert_eq!(cfg.storage.backend, StorageBackend::Sled);
        },
    );
}

#[test]
#[serial]
fn load_config_rejects_zero_interval() {
    let tmp = TempDir::new().expect("create tempdir");
    temp_env::with_var("POPMQ_BROKER__SWEEP_INTERVAL_MS", Some("0"), || {
        assert!(load_config_from(&missing_file(&tmp)).is_err());
    });
}

#[test]
fn validate_accepts_lease_below_sweep_interval() {
    let mut settings = Settings::default();
    settings.broker.lease_ms = 500;
    settings.broker.sweep_interval_ms = 1000;
    assert!(settings.validate().is_ok());
}
