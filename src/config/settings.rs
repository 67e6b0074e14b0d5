use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, the broker and snapshot storage.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub storage: StorageSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Timing of leases and background loops, in milliseconds.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub lease_ms: u64,
    pub sweep_interval_ms: u64,
    pub snapshot_interval_ms: u64,
}

impl BrokerSettings {
    pub fn lease(&self) -> Duration {
        Duration::from_millis(self.lease_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Sled,
}

/// Where snapshots are kept.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub path: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub storage: Option<PartialStorageSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub lease_ms: Option<u64>,
    pub sweep_interval_ms: Option<u64>,
    pub snapshot_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialStorageSettings {
    pub backend: Option<StorageBackend>,
    pub path: Option<String>,
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 12345,
                log_level: "info".to_string(),
            },
            broker: BrokerSettings {
                lease_ms: 30_000,
                sweep_interval_ms: 1_000,
                snapshot_interval_ms: 60_000,
            },
            storage: StorageSettings {
                backend: StorageBackend::File,
                path: "popmq_data".to_string(),
            },
        }
    }
}
