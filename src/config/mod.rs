mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    BrokerSettings, ServerSettings, Settings, StorageBackend, StorageSettings,
};

const DEFAULT_CONFIG_FILE: &str = "config/default";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server, broker and storage configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Like `load_config`, reading the optional file `path` (any extension the
/// `config` crate recognizes) instead of `config/default`.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("POPMQ")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();
    let server = partial.server;
    let broker = partial.broker;
    let storage = partial.storage;

    let settings = Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            log_level: server
                .as_ref()
                .and_then(|s| s.log_level.clone())
                .unwrap_or(default.server.log_level),
        },
        broker: BrokerSettings {
            lease_ms: broker
                .as_ref()
                .and_then(|b| b.lease_ms)
                .unwrap_or(default.broker.lease_ms),
            sweep_interval_ms: broker
                .as_ref()
                .and_then(|b| b.sweep_interval_ms)
                .unwrap_or(default.broker.sweep_interval_ms),
            snapshot_interval_ms: broker
                .as_ref()
                .and_then(|b| b.snapshot_interval_ms)
                .unwrap_or(default.broker.snapshot_interval_ms),
        },
        storage: StorageSettings {
            backend: storage
                .as_ref()
                .and_then(|s| s.backend)
                .unwrap_or(default.storage.backend),
            path: storage
                .as_ref()
                .and_then(|s| s.path.clone())
                .unwrap_or(default.storage.path),
        },
    };

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    /// Reject settings the broker cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let broker = &self.broker;
        for (name, value) in [
            ("broker.lease_ms", broker.lease_ms),
            ("broker.sweep_interval_ms", broker.sweep_interval_ms),
            ("broker.snapshot_interval_ms", broker.snapshot_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Message(format!("{name} must be greater than 0")));
            }
        }
        if self.storage.path.is_empty() {
            return Err(ConfigError::Message("storage.path must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
