//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file may name only the fields it changes.

use std::collections::BTreeMap;

use geodns_logging::{LogFormat, LogLevel};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000, "maxConnections": 500 },
///   "logging": { "level": "debug", "format": "json" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeoDnsSettings {
    /// Listener and connection settings.
    pub server: ServerSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl GeoDnsSettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let server = &self.server;
        if server.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxConnections must be at least 1".into(),
            ));
        }
        if server.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueueCapacity must be at least 1".into(),
            ));
        }
        if server.heartbeat_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "server.heartbeatIntervalMs must be at least 1".into(),
            ));
        }
        if server.heartbeat_timeout_ms < server.heartbeat_interval_ms {
            return Err(SettingsError::InvalidValue(format!(
                "server.heartbeatTimeoutMs ({}) is shorter than heartbeatIntervalMs ({})",
                server.heartbeat_timeout_ms, server.heartbeat_interval_ms
            )));
        }
        if server.max_message_size == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxMessageSize must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Listener and per-connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port (0 picks an ephemeral port).
    pub port: u16,
    /// Upper bound on simultaneously open WebSocket connections.
    pub max_connections: usize,
    /// Interval between server pings, in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// A connection silent for this long is closed, in milliseconds.
    pub heartbeat_timeout_ms: u64,
    /// Outbound messages buffered per connection before drops start.
    pub send_queue_capacity: usize,
    /// Largest accepted inbound frame, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_connections: 1000,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            send_queue_capacity: 256,
            max_message_size: 1024 * 1024,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level for every target.
    pub level: LogLevel,
    /// Stdout format.
    pub format: LogFormat,
    /// Per-target level overrides, e.g. `{"tower_http": "debug"}`.
    pub modules: BTreeMap<String, LogLevel>,
}

impl LoggingSettings {
    /// `EnvFilter` directive for these settings.
    pub fn filter_directive(&self) -> String {
        let overrides: Vec<(String, LogLevel)> = self
            .modules
            .iter()
            .map(|(target, level)| (target.clone(), *level))
            .collect();
        geodns_logging::filter_directive(self.level, &overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults() {
        let settings = GeoDnsSettings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.server.send_queue_capacity, 256);
        assert_eq!(settings.logging.level, LogLevel::Info);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn camel_case_wire_names() {
        let json = serde_json::to_value(GeoDnsSettings::default()).unwrap();
        assert_eq!(json["server"]["maxConnections"], 1000);
        assert_eq!(json["server"]["heartbeatIntervalMs"], 30_000);
        assert_eq!(json["server"]["sendQueueCapacity"], 256);
        assert_eq!(json["logging"]["level"], "info");
        assert_eq!(json["logging"]["format"], "pretty");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: GeoDnsSettings =
            serde_json::from_str(r#"{"server": {"port": 9001}}"#).unwrap();
        assert_eq!(settings.server.port, 9001);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.logging, LoggingSettings::default());
    }

    #[test]
    fn validate_rejects_zero_queue() {
        let mut settings = GeoDnsSettings::default();
        settings.server.send_queue_capacity = 0;
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(msg)) if msg.contains("sendQueueCapacity"));
    }

    #[test]
    fn validate_rejects_zero_max_connections() {
        let mut settings = GeoDnsSettings::default();
        settings.server.max_connections = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_timeout_shorter_than_interval() {
        let mut settings = GeoDnsSettings::default();
        settings.server.heartbeat_interval_ms = 10_000;
        settings.server.heartbeat_timeout_ms = 5_000;
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(msg)) if msg.contains("heartbeatTimeoutMs"));
    }

    #[test]
    fn logging_filter_directive_includes_modules() {
        let mut logging = LoggingSettings {
            level: LogLevel::Warn,
            ..LoggingSettings::default()
        };
        let _ = logging.modules.insert("geodns_server".into(), LogLevel::Debug);
        let _ = logging.modules.insert("tower_http".into(), LogLevel::Info);
        assert_eq!(
            logging.filter_directive(),
            "warn,geodns_server=debug,tower_http=info"
        );
    }
}
