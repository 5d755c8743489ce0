//! Bridge configuration with validation.
//!
//! Sources, later ones overriding earlier ones: built-in defaults, a TOML file,
//! environment variables.

use crate::domain::error::ConfigError;
use crate::domain::operation::Operation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Topic and subscription names on the backbone
    pub transport: TransportConfig,
    /// Waiter deadlines and background task cadence
    pub timeouts: TimeoutConfig,
}

/// Backbone names and credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Topic requests are published on
    pub outbound_topic: String,
    /// Shared subscription responses arrive on
    pub inbound_subscription: String,
    /// Service account key file. Not read by the bridge; handed to the
    /// deployment's backbone client when it builds the transport.
    pub credentials_file: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            outbound_topic: "booking-backend".to_string(),
            inbound_subscription: "recommendation-service-sub".to_string(),
            credentials_file: None,
        }
    }
}

/// Deadlines. There is no setting for an unbounded wait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for read operations
    #[serde(with = "humantime_serde")]
    pub default: Duration,
    /// Deadline for write operations
    #[serde(with = "humantime_serde")]
    pub write: Duration,
    /// How often the expiry sweep runs
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// How long shutdown waits for in-flight waiters
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(10),
            write: Duration::from_secs(15),
            sweep_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl TimeoutConfig {
    /// Deadline applied to a waiter for `operation`
    pub fn for_operation(&self, operation: Operation) -> Duration {
        if operation.is_write() {
            self.write
        } else {
            self.default
        }
    }
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.outbound_topic.trim().is_empty() {
            return Err(ConfigError::Invalid("outbound_topic cannot be empty".into()));
        }
        if self.transport.inbound_subscription.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "inbound_subscription cannot be empty".into(),
            ));
        }

        let durations = [
            ("timeouts.default", self.timeouts.default),
            ("timeouts.write", self.timeouts.write),
            ("timeouts.sweep_interval", self.timeouts.sweep_interval),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{} cannot be 0", name)));
            }
        }

        Ok(())
    }

    /// Parse a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `BOOKING_OUTBOUND_TOPIC` | `transport.outbound_topic` |
    /// | `BOOKING_INBOUND_SUBSCRIPTION` | `transport.inbound_subscription` |
    /// | `keyfile` | `transport.credentials_file` |
    /// | `BOOKING_REQUEST_TIMEOUT` | `timeouts.default` |
    /// | `BOOKING_WRITE_TIMEOUT` | `timeouts.write` |
    /// | `BOOKING_SWEEP_INTERVAL` | `timeouts.sweep_interval` |
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(topic) = lookup("BOOKING_OUTBOUND_TOPIC") {
            self.transport.outbound_topic = topic;
        }
        if let Some(subscription) = lookup("BOOKING_INBOUND_SUBSCRIPTION") {
            self.transport.inbound_subscription = subscription;
        }
        if let Some(keyfile) = lookup("keyfile").filter(|k| !k.trim().is_empty()) {
            self.transport.credentials_file = Some(PathBuf::from(keyfile));
        }

        let durations: [(&'static str, &mut Duration); 3] = [
            ("BOOKING_REQUEST_TIMEOUT", &mut self.timeouts.default),
            ("BOOKING_WRITE_TIMEOUT", &mut self.timeouts.write),
            ("BOOKING_SWEEP_INTERVAL", &mut self.timeouts.sweep_interval),
        ];
        for (key, slot) in durations {
            if let Some(raw) = lookup(key) {
                *slot = humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::Env {
                    key,
                    reason: e.to_string(),
                })?;
            }
        }

        self.validate()?;
        Ok(self)
    }
}
