//! Client configuration with defaulted, validated fields.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Connection, database, and buffering configuration for a
/// [`Client`](crate::Client).
///
/// Every field has a default, so `Config::default()` targets a stock local
/// server. The default literals are part of the public contract. A `Config`
/// can also be deserialized from a file; durations accept human-readable
/// values such as `"1s"` or `"500ms"`.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use influxdb1_client::{Config, RetentionPolicy};
///
/// let config = Config::default()
///     .with_database("metrics")
///     .with_retention_policy(RetentionPolicy::new("one_day").with_duration("1d"))
///     .with_max_buffer_size(500)
///     .with_max_buffer_time(Duration::from_millis(250));
/// # drop(config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host name or address of the server. Default: `127.0.0.1`.
    pub host: String,
    /// HTTP API port of the server. Default: `8086`.
    pub port: u16,
    /// Database that writes and data queries are scoped to. Default: `test`.
    pub database: String,
    /// Retention policy that writes target, and that
    /// [`Client::initialize`](crate::Client::initialize) provisions.
    /// Default: `autogen` with no attributes.
    pub retention_policy: RetentionPolicy,
    /// Number of buffered points above which a flush triggers immediately.
    /// Exactly this many points stay buffered; the next write flushes them
    /// all. Default: `100`.
    pub max_buffer_size: usize,
    /// Longest a buffered point may wait before a timed flush.
    /// Default: 1000 ms.
    #[serde(with = "humantime_serde")]
    pub max_buffer_time: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
            database: "test".to_string(),
            retention_policy: RetentionPolicy::default(),
            max_buffer_size: 100,
            max_buffer_time: Duration::from_millis(1000),
        }
    }
}

impl Config {
    /// Set the server host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the target database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the target retention policy.
    pub fn with_retention_policy(mut self, retention_policy: RetentionPolicy) -> Self {
        self.retention_policy = retention_policy;
        self
    }

    /// Set the buffer size threshold.
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    /// Set the buffer time threshold.
    pub fn with_max_buffer_time(mut self, max_buffer_time: Duration) -> Self {
        self.max_buffer_time = max_buffer_time;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.database.is_empty() {
            return Err(Error::Config("database must not be empty".to_string()));
        }
        if self.retention_policy.name.is_empty() {
            return Err(Error::Config(
                "retention policy name must not be empty".to_string(),
            ));
        }
        if self.max_buffer_size == 0 {
            return Err(Error::Config(
                "max_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.max_buffer_time.is_zero() {
            return Err(Error::Config(
                "max_buffer_time must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A named retention policy and the attributes used to provision it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Policy name. Default: `autogen`.
    pub name: String,
    /// Retention duration, e.g. `1d` or `4w`. Only a policy with a duration
    /// is created by [`Client::initialize`](crate::Client::initialize);
    /// without one the name is assumed to already exist on the server.
    pub duration: Option<String>,
    /// Replication factor. Default: `1`.
    pub replication: u16,
    /// Optional shard group duration, e.g. `1h`.
    pub shard_duration: Option<String>,
    /// Whether the policy becomes the database default.
    pub default: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            name: "autogen".to_string(),
            duration: None,
            replication: 1,
            shard_duration: None,
            default: false,
        }
    }
}

impl RetentionPolicy {
    /// A policy with the given name and default attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the retention duration.
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Set the replication factor.
    pub fn with_replication(mut self, replication: u16) -> Self {
        self.replication = replication;
        self
    }

    /// Set the shard group duration.
    pub fn with_shard_duration(mut self, shard_duration: impl Into<String>) -> Self {
        self.shard_duration = Some(shard_duration.into());
        self
    }

    /// Make the policy the database default.
    pub fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_literals() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8086);
        assert_eq!(config.database, "test");
        assert_eq!(config.retention_policy.name, "autogen");
        assert_eq!(config.max_buffer_size, 100);
        assert_eq!(config.max_buffer_time, Duration::from_millis(1000));
        config.validate().unwrap();
    }

    #[test]
    fn rejects_degenerate_thresholds() {
        let err = Config::default().with_max_buffer_size(0).validate();
        assert!(matches!(err, Err(Error::Config(_))));

        let err = Config::default()
            .with_max_buffer_time(Duration::ZERO)
            .validate();
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn rejects_empty_names() {
        assert!(Config::default().with_host("").validate().is_err());
        assert!(Config::default().with_database("").validate().is_err());
        assert!(
            Config::default()
                .with_retention_policy(RetentionPolicy::new(""))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn loads_from_file_form_with_humantime_durations() {
        let config: Config = serde_json::from_str(
            r#"{
                "database": "metrics",
                "retention_policy": {"name": "one_day", "duration": "1d"},
                "max_buffer_time": "250ms"
            }"#,
        )
        .unwrap();
        assert_eq!(config.database, "metrics");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.retention_policy.duration.as_deref(), Some("1d"));
        assert_eq!(config.max_buffer_time, Duration::from_millis(250));
    }
}
