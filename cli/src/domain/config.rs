//! Domain types and validators for clonekeeper configuration.
//!
//! Pure functions only, with no I/O.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.clonekeeper/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Platform endpoint.
    pub platform: PlatformConfig,
    /// Where clones come from and where they are placed.
    pub placement: PlacementConfig,
    /// Tag categories and names used as lifecycle metadata.
    pub tagging: TaggingConfig,
    /// How long a clone lives before the reaper may destroy it.
    pub retention: RetentionConfig,
    /// Task polling behaviour.
    pub tasks: TaskConfig,
}

/// Platform endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlatformConfig {
    /// vCenter host name or address.
    pub host: String,
    /// HTTPS port.
    pub port: u16,
    /// Accept self-signed certificates.
    pub insecure: bool,
    /// VI/JSON API release segment, e.g. `8.0.1.0`.
    pub api_release: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            host: "192.168.2.58".to_string(),
            port: 443,
            insecure: true,
            api_release: "8.0.1.0".to_string(),
        }
    }
}

/// Names of the inventory objects involved in creating a clone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlacementConfig {
    /// Golden template (or VM) the clones are made from.
    pub source: String,
    /// Host used when a template has to be converted to a VM.
    pub host: String,
    /// Datastore for the clone's child disks.
    pub datastore: String,
    /// Cluster whose resource pool hosts the clone.
    pub cluster: String,
    /// Destination folder; the root folder is used when it does not exist.
    pub folder: String,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            source: "temp1".to_string(),
            host: "192.168.2.60".to_string(),
            datastore: "datastore1".to_string(),
            cluster: "home".to_string(),
            folder: "vm".to_string(),
        }
    }
}

/// Tag categories and names that encode clone lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaggingConfig {
    pub timestamp_category: String,
    pub clone_category: String,
    /// Tag in `clone_category` that marks a VM as a managed clone.
    pub clone_tag: String,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            timestamp_category: "Timestamp".to_string(),
            clone_category: "Clone".to_string(),
            clone_tag: "LinkedClone".to_string(),
        }
    }
}

/// Retention window for clones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetentionConfig {
    pub minutes: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { minutes: 5 }
    }
}

impl RetentionConfig {
    #[must_use]
    pub fn threshold(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.minutes)
    }
}

/// Backoff and deadline for waiting on platform tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaskConfig {
    pub poll_initial_ms: u64,
    pub poll_max_ms: u64,
    pub timeout_secs: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            poll_initial_ms: 250,
            poll_max_ms: 5_000,
            timeout_secs: 1_800,
        }
    }
}

impl TaskConfig {
    #[must_use]
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.poll_initial_ms)
    }

    #[must_use]
    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.poll_max_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a loaded configuration.
///
/// # Errors
///
/// Returns an error naming the first invalid setting.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let names: [(&'static str, &str); 9] = [
        ("platform.host", &config.platform.host),
        ("placement.source", &config.placement.source),
        ("placement.host", &config.placement.host),
        ("placement.datastore", &config.placement.datastore),
        ("placement.cluster", &config.placement.cluster),
        ("placement.folder", &config.placement.folder),
        ("tagging.timestamp_category", &config.tagging.timestamp_category),
        ("tagging.clone_category", &config.tagging.clone_category),
        ("tagging.clone_tag", &config.tagging.clone_tag),
    ];
    for (key, value) in names {
        if value.trim().is_empty() {
            return Err(invalid(key, "must not be empty"));
        }
    }
    if config.tagging.timestamp_category == config.tagging.clone_category {
        return Err(invalid(
            "tagging.clone_category",
            "must differ from tagging.timestamp_category",
        ));
    }
    if clonekeeper_common::timestamp::is_timestamp_tag(&config.tagging.clone_tag) {
        return Err(invalid(
            "tagging.clone_tag",
            "must not start with the timestamp prefix",
        ));
    }
    if config.retention.minutes <= 0 {
        return Err(invalid("retention.minutes", "must be greater than zero"));
    }
    if config.tasks.poll_initial_ms == 0 {
        return Err(invalid("tasks.poll_initial_ms", "must be greater than zero"));
    }
    if config.tasks.poll_max_ms < config.tasks.poll_initial_ms {
        return Err(invalid(
            "tasks.poll_max_ms",
            "must not be smaller than tasks.poll_initial_ms",
        ));
    }
    if config.tasks.timeout_secs == 0 {
        return Err(invalid("tasks.timeout_secs", "must be greater than zero"));
    }
    Ok(())
}

fn invalid(key: &'static str, reason: &str) -> anyhow::Error {
    ConfigError::InvalidValue {
        key,
        reason: reason.to_string(),
    }
    .into()
}

// ── Unit tests ───────────────────────────────────────────────────────────────
