//! Daemon configuration – reads `~/.armada/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Persisted daemon configuration.  Every field has a default so an
/// empty (or absent) file yields a runnable relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// TCP endpoint of the radio modem daemon (`host:port`).  Empty
    /// means no modem: the radio side runs in simulation mode from the
    /// start (the reconnect supervisor still runs, harmlessly).
    #[serde(default)]
    pub modem_addr: String,

    /// WebSocket port for web clients.
    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,

    /// Silence threshold before a vehicle is evicted from the registry.
    #[serde(default = "default_liveness_timeout_secs")]
    pub liveness_timeout_secs: u64,

    /// Cadence of the liveness sweep.  Independent of the threshold.
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,

    /// Cadence of the fleet-location broadcast to clients.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,

    /// Cadence of the telemetry poll sent to every known vehicle.
    #[serde(default = "default_data_request_interval_secs")]
    pub data_request_interval_secs: u64,

    /// Bound on a calibration round trip before the client gets an
    /// explicit error.
    #[serde(default = "default_calibration_timeout_secs")]
    pub calibration_timeout_secs: u64,

    /// Retry cadence for reopening the radio link.
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,

    /// Capacity of the inbound and outbound frame queues.  When a queue
    /// is full the newest message is dropped with a warning.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_gateway_port() -> u16 {
    3336
}
fn default_liveness_timeout_secs() -> u64 {
    30
}
fn default_reap_interval_secs() -> u64 {
    6
}
fn default_broadcast_interval_ms() -> u64 {
    1000
}
fn default_data_request_interval_secs() -> u64 {
    10
}
fn default_calibration_timeout_secs() -> u64 {
    5
}
fn default_reconnect_interval_secs() -> u64 {
    5
}
fn default_queue_capacity() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modem_addr: String::new(),
            gateway_port: default_gateway_port(),
            liveness_timeout_secs: default_liveness_timeout_secs(),
            reap_interval_secs: default_reap_interval_secs(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
            data_request_interval_secs: default_data_request_interval_secs(),
            calibration_timeout_secs: default_calibration_timeout_secs(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Config {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    pub fn data_request_interval(&self) -> Duration {
        Duration::from_secs(self.data_request_interval_secs)
    }

    pub fn calibration_timeout(&self) -> Duration {
        Duration::from_secs(self.calibration_timeout_secs)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }
}

/// Return the path to `~/.armada/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".armada").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Config file + env overrides, falling back to defaults (still with env
/// overrides) when the file is absent or broken.
pub fn load_or_default() -> Config {
    match load() {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            warn!(error = %e, "config unreadable, using defaults");
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

/// Apply `ARMADA_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `ARMADA_MODEM_ADDR` | `modem_addr` |
/// | `ARMADA_GATEWAY_PORT` | `gateway_port` |
/// | `ARMADA_LIVENESS_TIMEOUT_SECS` | `liveness_timeout_secs` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ARMADA_MODEM_ADDR") {
        cfg.modem_addr = v;
    }
    if let Ok(v) = std::env::var("ARMADA_GATEWAY_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.gateway_port = port;
    }
    if let Ok(v) = std::env::var("ARMADA_LIVENESS_TIMEOUT_SECS")
        && let Ok(secs) = v.parse::<u64>()
    {
        cfg.liveness_timeout_secs = secs;
    }
}
