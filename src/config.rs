//! Tunables for the controller and the daemon binary.

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the persisted preferences.
pub const DEFAULT_STORE_PATH: &str = "/var/lib/wlconnect/store.json";

/// How long the iwd driver waits for a `Network.Connect` call.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Timing and sizing knobs for [`crate::backend::Controller`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Delay between a completed scan and the next one.
    pub scan_interval: Duration,
    /// Period of the current-network poll.
    pub refresh_interval: Duration,
    /// Upper bound on raw records pulled from the driver per scan.
    pub max_scan_results: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(15),
            refresh_interval: Duration::from_secs(2),
            max_scan_results: 100,
        }
    }
}

/// Settings of the `wlconnect` binary, read from the environment.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub store_path: PathBuf,
    pub controller: ControllerConfig,
}

impl DaemonConfig {
    /// Reads `WLCONNECT_STORE`, `WLCONNECT_SCAN_SECS` and
    /// `WLCONNECT_REFRESH_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ControllerConfig::default();
        let store_path = lookup("WLCONNECT_STORE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
        let scan_interval = seconds(&lookup, "WLCONNECT_SCAN_SECS").unwrap_or(defaults.scan_interval);
        let refresh_interval =
            seconds(&lookup, "WLCONNECT_REFRESH_SECS").unwrap_or(defaults.refresh_interval);

        Self {
            store_path,
            controller: ControllerConfig {
                scan_interval,
                refresh_interval,
                ..defaults
            },
        }
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            tracing::warn!("Ignoring {}={:?}, expected a positive number of seconds", key, raw);
            None
        }
    }
}
