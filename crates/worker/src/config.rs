use std::time::Duration;

use jobroute_pipeline::RoutingConfig;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause between recurring-task scans.
    pub recurrence_interval: Duration,
    /// Pause between assignment syncs.
    pub sync_interval: Duration,
    /// How far back each sync looks for newly created entities. Longer
    /// than the interval so a missed run is caught up by the next one.
    pub sync_lookback: chrono::Duration,
    pub routing: RoutingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            recurrence_interval: Duration::from_secs(3600),
            sync_interval: Duration::from_secs(3600),
            sync_lookback: chrono::Duration::hours(48),
            routing: RoutingConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `RECURRENCE_INTERVAL_SECS` | `3600`  |
    /// | `SYNC_INTERVAL_SECS`       | `3600`  |
    /// | `SYNC_LOOKBACK_HOURS`      | `48`    |
    ///
    /// Routing variables are documented on [`RoutingConfig::from_env`].
    pub fn from_env() -> Self {
        let recurrence_interval_secs: u64 = std::env::var("RECURRENCE_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("RECURRENCE_INTERVAL_SECS must be a valid u64");

        let sync_interval_secs: u64 = std::env::var("SYNC_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("SYNC_INTERVAL_SECS must be a valid u64");

        let sync_lookback_hours: i64 = std::env::var("SYNC_LOOKBACK_HOURS")
            .unwrap_or_else(|_| "48".into())
            .parse()
            .expect("SYNC_LOOKBACK_HOURS must be a valid i64");

        assert!(recurrence_interval_secs > 0, "RECURRENCE_INTERVAL_SECS must be positive");
        assert!(sync_interval_secs > 0, "SYNC_INTERVAL_SECS must be positive");
        assert!(sync_lookback_hours > 0, "SYNC_LOOKBACK_HOURS must be positive");

        Self {
            recurrence_interval: Duration::from_secs(recurrence_interval_secs),
            sync_interval: Duration::from_secs(sync_interval_secs),
            sync_lookback: chrono::Duration::hours(sync_lookback_hours),
            routing: RoutingConfig::from_env(),
        }
    }
}
