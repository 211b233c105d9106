//! Periodic hard-deletion of reset part instances past the retention
//! horizon.

use std::time::Duration;

use onair_playout::PlayoutEngine;
use tokio_util::sync::CancellationToken;

/// Default retention for reset instances: 50 days.
const DEFAULT_RETENTION_DAYS: i64 = 50;

/// Default pause between cleanup passes: 1 hour.
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupConfig {
    pub retention: chrono::Duration,
    pub interval: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            retention: chrono::Duration::days(DEFAULT_RETENTION_DAYS),
            interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

impl CleanupConfig {
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `INSTANCE_RETENTION_DAYS` | `50`    |
    /// | `CLEANUP_INTERVAL_SECS`   | `3600`  |
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let retention_days: i64 = std::env::var("INSTANCE_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETENTION_DAYS);
        let interval_secs: u64 = std::env::var("CLEANUP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CLEANUP_INTERVAL_SECS);

        Self {
            retention: chrono::Duration::days(retention_days),
            interval: Duration::from_secs(interval_secs),
        }
    }
}

/// Run the cleanup loop until `cancel` is triggered.
///
/// `engine` must be a clone of the engine serving requests: playlist locks
/// live in it, and cleanup relies on them to stay out of playout jobs.
///
/// The first pass runs immediately. A failed pass is logged and retried on
/// the next tick.
pub async fn run(engine: PlayoutEngine, config: CleanupConfig, cancel: CancellationToken) {
    tracing::info!(
        retention_days = config.retention.num_days(),
        interval_secs = config.interval.as_secs(),
        "Instance cleanup job started"
    );

    let mut interval = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Instance cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match engine.cleanup_reset_instances(config.retention).await {
                    Ok(report) => {
                        tracing::debug!(
                            playlists = report.playlists,
                            part_instances = report.part_instances,
                            "Instance cleanup pass finished"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, code = e.code(), "Instance cleanup failed");
                    }
                }
            }
        }
    }
}
