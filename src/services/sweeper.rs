//! Idle workspace sweeper.
//!
//! Workspaces live in memory only. A browser that goes away without sending
//! `DELETE` leaves its workspace behind; this task reclaims it once no
//! request has reached it for the configured idle timeout.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::state::AppState;

pub const DEFAULT_WORKSPACE_IDLE_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_WORKSPACE_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub idle_timeout: Duration,
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(DEFAULT_WORKSPACE_IDLE_TIMEOUT_SECS),
            interval: Duration::from_secs(DEFAULT_WORKSPACE_SWEEP_INTERVAL_SECS),
        }
    }
}

/// Spawn the background sweep task. Returns a handle for shutdown.
pub fn spawn_idle_sweeper(state: AppState, config: SweepConfig) -> JoinHandle<()> {
    info!(
        idle_timeout_secs = config.idle_timeout.as_secs(),
        interval_secs = config.interval.as_secs(),
        "workspace sweeper configured"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let removed = state.sweep_idle(config.idle_timeout).await;
            if removed > 0 {
                info!(removed, "sweeper: idle workspaces removed");
            }
        }
    })
}

#[cfg(test)]
#[path = "sweeper_test.rs"]
mod tests;
