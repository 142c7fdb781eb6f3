//! Roster refresh.
//!
//! `SyncEngine` re-fetches every roster member from the stats provider,
//! tolerating per-player failures; `RefreshScheduler` drives a full
//! refresh-and-publish pass on a fixed interval in the background.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::commands::CommandHandlers;
use crate::models::PlayerRecord;
use crate::provider::StatsProvider;

/// Outcome of one bulk refresh.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Freshly fetched records, in roster order.
    pub updated: Vec<PlayerRecord>,
    /// Codes that could not be refreshed this pass.
    pub failed: Vec<String>,
}

/// Bookkeeping about the most recent refresh pass.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub last_refresh_started: Option<DateTime<Utc>>,
    pub last_refresh_completed: Option<DateTime<Utc>>,
    pub last_updated_count: usize,
    pub last_failed_codes: Vec<String>,
}

/// Re-resolves current stats for a roster.
pub struct SyncEngine {
    provider: Arc<dyn StatsProvider>,
}

impl SyncEngine {
    pub fn new(provider: Arc<dyn StatsProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn StatsProvider {
        self.provider.as_ref()
    }

    /// Fetch fresh stats for every entry.
    ///
    /// A player that fails to resolve (unknown, unranked, or a transport
    /// error) lands in `failed` and never aborts the batch. The caller
    /// decides what an empty `updated` means.
    pub async fn sync_all(&self, entries: &[PlayerRecord]) -> SyncReport {
        let mut report = SyncReport::default();

        for entry in entries {
            match self.provider.fetch_player(&entry.code).await {
                Ok(Some(stats)) => report.updated.push(stats.into_record(&entry.code)),
                Ok(None) => {
                    warn!("Player {} has no ranked data anymore", entry.code);
                    report.failed.push(entry.code.clone());
                }
                Err(e) => {
                    warn!("Error refreshing {}: {e}", entry.code);
                    report.failed.push(entry.code.clone());
                }
            }
        }

        info!(
            "Refreshed {} players ({} failed)",
            report.updated.len(),
            report.failed.len()
        );
        report
    }
}

struct RunningTask {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Recurring background refresh.
///
/// `start` is idempotent and `stop` lets an in-flight tick finish before the
/// task exits, so a publish is never torn in half by shutdown.
pub struct RefreshScheduler {
    tick_interval: Duration,
    running: std::sync::Mutex<Option<RunningTask>>,
}

impl RefreshScheduler {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            running: std::sync::Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().unwrap().is_some()
    }

    /// Spawn the refresh loop. Returns false if it was already running.
    pub fn start(&self, handlers: Arc<CommandHandlers>) -> bool {
        let mut running = self.running.lock().unwrap();
        if running.is_some() {
            return false;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let tick_interval = self.tick_interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(tick_interval);
            // The first tick fires immediately; consume it so the initial
            // refresh waits a full period after startup.
            ticker.tick().await;

            info!("Auto-update loop started (every {:?})", tick_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                // Run the tick to completion outside the select so a stop
                // request cannot cancel it mid-publish.
                if let Err(e) = handlers.refresh_and_publish().await {
                    error!("Scheduled refresh failed: {e}");
                }

                if *shutdown_rx.borrow() {
                    break;
                }
            }
            info!("Auto-update loop stopped");
        });

        *running = Some(RunningTask { shutdown, task });
        true
    }

    /// Signal the loop to stop and wait for it to finish.
    pub async fn stop(&self) {
        let running = self.running.lock().unwrap().take();
        if let Some(running) = running {
            let _ = running.shutdown.send(true);
            let _ = running.task.await;
        }
    }
}
