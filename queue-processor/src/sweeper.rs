//! Recovery of keys whose job never finished.
//!
//! A key stays in the in-flight hash only while a job owns it. If the process
//! dies mid-job the marker outlives it; once it is older than any live job
//! could be, the sweeper puts the key back on the queue it came from.

use anyhow::{Context, Result};
use calsync_shared::StatusKeys;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

use crate::config::ProcessorConfig;
use crate::job::InFlight;
use crate::store::{Batch, Store};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale keys put back on their intake queue.
    pub requeued: usize,
    /// Keys whose marker could not be read, moved to the failed set.
    pub failed: usize,
}

pub struct Sweeper {
    store: Arc<dyn Store>,
    keys: StatusKeys,
    interval: Duration,
    stale_after: Duration,
}

impl Sweeper {
    pub fn new(store: Arc<dyn Store>, keys: StatusKeys, config: &ProcessorConfig) -> Self {
        Self {
            store,
            keys,
            interval: config.sweep_interval,
            stale_after: config.stale_after,
        }
    }

    /// Sweep immediately, then once per interval, forever.
    pub async fn run(&self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Sweeper started (interval: {:?}, stale after: {:?})",
            self.interval,
            self.stale_after
        );

        loop {
            ticker.tick().await;

            match self.sweep().await {
                Ok(report) if report.requeued + report.failed > 0 => tracing::warn!(
                    "Recovered {} stale in-flight keys ({} unreadable markers)",
                    report.requeued,
                    report.failed
                ),
                Ok(_) => tracing::debug!("No stale in-flight keys"),
                Err(e) => tracing::error!("In-flight sweep failed: {:#}", e),
            }
        }
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let markers = self
            .store
            .get_all(&self.keys.in_flight)
            .await
            .context("Failed to read in-flight markers")?;

        let stale_after =
            chrono::Duration::from_std(self.stale_after).context("Stale threshold out of range")?;

        let mut report = SweepReport::default();
        let mut batch = Batch::new();

        for (key, raw) in &markers {
            match serde_json::from_str::<InFlight>(raw) {
                Ok(marker) if now - marker.claimed_at < stale_after => {}
                Ok(marker) => {
                    tracing::warn!(
                        "Requeueing {} (claimed for {} at {})",
                        key,
                        marker.intent,
                        marker.claimed_at
                    );
                    batch
                        .remove_field(&self.keys.in_flight, key)
                        .add_member(marker.intent.intake(&self.keys), key);
                    report.requeued += 1;
                }
                Err(e) => {
                    tracing::warn!("Unreadable in-flight marker for {}: {}", key, e);
                    batch
                        .remove_field(&self.keys.in_flight, key)
                        .add_member(&self.keys.failed, key);
                    report.failed += 1;
                }
            }
        }

        if !batch.is_empty() {
            self.store
                .apply(batch)
                .await
                .context("Failed to requeue stale in-flight keys")?;
        }

        Ok(report)
    }
}
