//! The polling loop and the supervisor that bounds every job in time.

use calsync_shared::StatusKeys;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::calendar::CalendarApi;
use crate::config::ProcessorConfig;
use crate::error::JobError;
use crate::job::{InFlight, Intent, JobContext};
use crate::logs::JobLog;
use crate::store::Store;

pub struct Processor {
    ctx: Arc<JobContext>,
    config: ProcessorConfig,
    permits: Arc<Semaphore>,
    /// Tick counter; its parity picks which queue gets the first free permit.
    turn: AtomicUsize,
}

impl Processor {
    pub fn new(
        store: Arc<dyn Store>,
        calendar: Arc<dyn CalendarApi>,
        log: JobLog,
        config: ProcessorConfig,
    ) -> Self {
        let keys = StatusKeys::for_namespace(&config.namespace);
        Self {
            ctx: Arc::new(JobContext::new(store, calendar, keys, log)),
            permits: Arc::new(Semaphore::new(config.max_in_flight)),
            turn: AtomicUsize::new(0),
            config,
        }
    }

    pub fn status_keys(&self) -> &StatusKeys {
        &self.ctx.keys
    }

    /// Poll the intake sets forever.
    ///
    /// Jobs are never awaited here; a slow job only holds its own permit.
    pub async fn run(&self) {
        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Processor started (interval: {:?}, timeout: {:?}, max in flight: {})",
            self.config.poll_interval,
            self.config.job_timeout,
            self.config.max_in_flight
        );

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One polling iteration: claim at most one `to-process` key and one
    /// `to-delete` key and dispatch a job for each.
    ///
    /// The queue polled first alternates between ticks, so a saturated pool
    /// hands its free permits to both queues in turn.
    ///
    /// Returns the supervisor handles of the dispatched jobs.
    pub async fn tick(&self) -> Vec<JoinHandle<()>> {
        let order = if self.turn.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
            [Intent::Process, Intent::Delete]
        } else {
            [Intent::Delete, Intent::Process]
        };
        let mut dispatched = Vec::new();

        for intent in order {
            // Take the permit before popping so a key is never claimed
            // without capacity to run it.
            let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
                tracing::debug!("At capacity, not claiming from {} queue", intent);
                continue;
            };

            match self.claim(intent).await {
                Ok(Some(key)) => dispatched.push(self.dispatch(intent, key, permit)),
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to poll {} queue: {:#}", intent, e),
            }
        }

        dispatched
    }

    async fn claim(&self, intent: Intent) -> anyhow::Result<Option<String>> {
        let marker = serde_json::to_string(&InFlight::now(intent))?;
        let keys = &self.ctx.keys;
        self.ctx
            .store
            .claim(intent.intake(keys), &keys.in_flight, &marker)
            .await
    }

    /// Run a job under the deadline and route any failure to the failed set.
    ///
    /// Expiry drops the job's future, so a timed-out job makes no further
    /// calls against the store or the calendar.
    fn dispatch(
        &self,
        intent: Intent,
        key: String,
        permit: OwnedSemaphorePermit,
    ) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let deadline = self.config.job_timeout;

        tokio::spawn(async move {
            let _permit = permit;

            let result = match time::timeout(deadline, ctx.run(intent, &key)).await {
                Ok(result) => result,
                Err(_) => Err(JobError::Timeout {
                    key: key.clone(),
                    after: deadline,
                }),
            };

            if let Err(err) = result {
                ctx.log.error(format!(
                    "{} of {} failed at {}: {}",
                    intent,
                    err.key(),
                    err.stage(),
                    err
                ));
                ctx.mark_failed(&key).await;
            }
        })
    }
}
