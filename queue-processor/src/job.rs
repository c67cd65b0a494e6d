//! The two kinds of job and what they do to the store and the calendar.

use calsync_shared::{StatusKeys, CALENDAR_FIELD, EVENT_FIELD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::calendar::{remote_id, CalendarApi, CalendarEvent};
use crate::error::JobError;
use crate::logs::JobLog;
use crate::store::{Batch, Store};

/// What a queued key asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Create or update the remote event (`to-process`).
    Process,
    /// Remove the remote event and its record (`to-delete`).
    Delete,
}

impl Intent {
    /// The status set keys with this intent are queued in.
    pub fn intake<'a>(&self, keys: &'a StatusKeys) -> &'a str {
        match self {
            Intent::Process => &keys.to_process,
            Intent::Delete => &keys.to_delete,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Process => write!(f, "process"),
            Intent::Delete => write!(f, "delete"),
        }
    }
}

/// Value stored in the in-flight hash while a job owns a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InFlight {
    pub intent: Intent,
    pub claimed_at: DateTime<Utc>,
}

impl InFlight {
    pub fn now(intent: Intent) -> Self {
        Self {
            intent,
            claimed_at: Utc::now(),
        }
    }
}

/// A record as read back from its store hash.
struct StoredRecord {
    event: CalendarEvent,
    calendar: Option<String>,
}

impl StoredRecord {
    fn calendar_id(&self, key: &str) -> Result<&str, JobError> {
        self.calendar
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| JobError::MissingField {
                key: key.to_string(),
                field: CALENDAR_FIELD,
            })
    }
}

/// Everything a job needs, shared by all jobs of one processor.
pub struct JobContext {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) calendar: Arc<dyn CalendarApi>,
    pub(crate) keys: StatusKeys,
    pub(crate) log: JobLog,
}

impl JobContext {
    pub fn new(
        store: Arc<dyn Store>,
        calendar: Arc<dyn CalendarApi>,
        keys: StatusKeys,
        log: JobLog,
    ) -> Self {
        Self {
            store,
            calendar,
            keys,
            log,
        }
    }

    pub async fn run(&self, intent: Intent, key: &str) -> Result<(), JobError> {
        match intent {
            Intent::Process => self.process(key).await,
            Intent::Delete => self.delete(key).await,
        }
    }

    /// Push the stored event to the calendar and record the result.
    ///
    /// Events without a remote ID are created, the rest are updated. On
    /// success the remote copy replaces the stored `event` field and the key
    /// joins the processed set, in one atomic batch.
    pub async fn process(&self, key: &str) -> Result<(), JobError> {
        self.log.info(format!("Processing {}", key));

        let record = self.load(key).await?;
        let calendar_id = record.calendar_id(key)?.to_string();
        let existing_id = remote_id(&record.event).map(str::to_owned);

        let saved = match existing_id {
            None => self.calendar.create(&calendar_id, record.event).await,
            Some(event_id) => {
                self.calendar
                    .update(&calendar_id, &event_id, record.event)
                    .await
            }
        }
        .map_err(|source| JobError::RemoteApi {
            key: key.to_string(),
            source,
        })?;

        let json = serde_json::to_string(&saved).map_err(|source| JobError::Encode {
            key: key.to_string(),
            source,
        })?;

        let mut batch = Batch::new();
        batch
            .set_field(key, EVENT_FIELD, json)
            .add_member(&self.keys.processed, key)
            .remove_field(&self.keys.in_flight, key);
        self.write(key, batch).await?;

        self.log.info(format!("{} processed", key));
        Ok(())
    }

    /// Remove the event from the calendar, then drop its record.
    ///
    /// A record that never received a remote ID was never synced, so there
    /// is nothing to remove remotely. The record itself is left in place.
    pub async fn delete(&self, key: &str) -> Result<(), JobError> {
        self.log.info(format!("Deleting {}", key));

        let record = self.load(key).await?;

        let Some(event_id) = remote_id(&record.event) else {
            self.log
                .warn(format!("Event {} not found in calendar, keeping record", key));
            let mut batch = Batch::new();
            batch.remove_field(&self.keys.in_flight, key);
            return self.write(key, batch).await;
        };

        let calendar_id = record.calendar_id(key)?;
        self.calendar
            .delete(calendar_id, event_id)
            .await
            .map_err(|source| JobError::RemoteApi {
                key: key.to_string(),
                source,
            })?;

        let mut batch = Batch::new();
        batch.delete(key).remove_field(&self.keys.in_flight, key);
        self.write(key, batch).await?;

        self.log.info(format!("{} deleted", key));
        Ok(())
    }

    /// Move `key` to the failed set and release its in-flight marker.
    pub async fn mark_failed(&self, key: &str) {
        let mut batch = Batch::new();
        batch
            .add_member(&self.keys.failed, key)
            .remove_field(&self.keys.in_flight, key);

        if let Err(e) = self.store.apply(batch).await {
            self.log
                .error(format!("Failed to mark {} as failed: {:#}", key, e));
        }
    }

    async fn load(&self, key: &str) -> Result<StoredRecord, JobError> {
        let mut fields = self
            .store
            .get_all(key)
            .await
            .map_err(|source| JobError::StoreRead {
                key: key.to_string(),
                source,
            })?;

        let raw = fields.remove(EVENT_FIELD).ok_or_else(|| JobError::MissingField {
            key: key.to_string(),
            field: EVENT_FIELD,
        })?;

        let event = serde_json::from_str(&raw).map_err(|source| JobError::Decode {
            key: key.to_string(),
            source,
        })?;

        Ok(StoredRecord {
            event,
            calendar: fields.remove(CALENDAR_FIELD),
        })
    }

    async fn write(&self, key: &str, batch: Batch) -> Result<(), JobError> {
        self.store
            .apply(batch)
            .await
            .map_err(|source| JobError::StoreWrite {
                key: key.to_string(),
                source,
            })
    }
}
