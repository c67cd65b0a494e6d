//! In-process test doubles for the store and the calendar.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use crate::calendar::{CalendarApi, CalendarEvent};
use crate::store::{Batch, Op, Store};

#[derive(Default)]
struct State {
    sets: HashMap<String, BTreeSet<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    fail_reads: bool,
    fail_writes: bool,
}

/// [`Store`] kept in memory. Batches are applied under one lock, so they are
/// as atomic as a Redis transaction.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn set_hash(&self, key: &str, fields: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        let hash = state.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.to_string(), value.to_string());
        }
    }

    pub fn add(&self, set: &str, member: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
    }

    pub fn hash(&self, key: &str) -> Option<HashMap<String, String>> {
        self.state.lock().unwrap().hashes.get(key).cloned()
    }

    pub fn has_field(&self, key: &str, field: &str) -> bool {
        self.hash(key).is_some_and(|h| h.contains_key(field))
    }

    pub fn members(&self, set: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .sets
            .get(set)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, set: &str, member: &str) -> bool {
        self.members(set).iter().any(|m| m == member)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn claim(&self, set: &str, in_flight: &str, marker: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            bail!("store unavailable");
        }

        let Some(member) = state.sets.get_mut(set).and_then(|s| s.pop_first()) else {
            return Ok(None);
        };

        let busy = state
            .hashes
            .get(in_flight)
            .is_some_and(|markers| markers.contains_key(&member));
        if busy {
            state.sets.entry(set.to_string()).or_default().insert(member);
            return Ok(None);
        }
        state
            .hashes
            .entry(in_flight.to_string())
            .or_default()
            .insert(member.clone(), marker.to_string());

        Ok(Some(member))
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            bail!("store unavailable");
        }
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn apply(&self, batch: Batch) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            bail!("store unavailable");
        }

        for op in batch.ops() {
            match op {
                Op::SetField { key, field, value } => {
                    state
                        .hashes
                        .entry(key.clone())
                        .or_default()
                        .insert(field.clone(), value.clone());
                }
                Op::RemoveField { key, field } => {
                    if let Some(hash) = state.hashes.get_mut(key) {
                        hash.remove(field);
                        if hash.is_empty() {
                            state.hashes.remove(key);
                        }
                    }
                }
                Op::AddMember { set, member } => {
                    state
                        .sets
                        .entry(set.clone())
                        .or_default()
                        .insert(member.clone());
                }
                Op::Delete { key } => {
                    state.hashes.remove(key);
                    state.sets.remove(key);
                }
            }
        }

        Ok(())
    }
}

/// A remote call the fake calendar received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create {
        calendar_id: String,
    },
    Update {
        calendar_id: String,
        event_id: String,
    },
    Delete {
        calendar_id: String,
        event_id: String,
    },
}

/// Scripted [`CalendarApi`] that records every call.
pub struct FakeCalendar {
    assigned_id: String,
    fail: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl FakeCalendar {
    /// Succeeds, giving created events `id`.
    pub fn assigning(id: &str) -> Self {
        Self {
            assigned_id: id.to_string(),
            fail: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Rejects every call.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::assigning("")
        }
    }

    /// Sleeps for `delay` before answering each call.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, call: Call) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(call);
        if self.fail {
            bail!("calendar API returned 500");
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarApi for FakeCalendar {
    async fn create(&self, calendar_id: &str, mut event: CalendarEvent) -> Result<CalendarEvent> {
        self.answer(Call::Create {
            calendar_id: calendar_id.to_string(),
        })
        .await?;
        event.id = Some(self.assigned_id.clone());
        Ok(event)
    }

    async fn update(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: CalendarEvent,
    ) -> Result<CalendarEvent> {
        self.answer(Call::Update {
            calendar_id: calendar_id.to_string(),
            event_id: event_id.to_string(),
        })
        .await?;
        Ok(event)
    }

    async fn delete(&self, calendar_id: &str, event_id: &str) -> Result<()> {
        self.answer(Call::Delete {
            calendar_id: calendar_id.to_string(),
            event_id: event_id.to_string(),
        })
        .await
    }
}
