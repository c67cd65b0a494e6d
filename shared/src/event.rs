//! Calendar records bound to the system they came from.

use serde::{Deserialize, Serialize};

use crate::key::{Key, KeyList, DEFAULT_NAMESPACE};

/// Hash field holding the serialized calendar payload.
pub const EVENT_FIELD: &str = "event";

/// Hash field holding the target calendar ID.
pub const CALENDAR_FIELD: &str = "calendar";

/// A calendar record and the source it was exported from.
///
/// The payload `P` is whatever the remote calendar API exchanges; this crate
/// only needs it to be serializable. Field names match the JSON producers
/// already write into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<P> {
    #[serde(rename = "Source")]
    pub source: String,

    #[serde(rename = "SourceID")]
    pub source_id: i64,

    #[serde(rename = "CalendarEvent")]
    pub calendar_event: P,

    #[serde(rename = "Calendar")]
    pub calendar: String,
}

impl<P> Event<P> {
    /// Identity key of the record in the default namespace:
    /// `event:id:<source>/<source_id>`.
    pub fn to_key(&self) -> Key {
        self.to_key_in(DEFAULT_NAMESPACE)
    }

    /// Identity key of the record under `namespace`.
    pub fn to_key_in(&self, namespace: &str) -> Key {
        Key::with_namespace(
            namespace,
            "event",
            "id",
            format!("{}/{}", self.source, self.source_id),
        )
    }
}

impl<P: Serialize> Event<P> {
    /// Fields of the store hash for this record.
    pub fn to_hash_fields(&self) -> serde_json::Result<Vec<(String, String)>> {
        Ok(vec![
            (
                EVENT_FIELD.to_string(),
                serde_json::to_string(&self.calendar_event)?,
            ),
            (CALENDAR_FIELD.to_string(), self.calendar.clone()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventList<P>(pub Vec<Event<P>>);

impl<P> EventList<P> {
    pub fn keys(&self) -> KeyList {
        self.keys_in(DEFAULT_NAMESPACE)
    }

    pub fn keys_in(&self, namespace: &str) -> KeyList {
        self.0.iter().map(|event| event.to_key_in(namespace)).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event<P>> {
        self.0.iter()
    }
}

impl<P: Clone> EventList<P> {
    /// Events whose key is in `keys`, in this list's order.
    ///
    /// Each key is matched against the event's key in that key's own
    /// namespace.
    pub fn filter_by_keys(&self, keys: &KeyList) -> EventList<P> {
        self.select(|event| listed(event, keys))
    }

    /// Events whose key is not in `keys`, in this list's order.
    pub fn exclude_keys(&self, keys: &KeyList) -> EventList<P> {
        self.select(|event| !listed(event, keys))
    }

    fn select(&self, keep: impl Fn(&Event<P>) -> bool) -> EventList<P> {
        self.0.iter().filter(|event| keep(event)).cloned().collect()
    }
}

fn listed<P>(event: &Event<P>, keys: &KeyList) -> bool {
    keys.iter().any(|key| event.to_key_in(key.namespace()) == *key)
}

impl<P: Serialize> EventList<P> {
    /// Alternating key strings and JSON-encoded events, ready for a bulk set.
    ///
    /// One event failing to serialize fails the whole conversion.
    pub fn to_key_values(&self) -> serde_json::Result<Vec<String>> {
        self.to_key_values_in(DEFAULT_NAMESPACE)
    }

    pub fn to_key_values_in(&self, namespace: &str) -> serde_json::Result<Vec<String>> {
        let mut pairs = Vec::with_capacity(self.0.len() * 2);
        for event in &self.0 {
            pairs.push(event.to_key_in(namespace).to_string());
            pairs.push(serde_json::to_string(event)?);
        }
        Ok(pairs)
    }
}

impl<P> FromIterator<Event<P>> for EventList<P> {
    fn from_iter<I: IntoIterator<Item = Event<P>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<P> From<Vec<Event<P>>> for EventList<P> {
    fn from(events: Vec<Event<P>>) -> Self {
        Self(events)
    }
}
