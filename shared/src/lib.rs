//! Key codec and record model shared by the calendar sync processor and the
//! producers that feed it.

pub mod event;
pub mod key;

pub use event::{Event, EventList, CALENDAR_FIELD, EVENT_FIELD};
pub use key::{Key, KeyError, KeyList, StatusKeys, DEFAULT_NAMESPACE, DELIMITER};
