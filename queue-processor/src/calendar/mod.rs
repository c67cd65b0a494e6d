//! Remote calendar API seam.

mod google;

pub use google::GoogleCalendar;

use anyhow::Result;
use async_trait::async_trait;

/// Event payload exchanged with the remote calendar verbatim.
pub type CalendarEvent = google_calendar3::api::Event;

/// The three remote calls the processor makes.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Insert a new event and return it as stored remotely (with its ID).
    async fn create(&self, calendar_id: &str, event: CalendarEvent) -> Result<CalendarEvent>;

    async fn update(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: CalendarEvent,
    ) -> Result<CalendarEvent>;

    async fn delete(&self, calendar_id: &str, event_id: &str) -> Result<()>;
}

/// Remote identifier of an event, if it has been synced before.
///
/// An empty ID counts as no ID.
pub fn remote_id(event: &CalendarEvent) -> Option<&str> {
    event.id.as_deref().filter(|id| !id.is_empty())
}
