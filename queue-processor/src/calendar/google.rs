use anyhow::{Context, Result};
use async_trait::async_trait;
use google_calendar3::hyper_rustls::HttpsConnector;
use google_calendar3::CalendarHub;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::path::Path;

use super::{CalendarApi, CalendarEvent};

/// Google Calendar client authenticated as a service account.
pub struct GoogleCalendar {
    hub: CalendarHub<HttpsConnector<HttpConnector>>,
}

impl GoogleCalendar {
    /// Build a client from a service account JSON key file.
    pub async fn from_key_file(key_file: &Path) -> Result<Self> {
        let key = google_calendar3::yup_oauth2::read_service_account_key(key_file)
            .await
            .with_context(|| format!("Failed to read Google key file {}", key_file.display()))?;

        let auth = google_calendar3::yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .context("Failed to build service account authenticator")?;

        let connector = google_calendar3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = CalendarHub::new(client, auth);

        Ok(Self { hub })
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendar {
    async fn create(&self, calendar_id: &str, event: CalendarEvent) -> Result<CalendarEvent> {
        let (_, created) = self
            .hub
            .events()
            .insert(event, calendar_id)
            .doit()
            .await
            .with_context(|| format!("Failed to insert event into calendar {}", calendar_id))?;

        Ok(created)
    }

    async fn update(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: CalendarEvent,
    ) -> Result<CalendarEvent> {
        let (_, updated) = self
            .hub
            .events()
            .update(event, calendar_id, event_id)
            .doit()
            .await
            .with_context(|| {
                format!(
                    "Failed to update event {} in calendar {}",
                    event_id, calendar_id
                )
            })?;

        Ok(updated)
    }

    async fn delete(&self, calendar_id: &str, event_id: &str) -> Result<()> {
        self.hub
            .events()
            .delete(calendar_id, event_id)
            .doit()
            .await
            .with_context(|| {
                format!(
                    "Failed to delete event {} from calendar {}",
                    event_id, calendar_id
                )
            })?;

        Ok(())
    }
}
