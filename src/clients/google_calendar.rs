use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::google_auth::TokenSource;
use crate::error::BookingError;
use crate::models::calendar::ReminderOverride;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyRequest {
    pub time_min: String,
    pub time_max: String,
    pub time_zone: String,
    pub items: Vec<CalendarItem>,
}

#[derive(Debug, Serialize)]
pub struct CalendarItem {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct FreeBusyResponse {
    #[serde(default)]
    pub calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
pub struct FreeBusyCalendar {
    #[serde(default)]
    pub busy: Vec<BusyInterval>,
    #[serde(default)]
    pub errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
pub struct BusyInterval {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct FreeBusyError {
    #[serde(default)]
    pub domain: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Serialize)]
pub struct Attendee {
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReminders {
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Serialize)]
pub struct EventInsertRequest {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub attendees: Vec<Attendee>,
    pub reminders: EventReminders,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedEvent {
    pub id: String,
    pub html_link: String,
}

/// Thin HTTP client for the Calendar v3 REST API.
pub struct GoogleCalendarClient {
    api_base: Url,
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleCalendarClient {
    pub fn new(
        api_base: &str,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Result<Self, BookingError> {
        let api_base = Url::parse(api_base.trim_end_matches('/')).map_err(|e| {
            BookingError::Configuration(format!("invalid calendar API base '{api_base}': {e}"))
        })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BookingError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            api_base,
            http,
            tokens,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BookingError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| BookingError::Configuration("calendar API base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn free_busy(&self, request: &FreeBusyRequest) -> Result<FreeBusyResponse, BookingError> {
        let url = self.endpoint(&["freeBusy"])?;
        let text = self.post_json(url, request).await?;
        serde_json::from_str(&text).map_err(|e| BookingError::Remote {
            status: 502,
            message: format!("unreadable free/busy response: {e}"),
        })
    }

    /// Not idempotent. A response that cannot be read after a successful
    /// insert is reported as an error even though the event may exist.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        request: &EventInsertRequest,
    ) -> Result<InsertedEvent, BookingError> {
        let url = self.endpoint(&["calendars", calendar_id, "events"])?;
        let text = self.post_json(url, request).await?;
        serde_json::from_str(&text).map_err(|e| {
            error!(calendar_id, error = %e, "event insert succeeded but response was unreadable");
            BookingError::Remote {
                status: 502,
                message: format!(
                    "The calendar accepted the event but its response could not be read ({e}); \
                     the event may exist without an id."
                ),
            }
        })
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: Url, body: &T) -> Result<String, BookingError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "calendar API returned an error");
            return Err(BookingError::Remote {
                status: status.as_u16(),
                message: format!("Google Calendar API error: {} - {}", status.as_u16(), text),
            });
        }
        Ok(text)
    }
}
