use async_trait::async_trait;
use tracing::{info, warn};

use crate::clients::google_calendar::{
    Attendee, CalendarItem, EventDateTime, EventInsertRequest, EventReminders, FreeBusyRequest,
    GoogleCalendarClient,
};
use crate::error::BookingError;
use crate::models::calendar::{BusySlot, CalendarEvent, DEFAULT_REMINDERS, EventDraft, TimeWindow};
use crate::service::timezone;

/// Stable local contract over the external calendar.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Busy intervals of one calendar inside `window`, expressed in the
    /// window's zone and clipped to it.
    async fn query_availability(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<BusySlot>, BookingError>;

    /// Stores a new event. Calling twice stores two events.
    async fn create_event(
        &self,
        calendar_id: &str,
        draft: &EventDraft,
    ) -> Result<CalendarEvent, BookingError>;
}

pub struct GoogleCalendarGateway {
    client: GoogleCalendarClient,
}

impl GoogleCalendarGateway {
    pub fn new(client: GoogleCalendarClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CalendarGateway for GoogleCalendarGateway {
    async fn query_availability(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<BusySlot>, BookingError> {
        let request = FreeBusyRequest {
            time_min: window.start.to_rfc3339(),
            time_max: window.end.to_rfc3339(),
            time_zone: window.zone.name().to_string(),
            items: vec![CalendarItem {
                id: calendar_id.to_string(),
            }],
        };
        let mut response = self.client.free_busy(&request).await?;
        let Some(calendar) = response.calendars.remove(calendar_id) else {
            // A missing entry must never read as a free window.
            warn!(calendar_id, "freeBusy response has no entry for the calendar");
            return Err(BookingError::Remote {
                status: 502,
                message: format!("freeBusy response did not include calendar '{calendar_id}'"),
            });
        };

        if let Some(err) = calendar.errors.first() {
            let status = if err.reason == "notFound" { 404 } else { 502 };
            return Err(BookingError::Remote {
                status,
                message: format!("calendar '{calendar_id}' could not be queried: {} ({})", err.reason, err.domain),
            });
        }

        let mut slots = Vec::with_capacity(calendar.busy.len());
        for interval in &calendar.busy {
            let start = timezone::from_provider(&interval.start, window.zone)?;
            let end = timezone::from_provider(&interval.end, window.zone)?;
            if let Some(slot) = window.clip(start, end) {
                slots.push(slot);
            }
        }
        slots.sort_by_key(|slot| slot.start);

        info!(calendar_id, busy = slots.len(), "availability checked");
        Ok(slots)
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        draft: &EventDraft,
    ) -> Result<CalendarEvent, BookingError> {
        let zone = draft.window.zone.name().to_string();
        let request = EventInsertRequest {
            summary: draft.summary.clone(),
            description: draft.description.clone().unwrap_or_default(),
            location: draft.location.clone().unwrap_or_default(),
            start: EventDateTime {
                date_time: draft.window.start.to_rfc3339(),
                time_zone: zone.clone(),
            },
            end: EventDateTime {
                date_time: draft.window.end.to_rfc3339(),
                time_zone: zone,
            },
            attendees: draft
                .attendees
                .iter()
                .map(|email| Attendee {
                    email: email.clone(),
                })
                .collect(),
            reminders: EventReminders {
                use_default: false,
                overrides: DEFAULT_REMINDERS.to_vec(),
            },
        };

        let inserted = self.client.insert_event(calendar_id, &request).await?;
        info!(calendar_id, event_id = %inserted.id, "event created");
        Ok(CalendarEvent {
            id: inserted.id,
            link: inserted.html_link,
        })
    }
}
