use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::BookingError;
use crate::service::timezone;

/// A normalized `[start, end)` range in an IANA zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub zone: Tz,
}

impl TimeWindow {
    /// Reads caller-supplied bounds. A missing or blank `zone` falls back to
    /// `default_zone`.
    pub fn parse(
        start: &str,
        end: &str,
        zone: Option<&str>,
        default_zone: Tz,
    ) -> Result<Self, BookingError> {
        let zone = match zone.map(str::trim).filter(|z| !z.is_empty()) {
            Some(name) => timezone::parse_zone(name)?,
            None => default_zone,
        };
        let start = timezone::parse_in_zone(start, zone)?;
        let end = timezone::parse_in_zone(end, zone)?;
        Self::new(start, end, zone)
    }

    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>, zone: Tz) -> Result<Self, BookingError> {
        if start >= end {
            return Err(BookingError::MalformedInput(
                "start time must be before end time".to_string(),
            ));
        }
        Ok(Self {
            start: start.with_timezone(&zone),
            end: end.with_timezone(&zone),
            zone,
        })
    }

    /// Clips `[start, end)` to this window. `None` when nothing overlaps.
    pub fn clip(&self, start: DateTime<Tz>, end: DateTime<Tz>) -> Option<BusySlot> {
        let start = start.max(self.start).with_timezone(&self.zone);
        let end = end.min(self.end).with_timezone(&self.zone);
        (start < end).then_some(BusySlot { start, end })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusySlot {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub summary: String,
    pub window: TimeWindow,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
}

impl EventDraft {
    pub fn new(summary: &str, window: TimeWindow) -> Result<Self, BookingError> {
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(BookingError::MalformedInput(
                "Event summary must not be empty.".to_string(),
            ));
        }
        Ok(Self {
            summary: summary.to_string(),
            window,
            description: None,
            location: None,
            attendees: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn with_attendees(mut self, attendees: Vec<String>) -> Self {
        self.attendees = attendees
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        self
    }
}

/// Identity assigned by the external calendar once an event is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: ReminderMethod,
    pub minutes: u32,
}

/// Every created event carries these instead of the calendar defaults.
pub const DEFAULT_REMINDERS: [ReminderOverride; 2] = [
    ReminderOverride {
        method: ReminderMethod::Email,
        minutes: 24 * 60,
    },
    ReminderOverride {
        method: ReminderMethod::Popup,
        minutes: 10,
    },
];
