use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::error::BookingError;
use crate::models::calendar::{EventDraft, TimeWindow};
use crate::service::calendar_service::CalendarGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CheckAvailability,
    CreateEvent,
}

impl ToolName {
    pub const ALL: [ToolName; 2] = [ToolName::CheckAvailability, ToolName::CreateEvent];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CheckAvailability => "check_availability",
            ToolName::CreateEvent => "create_event",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| {
                let available: Vec<&str> = ToolName::ALL.iter().map(|n| n.as_str()).collect();
                format!("Unknown tool '{s}'. Available tools: {}", available.join(", "))
            })
    }
}

/// A validated tool call, kept for observability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub name: ToolName,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolParameter {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// What the oracle sees of a tool: name, purpose and string-typed inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSchema {
    pub name: ToolName,
    pub description: &'static str,
    pub parameters: Vec<ToolParameter>,
}

impl ToolSchema {
    /// JSON Schema object for the parameters.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.to_string(),
                json!({ "type": "string", "description": param.description }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

const START_TIME: ToolParameter = ToolParameter {
    name: "start_time",
    required: true,
    description: "Start in ISO format, e.g. 2025-07-07T09:00:00. Read in `timezone`.",
};
const END_TIME: ToolParameter = ToolParameter {
    name: "end_time",
    required: true,
    description: "End in ISO format, e.g. 2025-07-07T17:00:00. Must be after start_time.",
};
const TIMEZONE: ToolParameter = ToolParameter {
    name: "timezone",
    required: false,
    description: "IANA timezone such as Asia/Kolkata or America/New_York. Defaults to the assistant's timezone.",
};

pub fn tool_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: ToolName::CheckAvailability,
            description: "Check the free/busy status of the calendar for a time range. \
                          Returns the busy slots inside the range; an empty list means the whole range is free.",
            parameters: vec![START_TIME, END_TIME, TIMEZONE],
        },
        ToolSchema {
            name: ToolName::CreateEvent,
            description: "Create an appointment on the calendar. Only call this after the user \
                          has confirmed the exact summary, start time and duration.",
            parameters: vec![
                ToolParameter {
                    name: "summary",
                    required: true,
                    description: "Title of the event, e.g. \"Haircut Appointment\".",
                },
                START_TIME,
                END_TIME,
                ToolParameter {
                    name: "description",
                    required: false,
                    description: "Longer description of the event.",
                },
                ToolParameter {
                    name: "location",
                    required: false,
                    description: "Physical or virtual location.",
                },
                TIMEZONE,
            ],
        },
    ]
}

#[derive(Debug, Deserialize)]
struct AvailabilityArgs {
    start_time: String,
    end_time: String,
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateEventArgs {
    summary: String,
    start_time: String,
    end_time: String,
    description: Option<String>,
    location: Option<String>,
    timezone: Option<String>,
}

/// Exposes the calendar gateway to the oracle. Every outcome, including
/// failures, comes back as a JSON payload the oracle can read.
pub struct CalendarTools {
    gateway: Option<Arc<dyn CalendarGateway>>,
    calendar_id: String,
    default_zone: Tz,
}

impl CalendarTools {
    pub fn new(
        gateway: Option<Arc<dyn CalendarGateway>>,
        calendar_id: impl Into<String>,
        default_zone: Tz,
    ) -> Self {
        Self {
            gateway,
            calendar_id: calendar_id.into(),
            default_zone,
        }
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        tool_schemas()
    }

    pub async fn invoke(&self, name: ToolName, arguments: &Value) -> Value {
        info!(tool = %name, "tool call");
        let outcome = match name {
            ToolName::CheckAvailability => self.check_availability(arguments).await,
            ToolName::CreateEvent => self.create_event(arguments).await,
        };
        outcome.unwrap_or_else(|err| {
            warn!(tool = %name, error = %err, kind = err.label(), "tool call failed");
            error_payload(&err)
        })
    }

    async fn check_availability(&self, arguments: &Value) -> Result<Value, BookingError> {
        let args: AvailabilityArgs = parse_args(ToolName::CheckAvailability, arguments)?;
        let window = TimeWindow::parse(
            &args.start_time,
            &args.end_time,
            args.timezone.as_deref(),
            self.default_zone,
        )?;
        let gateway = self.gateway()?;
        let slots = gateway.query_availability(&self.calendar_id, &window).await?;
        Ok(json!({
            "timezone": window.zone.name(),
            "busy_slots": slots
                .iter()
                .map(|s| json!({ "start": s.start.to_rfc3339(), "end": s.end.to_rfc3339() }))
                .collect::<Vec<_>>(),
        }))
    }

    async fn create_event(&self, arguments: &Value) -> Result<Value, BookingError> {
        let args: CreateEventArgs = parse_args(ToolName::CreateEvent, arguments)?;
        let window = TimeWindow::parse(
            &args.start_time,
            &args.end_time,
            args.timezone.as_deref(),
            self.default_zone,
        )?;
        let draft = EventDraft::new(&args.summary, window)?
            .with_description(args.description)
            .with_location(args.location);
        let gateway = self.gateway()?;
        let event = gateway.create_event(&self.calendar_id, &draft).await?;
        Ok(json!({
            "message": "Event created successfully",
            "event_id": event.id,
            "html_link": event.link,
        }))
    }

    fn gateway(&self) -> Result<&Arc<dyn CalendarGateway>, BookingError> {
        self.gateway
            .as_ref()
            .ok_or_else(BookingError::calendar_uninitialized)
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: ToolName, arguments: &Value) -> Result<T, BookingError> {
    serde_json::from_value(arguments.clone()).map_err(|e| {
        BookingError::MalformedInput(format!("Invalid arguments for {tool}: {e}"))
    })
}

pub fn error_payload(err: &BookingError) -> Value {
    json!({ "error": err.to_string() })
}
