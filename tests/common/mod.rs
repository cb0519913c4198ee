#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tailorTalk::error::BookingError;
use tailorTalk::models::calendar::{BusySlot, CalendarEvent, EventDraft, TimeWindow};
use tailorTalk::service::calendar_service::CalendarGateway;
use tailorTalk::service::openai_service::{
    OracleMessage, OracleReply, OracleRequest, ReasoningOracle, ToolRequest,
};

/// In-memory calendar: stores every draft it is given and reports them back
/// as busy time.
#[derive(Default)]
pub struct FakeCalendar {
    events: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>, String)>>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeCalendar {
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn summaries(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, _, summary)| summary.clone())
            .collect()
    }
}

#[async_trait]
impl CalendarGateway for FakeCalendar {
    async fn query_availability(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<BusySlot>, BookingError> {
        self.queries.lock().unwrap().push(calendar_id.to_string());
        let events = self.events.lock().unwrap();
        let mut slots: Vec<BusySlot> = events
            .iter()
            .filter_map(|(_, start, end, _)| {
                window.clip(start.with_timezone(&window.zone), end.with_timezone(&window.zone))
            })
            .collect();
        slots.sort_by_key(|slot| slot.start);
        Ok(slots)
    }

    async fn create_event(
        &self,
        _calendar_id: &str,
        draft: &EventDraft,
    ) -> Result<CalendarEvent, BookingError> {
        let mut events = self.events.lock().unwrap();
        let id = format!("evt-{}", events.len() + 1);
        events.push((
            id.clone(),
            draft.window.start.with_timezone(&Utc),
            draft.window.end.with_timezone(&Utc),
            draft.summary.clone(),
        ));
        Ok(CalendarEvent {
            link: format!("https://calendar.example.com/event?eid={id}"),
            id,
        })
    }
}

/// Replays a fixed list of replies and records every context it was shown.
#[derive(Default)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<OracleReply, BookingError>>>,
    pub seen: Mutex<Vec<Vec<OracleMessage>>>,
}

impl ScriptedOracle {
    pub fn new(script: Vec<Result<OracleReply, BookingError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, reply: Result<OracleReply, BookingError>) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last_context(&self) -> Vec<OracleMessage> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ReasoningOracle for ScriptedOracle {
    async fn respond(&self, request: OracleRequest<'_>) -> Result<OracleReply, BookingError> {
        self.seen.lock().unwrap().push(request.messages.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(OracleReply::DirectReply("script exhausted".to_string())))
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolRequest {
    ToolRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

pub fn tool_results(context: &[OracleMessage]) -> Vec<String> {
    context
        .iter()
        .filter_map(|message| match message {
            OracleMessage::ToolResult { content, .. } => Some(content.clone()),
            _ => None,
        })
        .collect()
}
