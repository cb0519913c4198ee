use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use warp::http::StatusCode;

use crate::context::AppContext;
use crate::error::BookingError;
use crate::models::calendar::{BusySlot, EventDraft, TimeWindow};
use crate::models::chat::ChatTurn;
use crate::service::calendar_service::CalendarGateway;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub start: String,
    pub end: String,
}

impl From<&BusySlot> for SlotView {
    fn from(slot: &BusySlot) -> Self {
        Self {
            start: slot.start.to_rfc3339(),
            end: slot.end.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub busy_slots: Vec<SlotView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub summary: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub attendees: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEventResponse {
    pub message: String,
    pub event_id: String,
    pub html_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_message: String,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Boundary-level failure: an HTTP status plus a `detail` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            detail: self.detail.clone(),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        let status = match err {
            BookingError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            detail: err.to_string(),
        }
    }
}

/// The three request operations. Stateless; safe to share across tasks.
pub struct BookingFacade {
    context: AppContext,
}

impl BookingFacade {
    pub fn new(context: AppContext) -> Arc<Self> {
        Arc::new(Self { context })
    }

    pub async fn check_availability(
        &self,
        request: AvailabilityRequest,
    ) -> Result<AvailabilityResponse, ApiError> {
        let request_id = Uuid::new_v4();
        let gateway = self.gateway()?;
        let window = TimeWindow::parse(
            &request.start_time,
            &request.end_time,
            request.timezone.as_deref(),
            self.context.default_zone,
        )?;

        let slots = gateway
            .query_availability(&self.context.calendar_id, &window)
            .await
            .map_err(|err| log_failure(request_id, "check-availability", err))?;

        info!(%request_id, busy = slots.len(), "check-availability served");
        Ok(AvailabilityResponse {
            busy_slots: slots.iter().map(SlotView::from).collect(),
        })
    }

    pub async fn create_event(
        &self,
        request: CreateEventRequest,
    ) -> Result<CreateEventResponse, ApiError> {
        let request_id = Uuid::new_v4();
        let gateway = self.gateway()?;
        let window = TimeWindow::parse(
            &request.start_time,
            &request.end_time,
            request.timezone.as_deref(),
            self.context.default_zone,
        )?;
        let draft = EventDraft::new(&request.summary, window)?
            .with_description(request.description)
            .with_location(request.location)
            .with_attendees(request.attendees.unwrap_or_default());

        let event = gateway
            .create_event(&self.context.calendar_id, &draft)
            .await
            .map_err(|err| log_failure(request_id, "create-event", err))?;

        info!(%request_id, event_id = %event.id, "create-event served");
        Ok(CreateEventResponse {
            message: "Event created successfully".to_string(),
            event_id: event.id,
            html_link: event.link,
        })
    }

    /// Lower-layer faults come back as an apologetic reply, not an error.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        let request_id = Uuid::new_v4();
        if request.user_message.trim().is_empty() {
            return Err(BookingError::MalformedInput("user_message must not be empty".to_string()).into());
        }

        let result = self
            .context
            .planner
            .run_turn(&request.user_message, &request.chat_history)
            .await;

        info!(
            %request_id,
            history = request.chat_history.len(),
            tool_calls = result.tool_calls_made.len(),
            "chat served"
        );
        Ok(ChatResponse {
            response: result.reply,
        })
    }

    fn gateway(&self) -> Result<&Arc<dyn CalendarGateway>, ApiError> {
        self.context
            .gateway
            .as_ref()
            .ok_or_else(|| BookingError::calendar_uninitialized().into())
    }
}

fn log_failure(request_id: Uuid, operation: &str, err: BookingError) -> ApiError {
    warn!(%request_id, operation, error = %err, kind = err.label(), "request failed");
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_an_uninitialized_gateway_maps_to_503() {
        let unavailable: ApiError = BookingError::calendar_uninitialized().into();
        assert_eq!(unavailable.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(unavailable.detail.starts_with("Calendar service not initialized"));

        let remote: ApiError = BookingError::Remote {
            status: 404,
            message: "gone".to_string(),
        }
        .into();
        assert_eq!(remote.status, StatusCode::INTERNAL_SERVER_ERROR);

        let malformed: ApiError = BookingError::MalformedInput("bad".to_string()).into();
        assert_eq!(malformed.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(malformed.body(), ErrorBody { detail: "bad".to_string() });
    }

    #[test]
    fn chat_request_history_defaults_to_empty() {
        let request: ChatRequest = serde_json::from_str(r#"{"user_message":"hi"}"#).unwrap();
        assert!(request.chat_history.is_empty());
    }
}
