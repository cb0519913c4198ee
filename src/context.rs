use std::sync::Arc;

use chrono_tz::Tz;
use tracing::{error, info};

use crate::clients::google_auth::{ServiceAccountKey, ServiceAccountTokenSource};
use crate::clients::google_calendar::GoogleCalendarClient;
use crate::config::ServerSettings;
use crate::error::BookingError;
use crate::service::calendar_service::{CalendarGateway, GoogleCalendarGateway};
use crate::service::openai_service::{OpenAIService, ReasoningOracle};
use crate::service::planner::ConversationalPlanner;
use crate::service::tools::CalendarTools;

/// Everything a request needs, built once at startup and shared by
/// reference. The gateway is `None` when the credential could not be loaded.
pub struct AppContext {
    pub gateway: Option<Arc<dyn CalendarGateway>>,
    pub planner: ConversationalPlanner,
    pub calendar_id: String,
    pub default_zone: Tz,
}

impl AppContext {
    pub fn initialize(settings: &ServerSettings) -> Result<Self, BookingError> {
        let gateway = match build_gateway(settings) {
            Ok(gateway) => {
                info!(calendar_id = %settings.calendar_id, "calendar gateway ready");
                Some(gateway)
            }
            Err(err) => {
                error!(error = %err, kind = err.label(), "calendar gateway unavailable");
                None
            }
        };

        let oracle: Arc<dyn ReasoningOracle> = Arc::new(OpenAIService::new(
            settings.openai_api_key.clone(),
            settings.openai_model.clone(),
            settings.openai_base_url.clone(),
            settings.openai_temperature,
            settings.oracle_timeout,
        )?);

        Ok(Self::assemble(
            gateway,
            oracle,
            settings.calendar_id.clone(),
            settings.default_timezone,
            settings.max_tool_turns,
        ))
    }

    /// Wires explicit collaborators, e.g. in-memory fakes.
    pub fn assemble(
        gateway: Option<Arc<dyn CalendarGateway>>,
        oracle: Arc<dyn ReasoningOracle>,
        calendar_id: String,
        default_zone: Tz,
        max_tool_turns: usize,
    ) -> Self {
        let tools = CalendarTools::new(gateway.clone(), calendar_id.clone(), default_zone);
        let planner = ConversationalPlanner::new(oracle, tools, default_zone, max_tool_turns);
        Self {
            gateway,
            planner,
            calendar_id,
            default_zone,
        }
    }
}

fn build_gateway(settings: &ServerSettings) -> Result<Arc<dyn CalendarGateway>, BookingError> {
    let key = ServiceAccountKey::from_file(&settings.service_account_key_path)?;
    let tokens = Arc::new(ServiceAccountTokenSource::new(key, settings.calendar_timeout)?);
    let client =
        GoogleCalendarClient::new(&settings.calendar_api_base, tokens, settings.calendar_timeout)?;
    Ok(Arc::new(GoogleCalendarGateway::new(client)))
}
