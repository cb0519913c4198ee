use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::BookingError;
use crate::models::chat::{ChatTurn, Role};
use crate::service::openai_service::{
    OracleMessage, OracleReply, OracleRequest, ReasoningOracle, ToolRequest,
};
use crate::service::timezone;
use crate::service::tools::{CalendarTools, ToolInvocation, ToolName, error_payload};

pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't process that request.";
pub const TURN_LIMIT_REPLY: &str = "I'm sorry, I wasn't able to finish that request. \
     Could you rephrase it or give me the exact date and time you have in mind?";

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentTurnResult {
    pub reply: String,
    pub tool_calls_made: Vec<ToolInvocation>,
}

pub fn system_policy(now: &str, zone: Tz) -> String {
    format!(
        "You are TailorTalk, an assistant that books appointments on a calendar.\n\
         You can check availability with the `check_availability` tool and create \
         appointments with the `create_event` tool.\n\
         Rules:\n\
         1. Be conversational and brief.\n\
         2. If the date, time, duration or purpose is unclear, ask. Never invent a time the user did not give.\n\
         3. Before calling `create_event`, restate the exact summary, start time and duration and wait for the user to confirm.\n\
         4. Use `check_availability` to suggest or verify free slots before proposing a booking.\n\
         5. Pass times to tools in ISO format (YYYY-MM-DDTHH:MM:SS). Assume the {zone} timezone unless the user names another one.\n\
         6. Work out relative dates (\"tomorrow\", \"next Friday\") from the current date and time below.\n\
         7. After an event is created, confirm it and share its link.\n\
         8. If a tool returns an error, explain it to the user in plain language.\n\
         9. Politely decline requests unrelated to scheduling without calling any tool.\n\
         Current date and time (context only, do not state it unless relevant): {now}",
        zone = zone.name(),
        now = now,
    )
}

/// Runs one chat turn: the oracle may call tools in sequential rounds before
/// it answers. Holds no per-conversation state.
pub struct ConversationalPlanner {
    oracle: Arc<dyn ReasoningOracle>,
    tools: CalendarTools,
    default_zone: Tz,
    max_tool_turns: usize,
    clock: Clock,
}

impl ConversationalPlanner {
    pub fn new(
        oracle: Arc<dyn ReasoningOracle>,
        tools: CalendarTools,
        default_zone: Tz,
        max_tool_turns: usize,
    ) -> Self {
        Self {
            oracle,
            tools,
            default_zone,
            max_tool_turns,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn compose(&self, user_message: &str, history: &[ChatTurn]) -> Vec<OracleMessage> {
        let now = timezone::describe_now((self.clock)(), self.default_zone);
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(OracleMessage::System(system_policy(&now, self.default_zone)));
        messages.extend(history.iter().map(|turn| match turn.role {
            Role::User => OracleMessage::User(turn.content.clone()),
            Role::Assistant => OracleMessage::Assistant(turn.content.clone()),
        }));
        messages.push(OracleMessage::User(user_message.to_string()));
        messages
    }

    /// Always produces a reply; oracle faults become an apology.
    pub async fn run_turn(&self, user_message: &str, history: &[ChatTurn]) -> AgentTurnResult {
        let mut tool_calls_made = Vec::new();
        match self.plan(user_message, history, &mut tool_calls_made).await {
            Ok(reply) => AgentTurnResult {
                reply,
                tool_calls_made,
            },
            Err(err) => {
                warn!(error = %err, kind = err.label(), "chat turn failed");
                AgentTurnResult {
                    reply: format!("I apologize, but I encountered an error: {err}. Please try again."),
                    tool_calls_made,
                }
            }
        }
    }

    async fn plan(
        &self,
        user_message: &str,
        history: &[ChatTurn],
        tool_calls_made: &mut Vec<ToolInvocation>,
    ) -> Result<String, BookingError> {
        let mut messages = self.compose(user_message, history);
        let schemas = self.tools.schemas();

        for round in 0..=self.max_tool_turns {
            let reply = self
                .oracle
                .respond(OracleRequest {
                    messages: &messages,
                    tools: &schemas,
                })
                .await?;

            let requests = match reply {
                OracleReply::DirectReply(text) if text.trim().is_empty() => {
                    return Ok(EMPTY_REPLY.to_string());
                }
                OracleReply::DirectReply(text) => {
                    info!(round, tools = tool_calls_made.len(), "chat turn answered");
                    return Ok(text);
                }
                OracleReply::ToolRequests(requests) if requests.is_empty() => {
                    return Err(BookingError::Planner(
                        "oracle asked for tools without naming any".to_string(),
                    ));
                }
                OracleReply::ToolRequests(requests) => requests,
            };

            if round == self.max_tool_turns {
                warn!(round, pending = requests.len(), "tool turn limit reached");
                break;
            }

            messages.push(OracleMessage::ToolCalls(requests.clone()));
            for request in &requests {
                let content = self.execute(request, tool_calls_made).await;
                messages.push(OracleMessage::ToolResult {
                    call_id: request.id.clone(),
                    content,
                });
            }
        }

        Ok(TURN_LIMIT_REPLY.to_string())
    }

    async fn execute(&self, request: &ToolRequest, tool_calls_made: &mut Vec<ToolInvocation>) -> String {
        let result = match request.name.parse::<ToolName>() {
            Ok(name) => {
                tool_calls_made.push(ToolInvocation {
                    name,
                    arguments: request.arguments.clone(),
                });
                self.tools.invoke(name, &request.arguments).await
            }
            Err(message) => {
                warn!(tool = %request.name, "oracle requested an unknown tool");
                error_payload(&BookingError::MalformedInput(message))
            }
        };
        result.to_string()
    }
}
