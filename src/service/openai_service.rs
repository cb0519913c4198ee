use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::clients::openai_client::{
    self, OpenAIFunction, OpenAIFunctionCall, OpenAIMessage, OpenAIRequest, OpenAITool,
    OpenAIToolCall,
};
use crate::error::BookingError;
use crate::service::tools::ToolSchema;

/// A tool call requested by the oracle. `name` is whatever the model sent
/// and may not match any known tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply {
    DirectReply(String),
    ToolRequests(Vec<ToolRequest>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OracleMessage {
    System(String),
    User(String),
    Assistant(String),
    ToolCalls(Vec<ToolRequest>),
    ToolResult { call_id: String, content: String },
}

#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    pub messages: &'a [OracleMessage],
    pub tools: &'a [ToolSchema],
}

#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn respond(&self, request: OracleRequest<'_>) -> Result<OracleReply, BookingError>;
}

pub struct OpenAIService {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    http: reqwest::Client,
}

impl OpenAIService {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, BookingError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BookingError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            api_key,
            model,
            base_url,
            temperature,
            http,
        })
    }

    fn build_request(&self, request: OracleRequest<'_>) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(to_wire_message).collect(),
            tools: request
                .tools
                .iter()
                .map(|schema| OpenAITool {
                    kind: "function",
                    function: OpenAIFunction {
                        name: schema.name.as_str().to_string(),
                        description: schema.description.to_string(),
                        parameters: schema.json_schema(),
                    },
                })
                .collect(),
            max_tokens: 1500,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl ReasoningOracle for OpenAIService {
    async fn respond(&self, request: OracleRequest<'_>) -> Result<OracleReply, BookingError> {
        let wire = self.build_request(request);
        let message =
            openai_client::query_openai(&self.http, &self.base_url, &self.api_key, &wire).await?;

        let tool_calls = message.tool_calls.unwrap_or_default();
        if !tool_calls.is_empty() {
            debug!(count = tool_calls.len(), "oracle requested tools");
            return Ok(OracleReply::ToolRequests(
                tool_calls.into_iter().map(from_wire_call).collect(),
            ));
        }
        Ok(OracleReply::DirectReply(message.content.unwrap_or_default()))
    }
}

fn to_wire_message(message: &OracleMessage) -> OpenAIMessage {
    match message {
        OracleMessage::System(content) => OpenAIMessage::System {
            content: content.clone(),
        },
        OracleMessage::User(content) => OpenAIMessage::User {
            content: content.clone(),
        },
        OracleMessage::Assistant(content) => OpenAIMessage::Assistant {
            content: Some(content.clone()),
            tool_calls: Vec::new(),
        },
        OracleMessage::ToolCalls(requests) => OpenAIMessage::Assistant {
            content: None,
            tool_calls: requests
                .iter()
                .map(|request| OpenAIToolCall {
                    id: request.id.clone(),
                    kind: "function".to_string(),
                    function: OpenAIFunctionCall {
                        name: request.name.clone(),
                        arguments: match &request.arguments {
                            Value::String(raw) => raw.clone(),
                            other => other.to_string(),
                        },
                    },
                })
                .collect(),
        },
        OracleMessage::ToolResult { call_id, content } => OpenAIMessage::Tool {
            tool_call_id: call_id.clone(),
            content: content.clone(),
        },
    }
}

/// Arguments that are not valid JSON are kept as a raw string so the tool
/// layer can report them.
fn from_wire_call(call: OpenAIToolCall) -> ToolRequest {
    let arguments = serde_json::from_str(&call.function.arguments)
        .unwrap_or(Value::String(call.function.arguments));
    ToolRequest {
        id: call.id,
        name: call.function.name,
        arguments,
    }
}
