use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::BookingError;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum OpenAIMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<OpenAIToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: OpenAIFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIFunctionCall {
    pub name: String,
    /// JSON-encoded argument object, as produced by the model.
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize)]
pub struct OpenAITool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
pub struct OpenAIFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<OpenAITool>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAIToolCall>>,
}

pub async fn query_openai(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    request: &OpenAIRequest,
) -> Result<ResponseMessage, BookingError> {
    let response = http
        .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
        .bearer_auth(api_key)
        .json(request)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?; // read the body once

    if !status.is_success() {
        warn!(status = status.as_u16(), "chat completion request failed");
        return Err(BookingError::Remote {
            status: status.as_u16(),
            message: format!("Request failed with status {}: {}", status, text),
        });
    }

    let parsed: OpenAIResponse = serde_json::from_str(&text).map_err(|e| BookingError::Remote {
        status: status.as_u16(),
        message: format!("Failed to parse JSON: {}", e),
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| BookingError::Remote {
            status: status.as_u16(),
            message: "No response from OpenAI".to_string(),
        })
}
