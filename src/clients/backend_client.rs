use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ShellSettings;
use crate::error::BookingError;
use crate::handlers::facade::{
    AvailabilityRequest, AvailabilityResponse, ChatRequest, ChatResponse, CreateEventRequest,
    CreateEventResponse, ErrorBody,
};

/// What the shell needs from the backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn health(&self) -> Result<String, BookingError>;
    async fn check_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse, BookingError>;
    async fn create_event(
        &self,
        request: &CreateEventRequest,
    ) -> Result<CreateEventResponse, BookingError>;
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BookingError>;
}

pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(settings: &ShellSettings) -> Result<Self, BookingError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| BookingError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            base_url: settings.backend_url.clone(),
            http,
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, BookingError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        read_body(response).await
    }
}

/// Non-2xx responses become `Remote` carrying the backend's `detail`.
async fn read_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BookingError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.detail)
            .unwrap_or(text);
        return Err(BookingError::Remote {
            status: status.as_u16(),
            message: detail,
        });
    }
    serde_json::from_str(&text).map_err(|e| BookingError::Remote {
        status: status.as_u16(),
        message: format!("unreadable backend response: {e}"),
    })
}

#[async_trait]
impl ChatTransport for BackendClient {
    async fn health(&self) -> Result<String, BookingError> {
        let response = self.http.get(format!("{}/", self.base_url)).send().await?;
        let body: Value = read_body(response).await?;
        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn check_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse, BookingError> {
        self.post("/check-availability", request).await
    }

    async fn create_event(
        &self,
        request: &CreateEventRequest,
    ) -> Result<CreateEventResponse, BookingError> {
        self.post("/create-event", request).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BookingError> {
        self.post("/chat", request).await
    }
}
