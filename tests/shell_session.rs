use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tailorTalk::cli::{ChatSession, ShellInput, render_error};
use tailorTalk::clients::backend_client::{BackendClient, ChatTransport};
use tailorTalk::config::ShellSettings;
use tailorTalk::error::BookingError;
use tailorTalk::handlers::facade::{
    AvailabilityRequest, AvailabilityResponse, ChatRequest, ChatResponse, CreateEventRequest,
    CreateEventResponse,
};
use tailorTalk::models::chat::{ChatTurn, Role};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct FakeBackend {
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    fail_next: Mutex<bool>,
}

#[async_trait]
impl ChatTransport for FakeBackend {
    async fn health(&self) -> Result<String, BookingError> {
        Ok("up".to_string())
    }

    async fn check_availability(
        &self,
        _request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse, BookingError> {
        Ok(AvailabilityResponse { busy_slots: Vec::new() })
    }

    async fn create_event(
        &self,
        _request: &CreateEventRequest,
    ) -> Result<CreateEventResponse, BookingError> {
        Err(BookingError::Remote {
            status: 503,
            message: "Calendar service not initialized. Check service account key path.".to_string(),
        })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BookingError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(BookingError::Remote {
                status: 500,
                message: "boom".to_string(),
            });
        }
        Ok(ChatResponse {
            response: format!("echo: {}", request.user_message),
        })
    }
}

#[test]
fn prompt_commands_are_recognized() {
    assert_eq!(ShellInput::classify("/quit"), ShellInput::Quit);
    assert_eq!(ShellInput::classify(" /exit "), ShellInput::Quit);
    assert_eq!(ShellInput::classify("/clear"), ShellInput::Clear);
    assert_eq!(ShellInput::classify("   "), ShellInput::Skip);
    assert_eq!(
        ShellInput::classify("book a haircut"),
        ShellInput::Message("book a haircut".to_string())
    );
}

#[tokio::test]
async fn history_is_client_held_and_resent_every_turn() {
    let mut session = ChatSession::new(FakeBackend::default());

    assert_eq!(session.send("hi").await.unwrap(), "echo: hi");
    assert_eq!(session.send("tomorrow 2pm").await.unwrap(), "echo: tomorrow 2pm");

    let history = session.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0], ChatTurn::user("hi"));
    assert_eq!(history[1].role, Role::Assistant);
}

#[tokio::test]
async fn greeting_is_not_sent_and_clear_starts_over() {
    let backend = FakeBackend::default();
    let sent = backend.requests.clone();
    let mut session = ChatSession::new(backend);
    session.send("hello").await.unwrap();
    session.send("again").await.unwrap();
    session.clear();
    session.send("fresh").await.unwrap();
    assert_eq!(session.history().len(), 2);

    let sent = sent.lock().unwrap();
    let history_sizes: Vec<usize> = sent.iter().map(|r| r.chat_history.len()).collect();
    assert_eq!(history_sizes, [0, 2, 0]);
    assert!(sent[1].chat_history.iter().all(|turn| turn.content != "How can I help you book an appointment today?"));
}

#[tokio::test]
async fn failed_turn_keeps_history_unchanged() {
    let backend = FakeBackend::default();
    *backend.fail_next.lock().unwrap() = true;
    let mut session = ChatSession::new(backend);

    let err = session.send("hi").await.unwrap_err();
    assert_eq!(render_error(&err), "Error 500: boom");
    assert!(session.history().is_empty());

    session.send("hi").await.unwrap();
    assert_eq!(session.history().len(), 2);
}

#[test]
fn transport_errors_render_without_status() {
    let rendered = render_error(&BookingError::Transport("connection refused".to_string()));
    assert_eq!(rendered, "Error: transport error: connection refused");
}

fn client(server: &MockServer) -> BackendClient {
    BackendClient::new(&ShellSettings {
        backend_url: server.uri(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn session_over_http_resends_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(json!({ "user_message": "hi", "chat_history": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "hello" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(json!({
            "user_message": "book it",
            "chat_history": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Booked." })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = ChatSession::new(client(&server));
    assert_eq!(session.send("hi").await.unwrap(), "hello");
    assert_eq!(session.send("book it").await.unwrap(), "Booked.");
    assert_eq!(session.history().len(), 4);
}

#[tokio::test]
async fn backend_detail_is_carried_into_the_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/check-availability"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "detail": "Calendar service not initialized. Check service account key path."
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .check_availability(&AvailabilityRequest {
            start_time: "2025-07-08T14:00:00".to_string(),
            end_time: "2025-07-08T15:00:00".to_string(),
            timezone: None,
        })
        .await
        .unwrap_err();
    assert_eq!(
        render_error(&err),
        "Error 503: Calendar service not initialized. Check service account key path."
    );
}

#[tokio::test]
async fn health_reads_the_greeting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Hello TailorTalk! Backend is running."
        })))
        .mount(&server)
        .await;

    assert_eq!(
        client(&server).health().await.unwrap(),
        "Hello TailorTalk! Backend is running."
    );
}
