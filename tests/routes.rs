mod common;

use std::sync::Arc;

use chrono_tz::Asia::Kolkata;
use serde_json::{Value, json};
use tailorTalk::context::AppContext;
use tailorTalk::handlers::facade::BookingFacade;
use tailorTalk::handlers::routes::{MAX_BODY_BYTES, routes};
use tailorTalk::service::calendar_service::CalendarGateway;
use tailorTalk::service::openai_service::{OracleReply, ReasoningOracle};
use warp::http::{Response, StatusCode};

use common::{FakeCalendar, ScriptedOracle};

fn facade(
    gateway: Option<Arc<dyn CalendarGateway>>,
    oracle: Arc<dyn ReasoningOracle>,
) -> Arc<BookingFacade> {
    BookingFacade::new(AppContext::assemble(
        gateway,
        oracle,
        "primary".to_string(),
        Kolkata,
        5,
    ))
}

fn with_calendar() -> Arc<BookingFacade> {
    facade(
        Some(Arc::new(FakeCalendar::default())),
        Arc::new(ScriptedOracle::default()),
    )
}

fn body(response: &Response<impl AsRef<[u8]>>) -> Value {
    serde_json::from_slice(response.body().as_ref()).unwrap()
}

#[tokio::test]
async fn root_reports_the_backend_is_running() {
    let api = routes(with_calendar());
    let response = warp::test::request().method("GET").path("/").reply(&api).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response), json!({ "message": "Hello TailorTalk! Backend is running." }));
}

#[tokio::test]
async fn booking_then_availability_over_http() {
    let api = routes(with_calendar());

    let created = warp::test::request()
        .method("POST")
        .path("/create-event")
        .json(&json!({
            "summary": "Haircut Appointment",
            "start_time": "2025-07-08T14:00:00",
            "end_time": "2025-07-08T15:00:00"
        }))
        .reply(&api)
        .await;
    assert_eq!(created.status(), StatusCode::OK);
    let created = body(&created);
    assert_eq!(created["message"], "Event created successfully");
    assert_eq!(created["event_id"], "evt-1");

    let availability = warp::test::request()
        .method("POST")
        .path("/check-availability")
        .json(&json!({
            "start_time": "2025-07-08T12:00:00",
            "end_time": "2025-07-08T17:00:00"
        }))
        .reply(&api)
        .await;
    assert_eq!(availability.status(), StatusCode::OK);
    assert_eq!(
        body(&availability),
        json!({
            "busy_slots": [
                { "start": "2025-07-08T14:00:00+05:30", "end": "2025-07-08T15:00:00+05:30" }
            ]
        })
    );
}

#[tokio::test]
async fn missing_gateway_answers_503_with_detail() {
    let api = routes(facade(None, Arc::new(ScriptedOracle::default())));
    let response = warp::test::request()
        .method("POST")
        .path("/check-availability")
        .json(&json!({
            "start_time": "2025-07-08T14:00:00",
            "end_time": "2025-07-08T15:00:00"
        }))
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body(&response),
        json!({ "detail": "Calendar service not initialized. Check service account key path." })
    );
}

#[tokio::test]
async fn operation_failures_answer_500_with_detail() {
    let api = routes(with_calendar());
    let response = warp::test::request()
        .method("POST")
        .path("/check-availability")
        .json(&json!({
            "start_time": "tomorrow at 2",
            "end_time": "2025-07-08T15:00:00"
        }))
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body(&response)["detail"].as_str().unwrap().to_string();
    assert!(detail.starts_with("Invalid time format"));
}

#[tokio::test]
async fn chat_returns_the_planner_reply() {
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(OracleReply::DirectReply(
        "What time suits you?".to_string(),
    ))]));
    let api = routes(facade(Some(Arc::new(FakeCalendar::default())), oracle));
    let response = warp::test::request()
        .method("POST")
        .path("/chat")
        .json(&json!({
            "user_message": "Book a haircut",
            "chat_history": [{ "role": "user", "content": "hi" }]
        }))
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response), json!({ "response": "What time suits you?" }));
}

#[tokio::test]
async fn undeserializable_bodies_answer_422() {
    let api = routes(with_calendar());

    let missing_field = warp::test::request()
        .method("POST")
        .path("/chat")
        .json(&json!({ "chat_history": [] }))
        .reply(&api)
        .await;
    assert_eq!(missing_field.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body(&missing_field)["detail"].is_string());

    let bad_role = warp::test::request()
        .method("POST")
        .path("/chat")
        .json(&json!({
            "user_message": "hi",
            "chat_history": [{ "role": "system", "content": "x" }]
        }))
        .reply(&api)
        .await;
    assert_eq!(bad_role.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_paths_and_wrong_methods() {
    let api = routes(with_calendar());

    let missing = warp::test::request().method("GET").path("/events").reply(&api).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&missing), json!({ "detail": "Not Found" }));

    let wrong_method = warp::test::request().method("GET").path("/chat").reply(&api).await;
    assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body(&wrong_method), json!({ "detail": "Method Not Allowed" }));

    let post_root = warp::test::request().method("POST").path("/").reply(&api).await;
    assert_eq!(post_root.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn non_json_content_type_answers_415() {
    let api = routes(with_calendar());
    let response = warp::test::request()
        .method("POST")
        .path("/chat")
        .header("content-type", "text/plain")
        .body(r#"{"user_message":"hi"}"#)
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let detail = body(&response)["detail"].as_str().unwrap().to_string();
    assert!(detail.contains("application/json"));
}

#[tokio::test]
async fn oversized_bodies_answer_413_before_reaching_the_planner() {
    let oracle = Arc::new(ScriptedOracle::default());
    let api = routes(facade(Some(Arc::new(FakeCalendar::default())), oracle.clone()));
    let response = warp::test::request()
        .method("POST")
        .path("/chat")
        .json(&json!({ "user_message": "x".repeat(MAX_BODY_BYTES as usize + 1) }))
        .reply(&api)
        .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let detail = body(&response)["detail"].as_str().unwrap().to_string();
    assert!(detail.contains(&MAX_BODY_BYTES.to_string()));
    assert_eq!(oracle.calls(), 0);
}
