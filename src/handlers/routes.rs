use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::warn;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType};
use warp::{Filter, Rejection, Reply};

use super::facade::{ApiError, AvailabilityRequest, BookingFacade, ChatRequest, CreateEventRequest};

const GREETING: &str = "Hello TailorTalk! Backend is running.";

/// Largest JSON body any endpoint accepts.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

pub fn routes(
    facade: Arc<BookingFacade>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let root = warp::path::end()
        .and(warp::get())
        .map(|| respond(Ok(json!({ "message": GREETING }))));

    let check_availability = warp::path("check-availability")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_facade(facade.clone()))
        .and(json_body())
        .then(|facade: Arc<BookingFacade>, body: AvailabilityRequest| async move {
            respond(facade.check_availability(body).await)
        });

    let create_event = warp::path("create-event")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_facade(facade.clone()))
        .and(json_body())
        .then(|facade: Arc<BookingFacade>, body: CreateEventRequest| async move {
            respond(facade.create_event(body).await)
        });

    let chat = warp::path("chat")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_facade(facade))
        .and(json_body())
        .then(|facade: Arc<BookingFacade>, body: ChatRequest| async move {
            respond(facade.chat(body).await)
        });

    root.or(check_availability)
        .unify()
        .or(create_event)
        .unify()
        .or(chat)
        .unify()
        .recover(handle_rejection)
}

fn with_facade(
    facade: Arc<BookingFacade>,
) -> impl Filter<Extract = (Arc<BookingFacade>,), Error = Infallible> + Clone {
    warp::any().map(move || facade.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn respond<T: Serialize>(result: Result<T, ApiError>) -> warp::reply::WithStatus<warp::reply::Json> {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), StatusCode::OK),
        Err(err) => error_reply(err),
    }
}

fn error_reply(err: ApiError) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&err.body()), err.status)
}

fn rejection_error(status: StatusCode, detail: impl ToString) -> ApiError {
    ApiError {
        status,
        detail: detail.to_string(),
    }
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let err = if rejection.is_not_found() {
        rejection_error(StatusCode::NOT_FOUND, "Not Found")
    } else if let Some(e) = rejection.find::<BodyDeserializeError>() {
        rejection_error(StatusCode::UNPROCESSABLE_ENTITY, e)
    } else if let Some(e) = rejection.find::<PayloadTooLarge>() {
        rejection_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("{e}: limit is {MAX_BODY_BYTES} bytes"),
        )
    } else if let Some(e) = rejection.find::<LengthRequired>() {
        rejection_error(StatusCode::LENGTH_REQUIRED, e)
    } else if let Some(e) = rejection.find::<UnsupportedMediaType>() {
        rejection_error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("{e}: send application/json"),
        )
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        rejection_error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    } else {
        warn!(?rejection, "unhandled rejection");
        rejection_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    };
    Ok(error_reply(err))
}
