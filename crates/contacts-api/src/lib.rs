//! # contacts-api
//!
//! REST API for the contacts service.
//!
//! [`router`] builds the complete axum application over any
//! [`ContactRepository`]; the `contacts-api` binary wires it to the backend
//! named by `DATABASE_URL`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod links;
pub mod query;
pub mod telemetry;

use std::any::Any;
use std::sync::Arc;

use axum::{
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as CorsAny, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::error;
use uuid::Uuid;

use contacts_core::ContactRepository;

pub use error::{ApiError, ErrorEntry};
pub use links::{Link, Linked, RequestUrl};

use handlers::{
    create_contact, delete_contact, get_contact, route_not_found, search_contacts, update_contact,
};

/// Headers browsers may read from cross-origin responses.
pub const EXPOSED_HEADERS: [HeaderName; 3] = [
    header::LOCATION,
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
];

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub contacts: Arc<dyn ContactRepository>,
}

impl AppState {
    pub fn new(contacts: Arc<dyn ContactRepository>) -> Self {
        Self { contacts }
    }
}

/// UUIDv7 request ids, time-ordered for log correlation.
#[derive(Clone, Copy, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Turn a handler panic into a 500 error body.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(subsystem = "api", error = %detail, "Handler panicked");
    ApiError::internal(error::INTERNAL_MESSAGE).into_response()
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/:user_id",
            get(search_contacts)
                .post(create_contact)
                .fallback(route_not_found),
        )
        .route(
            "/:user_id/:id",
            get(get_contact)
                .patch(update_contact)
                .delete(delete_contact)
                .fallback(route_not_found),
        )
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(CorsAny)
                .allow_methods(CorsAny)
                .allow_headers(CorsAny)
                .expose_headers(EXPOSED_HEADERS),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_request_ids_are_uuid_v7() {
        let request = axum::http::Request::new(());
        let id = MakeRequestUuidV7.make_request_id(&request).unwrap();
        let parsed = Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn test_panic_becomes_internal_error() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
