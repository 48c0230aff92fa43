//! Contact HTTP handlers.
//!
//! Routes are scoped by the user id in the first path segment:
//!
//! | Method   | Path             | Handler           |
//! |----------|------------------|-------------------|
//! | `POST`   | `/{userId}`      | [`create_contact`]  |
//! | `GET`    | `/{userId}`      | [`search_contacts`] |
//! | `GET`    | `/{userId}/{id}` | [`get_contact`]     |
//! | `PATCH`  | `/{userId}/{id}` | [`update_contact`]  |
//! | `DELETE` | `/{userId}/{id}` | [`delete_contact`]  |

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, OriginalUri, Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info};

use contacts_core::{Contact, ContactPatch, NewContact};

use crate::error::ApiError;
use crate::links::{paginate, Linked, RequestUrl};
use crate::query::{RawSearchParams, SearchParams};
use crate::AppState;

type JsonObject = Map<String, JsonValue>;

fn json_body(body: Result<Json<JsonObject>, JsonRejection>) -> Result<JsonObject, ApiError> {
    match body {
        Ok(Json(object)) => Ok(object),
        Err(rejection) => Err(ApiError::bad_request(format!(
            "request body must be a JSON object: {}",
            rejection.body_text()
        ))),
    }
}

/// Create a contact for `userId`.
///
/// # Returns
/// - 201 Created with a `Location` header and `{ result: { id }, links: [self] }`
/// - 400 Bad Request if the body is not a JSON object or fails validation
/// - 500 Internal Server Error on storage failure
pub async fn create_contact(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    url: RequestUrl,
    body: Result<Json<JsonObject>, JsonRejection>,
) -> Result<Response, ApiError> {
    let new = NewContact::from_json(&user_id, json_body(body)?)?;
    let id = state.contacts.create(&user_id, new).await?;
    let location = url.child(id.as_str());

    info!(
        subsystem = "api",
        component = "contacts",
        op = "create",
        user_id = %user_id,
        contact_id = %id,
        "Contact created"
    );

    let body = Linked::with_self(json!({ "id": id }), location.clone());
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response())
}

/// Fetch one contact.
///
/// # Returns
/// - 200 OK with `{ result: contact, links: [self] }`
/// - 404 Not Found if the user has no such contact
pub async fn get_contact(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, String)>,
    url: RequestUrl,
) -> Result<Json<Linked<Contact>>, ApiError> {
    let contact = state.contacts.read(&user_id, &id).await?;
    Ok(Json(Linked::with_self(contact, url.as_str())))
}

/// Merge the body into an existing contact.
///
/// Fields absent from the body are left alone; `emails: null` removes the
/// email list.
///
/// # Returns
/// - 200 OK with the updated contact and its self link
/// - 400 Bad Request for a malformed body or mismatched `id`/`userId`
/// - 404 Not Found if the user has no such contact
pub async fn update_contact(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, String)>,
    url: RequestUrl,
    body: Result<Json<JsonObject>, JsonRejection>,
) -> Result<Json<Linked<Contact>>, ApiError> {
    let patch = ContactPatch::from_json(&user_id, &id, json_body(body)?)?;
    let contact = state.contacts.update(&user_id, &id, patch).await?;

    info!(
        subsystem = "api",
        component = "contacts",
        op = "update",
        user_id = %user_id,
        contact_id = %id,
        "Contact updated"
    );

    Ok(Json(Linked::with_self(contact, url.as_str())))
}

/// Delete a contact.
///
/// # Returns
/// - 204 No Content
/// - 404 Not Found if the user has no such contact
pub async fn delete_contact(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.contacts.delete(&user_id, &id).await?;

    info!(
        subsystem = "api",
        component = "contacts",
        op = "delete",
        user_id = %user_id,
        contact_id = %id,
        "Contact deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Search a user's contacts.
///
/// # Query Parameters
/// - `id`: exact contact id
/// - `prefix`: prefix of any word of the name, case-insensitive
/// - `email`: exact email address, case-insensitive
/// - `index`: matches to skip (default 0)
/// - `count`: page size (default 5, at least 1)
///
/// # Returns
/// - 200 OK with the page, each contact wrapped with its self link, plus
///   `self` / `next` / `prev` links
/// - 400 Bad Request for a malformed `index` or `count`
pub async fn search_contacts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    url: RequestUrl,
    query: Result<Query<RawSearchParams>, QueryRejection>,
) -> Result<Json<Linked<Vec<Linked<Contact>>>>, ApiError> {
    let Query(raw) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let params = SearchParams::parse(raw)?;

    let start = Instant::now();
    let results = state
        .contacts
        .search(&params.to_lookahead_query(&user_id))
        .await?;

    debug!(
        subsystem = "api",
        component = "contacts",
        op = "search",
        user_id = %user_id,
        index = params.index,
        count = params.count,
        result_count = results.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Contacts searched"
    );

    Ok(Json(paginate(&url, &params, results)))
}

/// Answer any unrouted method/path combination.
pub async fn route_not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    ApiError::not_found(format!("{} not supported for {}", method, target))
}
