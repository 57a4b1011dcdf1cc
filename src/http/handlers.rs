//! Key service route handlers.
//!
//! Create/update policy ("only if absent", "only if present") lives here;
//! the store only offers the atomic primitives.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

use crate::http::envelope::{ApiError, Envelope, KeyRequest, KeysRequest};
use crate::store::{KeyStore, Mutated};

/// Shared state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<KeyStore>,
}

/// Method and path of every route, as listed by the index route.
pub const ROUTES: &[(&str, &str)] = &[
    ("DELETE", "/key/{key}"),
    ("GET", "/key/{key}"),
    ("POST", "/key"),
    ("PUT", "/key/{key}"),
    ("POST", "/keys"),
    ("ANY", "/"),
];

/// Route table with the 404 fallback, without middleware.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/key/{key}", get(get_key).put(update_key).delete(delete_key))
        .route("/key", post(create_key))
        .route("/keys", post(get_many))
        .route("/", any(route_index))
        .fallback(no_route)
        .method_not_allowed_fallback(no_route)
        .with_state(state)
}

/// A key is valid when query-escaping leaves it unchanged: ASCII letters,
/// digits and the unreserved marks `-`, `_`, `.` and `~`.
pub fn is_valid_key(key: &str) -> bool {
    key.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
}

fn mutated(status: StatusCode) -> Response {
    (status, Extension(Mutated), Json(Envelope::ok())).into_response()
}

pub async fn get_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Envelope>, ApiError> {
    state
        .store
        .get(&key)
        .map(|value| Json(Envelope::text(value)))
        .ok_or(ApiError::NotFound)
}

pub async fn get_many(
    State(state): State<AppState>,
    body: Result<Json<KeysRequest>, JsonRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let Json(request) = body?;
    Ok(Json(Envelope::pairs(state.store.get_many(&request.keys))))
}

pub async fn create_key(
    State(state): State<AppState>,
    body: Result<Json<KeyRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;

    if !is_valid_key(&request.key) {
        return Err(ApiError::InvalidKey);
    }
    if !state.store.insert_if_absent(&request.key, &request.value) {
        return Err(ApiError::Conflict);
    }

    tracing::info!(key = %request.key, "Key created");
    Ok(mutated(StatusCode::CREATED))
}

/// The key in the body selects the entry; the path segment is not consulted.
pub async fn update_key(
    State(state): State<AppState>,
    Path(_id): Path<String>,
    body: Result<Json<KeyRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;

    if !state.store.update_if_present(&request.key, &request.value) {
        return Err(ApiError::NotFound);
    }

    tracing::info!(key = %request.key, "Key updated");
    Ok(mutated(StatusCode::OK))
}

pub async fn delete_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    if !state.store.delete(&key) {
        return Err(ApiError::NotFound);
    }

    tracing::info!(key = %key, "Key deleted");
    Ok(mutated(StatusCode::OK))
}

/// Pretty-printed JSON list of `"METHOD - PATH"` lines, longest path first.
pub async fn route_index() -> impl IntoResponse {
    let body = serde_json::to_string_pretty(&route_listing()).unwrap_or_else(|_| "[]".into());
    ([(header::CONTENT_TYPE, "application/json")], body)
}

fn route_listing() -> Vec<String> {
    let method_width = ROUTES.iter().map(|(m, _)| m.len()).max().unwrap_or(0);
    let path_width = ROUTES.iter().map(|(_, p)| p.len()).max().unwrap_or(0);

    let mut routes = ROUTES.to_vec();
    routes.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    routes
        .into_iter()
        .map(|(method, path)| format!("{method:<method_width$} - {path:<path_width$}"))
        .collect()
}

pub async fn no_route() -> ApiError {
    ApiError::RouteNotFound
}
