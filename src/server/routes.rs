use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::nonce::SEARCH_ACTION;
use crate::search::{search_items, SearchRequest, SearchResponse};
use crate::server::AppState;

/// Header carrying the id of the user authenticated upstream
pub const USER_HEADER: &str = "x-user-id";
pub const NONCE_HEADER: &str = "x-wp-nonce";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "rest_forbidden",
            "Sorry, you are not allowed to do that.",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Logged-in user plus a valid search nonce, from the body or the header
fn check_permission(state: &AppState, headers: &HeaderMap, body_nonce: Option<&str>) -> Result<(), ApiError> {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);
    if user_id == 0 {
        tracing::warn!("search rejected: anonymous caller");
        return Err(ApiError::forbidden());
    }

    let nonce = body_nonce
        .or_else(|| headers.get(NONCE_HEADER).and_then(|v| v.to_str().ok()))
        .unwrap_or_default();
    if !state.nonces.verify(nonce, SEARCH_ACTION, user_id) {
        tracing::warn!(user_id, "search rejected: invalid nonce");
        return Err(ApiError::forbidden());
    }

    Ok(())
}

/// Body as a search request; an empty body means all defaults
fn parse_request(body: &[u8]) -> Result<SearchRequest, serde_json::Error> {
    if body.trim_ascii().is_empty() {
        return Ok(SearchRequest::default());
    }
    serde_json::from_slice(body)
}

/// The body is read raw so the permission check runs before any parse error
/// is reported.
pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    let parsed = parse_request(&body);
    let body_nonce = parsed.as_ref().ok().and_then(|r| r.nonce.as_deref());
    check_permission(&state, &headers, body_nonce)?;

    let request = parsed
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, "rest_invalid_json", e.to_string()))?;

    let config = &state.ctx.config;
    let store = state.store.lock().await;
    let response = search_items(&store, &config.content_types, config.per_page, &request)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "search_failed", e.to_string()))?;

    Ok(Json(response))
}
