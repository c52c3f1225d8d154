use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};

use super::types::{ChatRequest, ChatResponse, ErrorResponse};
use super::ServerState;
use crate::error::ChatError;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Error returned by the chat endpoint.
///
/// Every failure is reported as `500` with a `{"error": "..."}` body.
#[derive(Debug)]
pub struct ApiError(String);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError(err.public_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: self.0 }),
        )
            .into_response()
    }
}

/// Handles chat requests to the API server
///
/// # Request Format
/// `{"messages": [Turn, ...]}`; the last turn decides whether an image is sent.
///
/// # Response Format
/// * `200 {"text": "..."}` with the generated text
/// * `500 {"error": "..."}` on any failure, including a malformed body
pub async fn handle_chat(
    State(state): State<ServerState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = body.map_err(|rejection| {
        log::error!("Error in chat API: {}", rejection.body_text());
        ApiError(rejection.body_text())
    })?;

    let text = state.handler.handle(&req.messages).await.map_err(|e| {
        log::error!("Error in chat API: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(ChatResponse { text }))
}

/// Serves the single-page browser client.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
