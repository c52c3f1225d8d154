#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Bytes served by the mock image route.
pub const CAT_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// A recorded `generateContent` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model_action: String,
    pub key: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct MockGemini {
    reply: Arc<Mutex<(u16, Value)>>,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockGemini {
    pub fn replying_text(text: &str) -> Self {
        let mock = Self::default();
        mock.set_reply(200, candidate(text));
        mock
    }

    pub fn set_reply(&self, status: u16, body: Value) {
        *self.reply.lock().unwrap() = (status, body);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Router exposing `/v1beta/models/{model}:generateContent` and `/images/cat.jpg`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1beta/models/:model_action", post(generate))
            .route("/images/cat.jpg", get(|| async { CAT_JPEG.to_vec() }))
            .route(
                "/images/missing.jpg",
                get(|| async { (StatusCode::NOT_FOUND, "not found") }),
            )
            .layer(DefaultBodyLimit::disable())
            .with_state(self.clone())
    }
}

pub fn candidate(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

async fn generate(
    State(mock): State<MockGemini>,
    Path(model_action): Path<String>,
    Query(query): Query<std::collections::HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.calls.lock().unwrap().push(RecordedCall {
        model_action,
        key: query.get("key").cloned(),
        body,
    });
    let (status, reply) = mock.reply.lock().unwrap().clone();
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(reply),
    )
}

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
