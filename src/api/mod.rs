//! HTTP server exposing the chat handler.
//!
//! Routes:
//! * `POST /api/chat` - generate a reply for a turn history
//! * `GET /` - browser chat page

mod handlers;
mod types;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::client::CHAT_PATH;
use crate::error::ChatError;
use crate::handler::ChatHandler;
use handlers::{handle_chat, index};

pub use handlers::ApiError;
pub use types::{ChatRequest, ChatResponse, ErrorResponse};

/// Main server struct wrapping the request handler
pub struct Server {
    handler: Arc<ChatHandler>,
}

/// Internal server state shared between request handlers
#[derive(Clone)]
struct ServerState {
    handler: Arc<ChatHandler>,
}

impl Server {
    pub fn new(handler: ChatHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Builds the axum router with all routes and layers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index))
            .route(CHAT_PATH, post(handle_chat))
            // Requests re-send the whole history, data URLs included.
            .layer(DefaultBodyLimit::disable())
            .layer(CorsLayer::permissive())
            .with_state(ServerState {
                handler: self.handler.clone(),
            })
    }

    /// Binds `addr` (e.g. "127.0.0.1:3000") and serves requests until the process stops.
    pub async fn run(self, addr: &str) -> Result<(), ChatError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ChatError::ConfigError(format!("failed to bind {}: {}", addr, e)))?;
        self.run_with_listener(listener).await
    }

    /// Serves requests on an already-bound listener.
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ChatError> {
        if let Ok(addr) = listener.local_addr() {
            log::info!("listening on http://{}", addr);
        }
        axum::serve(listener, self.router())
            .await
            .map_err(|e| ChatError::HttpError(e.to_string()))
    }
}
