use serde::{Deserialize, Serialize};

use crate::chat::Turn;

/// Request payload for the chat endpoint
#[derive(Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    /// Full conversation, oldest turn first
    pub messages: Vec<Turn>,
}

/// Successful response payload
#[derive(Debug, Deserialize, Serialize)]
pub struct ChatResponse {
    /// Text generated by the model
    pub text: String,
}

/// Error response payload, sent with a non-2xx status
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
