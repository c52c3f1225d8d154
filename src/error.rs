use std::fmt;

/// Message reported for every failure while resolving the image of the last turn.
pub const IMAGE_ERROR_MESSAGE: &str = "Failed to process image";

/// Message reported when the model answers with no text at all.
pub const EMPTY_RESPONSE_MESSAGE: &str = "Empty response from Gemini API";

/// Error types that can occur while composing or forwarding a chat request.
#[derive(Debug)]
pub enum ChatError {
    /// Missing or unusable configuration (e.g. no API key)
    ConfigError(String),
    /// The image referenced by the last turn could not be fetched or decoded
    ImageError(String),
    /// The model returned no text
    EmptyResponse,
    /// Errors returned by the generation provider
    ProviderError(String),
    /// Invalid request parameters or format
    InvalidRequest(String),
    /// HTTP request/response errors
    HttpError(String),
    /// JSON serialization/deserialization errors
    JsonError(String),
}

impl ChatError {
    /// Message exposed to API callers, without the internal category prefix.
    ///
    /// Image failures always collapse to [`IMAGE_ERROR_MESSAGE`]; the underlying
    /// cause is only logged.
    pub fn public_message(&self) -> String {
        match self {
            ChatError::ConfigError(e)
            | ChatError::ProviderError(e)
            | ChatError::InvalidRequest(e)
            | ChatError::HttpError(e)
            | ChatError::JsonError(e) => e.clone(),
            ChatError::ImageError(_) => IMAGE_ERROR_MESSAGE.to_string(),
            ChatError::EmptyResponse => EMPTY_RESPONSE_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::ConfigError(e) => write!(f, "Config Error: {}", e),
            ChatError::ImageError(e) => write!(f, "{}: {}", IMAGE_ERROR_MESSAGE, e),
            ChatError::EmptyResponse => write!(f, "{}", EMPTY_RESPONSE_MESSAGE),
            ChatError::ProviderError(e) => write!(f, "Provider Error: {}", e),
            ChatError::InvalidRequest(e) => write!(f, "Invalid Request: {}", e),
            ChatError::HttpError(e) => write!(f, "HTTP Error: {}", e),
            ChatError::JsonError(e) => write!(f, "JSON Parse Error: {}", e),
        }
    }
}

impl std::error::Error for ChatError {}

/// Converts reqwest HTTP errors into ChatErrors
impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::JsonError(err.to_string())
    }
}
