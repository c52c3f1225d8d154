//! Google Gemini API client.
//!
//! Sends a single `generateContent` request carrying the concatenated prompt
//! and, when present, one inline base64 image.
//!
//! # Example
//! ```no_run
//! use visionchat::builder::GoogleBuilder;
//! use visionchat::chat::{GenerationProvider, GenerationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GoogleBuilder::new()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .temperature(0.7)
//!         .build()?;
//!
//!     let request = GenerationRequest {
//!         model: "gemini-1.5-flash".into(),
//!         prompt: "Hello!".into(),
//!         image: None,
//!     };
//!     println!("{}", client.generate(&request).await?);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    chat::{GenerationProvider, GenerationRequest},
    error::ChatError,
};

/// Default REST endpoint of the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for Google's Gemini API.
pub struct Google {
    /// API key for authentication with Google's API
    pub api_key: String,
    /// Base URL of the REST API, without trailing slash
    pub base_url: String,
    /// Maximum number of tokens to generate in responses
    pub max_tokens: Option<u32>,
    /// Sampling temperature between 0.0 and 1.0
    pub temperature: Option<f32>,
    /// Optional system instruction
    pub system: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: Option<u64>,
    /// Top-p sampling parameter
    pub top_p: Option<f32>,
    /// Top-k sampling parameter
    pub top_k: Option<u32>,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleGenerateRequest<'a> {
    contents: Vec<GoogleContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GoogleSystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GoogleGenerationConfig>,
}

#[derive(Serialize)]
struct GoogleContent<'a> {
    role: &'a str,
    parts: Vec<GoogleContentPart<'a>>,
}

#[derive(Serialize)]
struct GoogleSystemInstruction<'a> {
    parts: Vec<GoogleContentPart<'a>>,
}

/// Either a text part or an inline binary part.
#[derive(Serialize)]
#[serde(untagged)]
enum GoogleContentPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: GoogleInlineData<'a> },
}

#[derive(Serialize)]
struct GoogleInlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

#[derive(Deserialize)]
struct GoogleGenerateResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    #[serde(default)]
    content: Option<GoogleResponseContent>,
}

#[derive(Deserialize)]
struct GoogleResponseContent {
    #[serde(default)]
    parts: Vec<GoogleResponsePart>,
}

#[derive(Deserialize)]
struct GoogleResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorDetail,
}

#[derive(Deserialize)]
struct GoogleErrorDetail {
    message: String,
}

impl Google {
    /// Creates a new Gemini client.
    ///
    /// `base_url` defaults to [`DEFAULT_BASE_URL`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
        system: Option<String>,
        top_p: Option<f32>,
        top_k: Option<u32>,
    ) -> Result<Self, ChatError> {
        let mut builder = Client::builder();
        if let Some(sec) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(sec));
        }
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_tokens,
            temperature,
            system,
            timeout_seconds,
            top_p,
            top_k,
            client: builder.build()?,
        })
    }

    fn generation_config(&self) -> Option<GoogleGenerationConfig> {
        // Gemini rejects an empty generationConfig object
        if self.max_tokens.is_none()
            && self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
        {
            return None;
        }
        Some(GoogleGenerationConfig {
            max_output_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
        })
    }
}

#[async_trait]
impl GenerationProvider for Google {
    /// Sends a `generateContent` request and returns the concatenated text of
    /// the first candidate. A reply without candidates yields an empty string.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ChatError> {
        if self.api_key.is_empty() {
            return Err(ChatError::ConfigError(
                "GEMINI_API_KEY is not configured".to_string(),
            ));
        }

        let mut parts = vec![GoogleContentPart::Text {
            text: &request.prompt,
        }];
        if let Some(image) = &request.image {
            parts.push(GoogleContentPart::InlineData {
                inline_data: GoogleInlineData {
                    mime_type: image.mime.mime_type(),
                    data: STANDARD.encode(&image.data),
                },
            });
        }

        let req_body = GoogleGenerateRequest {
            contents: vec![GoogleContent {
                role: "user",
                parts,
            }],
            system_instruction: self.system.as_deref().map(|system| GoogleSystemInstruction {
                parts: vec![GoogleContentPart::Text { text: system }],
            }),
            generation_config: self.generation_config(),
        };

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(&req_body) {
                log::trace!("Google request payload: {}", json);
            }
        }

        let url = format!(
            "{base}/models/{model}:generateContent",
            base = self.base_url,
            model = request.model
        );

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&req_body)
            .send()
            .await?;

        log::debug!("Google HTTP status: {}", resp.status());

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("Gemini API returned HTTP {}: {}", status, body));
            return Err(ChatError::ProviderError(message));
        }

        let json_resp: GoogleGenerateResponse = resp.json().await?;
        let text = json_resp
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn image_part_is_serialized_as_inline_data() {
        let body = GoogleGenerateRequest {
            contents: vec![GoogleContent {
                role: "user",
                parts: vec![
                    GoogleContentPart::Text { text: "describe" },
                    GoogleContentPart::InlineData {
                        inline_data: GoogleInlineData {
                            mime_type: "image/jpeg",
                            data: STANDARD.encode(b"abc"),
                        },
                    },
                ],
            }],
            system_instruction: None,
            generation_config: None,
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "describe"},
                        {"inline_data": {"mime_type": "image/jpeg", "data": "YWJj"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn generation_config_is_omitted_when_unset() {
        let google = Google::new("key", None, None, None, None, None, None, None).unwrap();
        assert!(google.generation_config().is_none());

        let google = Google::new("key", None, Some(256), None, None, None, Some(0.9), None).unwrap();
        let config = serde_json::to_value(google.generation_config()).unwrap();
        assert_eq!(config, json!({"maxOutputTokens": 256, "topP": 0.9f32}));
    }

    #[tokio::test]
    async fn missing_key_is_a_config_error() {
        let google = Google::new("", None, None, None, None, None, None, None).unwrap();
        let request = GenerationRequest {
            model: "gemini-1.5-flash".into(),
            prompt: "hi".into(),
            image: None,
        };
        let err = google.generate(&request).await.unwrap_err();
        assert!(matches!(err, ChatError::ConfigError(_)));
    }
}
