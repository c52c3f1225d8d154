//! Server configuration read from the environment.
//!
//! | Variable              | Meaning                                   | Default            |
//! |-----------------------|-------------------------------------------|--------------------|
//! | `GEMINI_API_KEY`      | provider credential (required)            | secret store       |
//! | `VISIONCHAT_ADDR`     | listen address                            | `127.0.0.1:3000`   |
//! | `GEMINI_MODEL`        | model for text-only requests              | `gemini-1.5-flash` |
//! | `GEMINI_VISION_MODEL` | model for requests carrying an image      | `gemini-1.5-flash` |
//! | `GEMINI_BASE_URL`     | REST endpoint                             | public Gemini API  |
//! | `GEMINI_TIMEOUT_SECS` | per-request timeout                       | none               |

use std::sync::Arc;

use crate::builder::GoogleBuilder;
use crate::error::ChatError;
use crate::handler::{ChatHandler, ModelSelection};
use crate::secret_store::SecretStore;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const ADDR_ENV: &str = "VISIONCHAT_ADDR";
pub const MODEL_ENV: &str = "GEMINI_MODEL";
pub const VISION_MODEL_ENV: &str = "GEMINI_VISION_MODEL";
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";
pub const TIMEOUT_ENV: &str = "GEMINI_TIMEOUT_SECS";

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub addr: String,
    /// Gemini API key
    pub api_key: String,
    pub models: ModelSelection,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl ServerConfig {
    /// Reads the configuration from the process environment, falling back to
    /// the local secret store for the API key.
    pub fn from_env() -> Result<Self, ChatError> {
        let store = SecretStore::new()
            .map_err(|e| log::debug!("secret store unavailable: {}", e))
            .ok();
        Self::from_lookup(|key| std::env::var(key).ok(), store.as_ref())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// [`ChatError::ConfigError`] if no API key is available or the timeout is
    /// not a number.
    pub fn from_lookup<F>(lookup: F, store: Option<&SecretStore>) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var(API_KEY_ENV)
            .or_else(|| store.and_then(|s| s.get(API_KEY_ENV).cloned()))
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ChatError::ConfigError(format!("{} is not configured", API_KEY_ENV)))?;

        let defaults = ModelSelection::default();
        let text_model = var(MODEL_ENV).unwrap_or(defaults.text_model);
        let vision_model = var(VISION_MODEL_ENV).unwrap_or(defaults.vision_model);

        let timeout_seconds = var(TIMEOUT_ENV)
            .map(|v| {
                v.trim().parse::<u64>().map_err(|_| {
                    ChatError::ConfigError(format!("{} must be a number of seconds", TIMEOUT_ENV))
                })
            })
            .transpose()?;

        Ok(Self {
            addr: var(ADDR_ENV).unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            api_key,
            models: ModelSelection {
                text_model,
                vision_model,
            },
            base_url: var(BASE_URL_ENV),
            timeout_seconds,
        })
    }

    /// Builds the request handler backed by the Gemini provider.
    pub fn build_handler(&self) -> Result<ChatHandler, ChatError> {
        let mut builder = GoogleBuilder::new().api_key(self.api_key.clone());
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url.clone());
        }
        if let Some(timeout) = self.timeout_seconds {
            builder = builder.timeout_seconds(timeout);
        }
        let provider = builder.build()?;
        Ok(ChatHandler::new(Arc::new(provider)).with_models(self.models.clone()))
    }
}
