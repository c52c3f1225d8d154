//! Server-side generation request handling.
//!
//! Turns a turn history into one generation call: the model is chosen from
//! the last turn, the prompt is the newline-joined text of every turn, and an
//! image on the last turn is resolved and attached inline as JPEG.

use std::sync::Arc;

use reqwest::Client;

use crate::chat::{build_prompt, GenerationProvider, GenerationRequest, ImageMime, InlineImage, Turn};
use crate::error::ChatError;
use crate::image;

/// Model used for both text-only and image requests unless configured otherwise.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// MIME type assumed for every attached image.
pub const INLINE_IMAGE_MIME: ImageMime = ImageMime::JPEG;

/// Model names used for text-only and image-bearing requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub text_model: String,
    pub vision_model: String,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            text_model: DEFAULT_MODEL.to_string(),
            vision_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ModelSelection {
    pub fn select(&self, has_image: bool) -> &str {
        if has_image {
            &self.vision_model
        } else {
            &self.text_model
        }
    }
}

/// Stateless handler shared by all requests.
#[derive(Clone)]
pub struct ChatHandler {
    provider: Arc<dyn GenerationProvider>,
    models: ModelSelection,
    http: Client,
}

impl ChatHandler {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            provider,
            models: ModelSelection::default(),
            http: Client::new(),
        }
    }

    pub fn with_models(mut self, models: ModelSelection) -> Self {
        self.models = models;
        self
    }

    /// Sets the client used to fetch remote images.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn models(&self) -> &ModelSelection {
        &self.models
    }

    /// Composes the generation request for `turns`.
    ///
    /// # Errors
    ///
    /// * [`ChatError::InvalidRequest`] if `turns` is empty
    /// * [`ChatError::ImageError`] if the last turn's image cannot be resolved
    pub async fn prepare(&self, turns: &[Turn]) -> Result<GenerationRequest, ChatError> {
        let last = turns
            .last()
            .ok_or_else(|| ChatError::InvalidRequest("messages must not be empty".to_string()))?;
        let image_url = last.image_url();
        let model = self.models.select(image_url.is_some()).to_string();
        let prompt = build_prompt(turns);

        let image = match image_url {
            Some(url) => {
                let data = image::load_image(&self.http, url).await.map_err(|e| {
                    log::error!("Image processing error: {}", e);
                    e
                })?;
                Some(InlineImage {
                    mime: INLINE_IMAGE_MIME,
                    data,
                })
            }
            None => None,
        };

        Ok(GenerationRequest {
            model,
            prompt,
            image,
        })
    }

    /// Runs one generation for `turns` and returns the model's text.
    ///
    /// # Errors
    ///
    /// Everything [`prepare`](Self::prepare) returns, provider failures as
    /// reported by the provider, and [`ChatError::EmptyResponse`] when the
    /// model produced no text.
    pub async fn handle(&self, turns: &[Turn]) -> Result<String, ChatError> {
        let request = self.prepare(turns).await?;
        log::debug!(
            "generating with {} ({} turns, image: {})",
            request.model,
            turns.len(),
            request.image.is_some()
        );

        let text = self.provider.generate(&request).await.map_err(|e| {
            log::error!("Model generation error: {}", e);
            e
        })?;

        if text.is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        Ok(text)
    }
}
