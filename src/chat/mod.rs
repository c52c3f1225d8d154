use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatError;

pub mod conversation;

pub use conversation::{ChatTransport, Conversation, Submission, SubmitOutcome, APOLOGY_MESSAGE};

/// Text used for a user turn that only carries an image.
pub const DEFAULT_IMAGE_PROMPT: &str = "What do you see in this image?";

/// Role of a participant in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The user/human participant in the conversation
    User,
    /// The AI assistant participant in the conversation
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// The supported MIME type of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageMime {
    /// JPEG image
    JPEG,
    /// PNG image
    PNG,
    /// GIF image
    GIF,
    /// WebP image
    WEBP,
}

impl ImageMime {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageMime::JPEG => "image/jpeg",
            ImageMime::PNG => "image/png",
            ImageMime::GIF => "image/gif",
            ImageMime::WEBP => "image/webp",
        }
    }
}

/// Content of a turn: plain text, or text paired with an image reference.
///
/// Serialized untagged so that the wire shape is either `"hello"` or
/// `{"text": "...", "image_url": "data:image/png;base64,..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    /// Plain text content
    Text(String),
    /// Text with an attached image reference (data URL or remote URL)
    WithImage {
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
}

impl TurnContent {
    /// Textual portion of the content.
    pub fn text(&self) -> &str {
        match self {
            TurnContent::Text(text) => text,
            TurnContent::WithImage { text, .. } => text,
        }
    }

    /// Image reference, if one is attached and non-empty.
    pub fn image_url(&self) -> Option<&str> {
        match self {
            TurnContent::Text(_) => None,
            TurnContent::WithImage { image_url, .. } => {
                image_url.as_deref().filter(|url| !url.is_empty())
            }
        }
    }
}

/// A single message exchanged in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Opaque identifier, unique within a session
    #[serde(default)]
    pub id: String,
    /// The role of who sent this turn
    pub role: ChatRole,
    /// The content of the turn
    pub content: TurnContent,
}

impl Turn {
    /// Create a new builder for a user turn
    pub fn user() -> TurnBuilder {
        TurnBuilder::new(ChatRole::User)
    }

    /// Create a new builder for an assistant turn
    pub fn assistant() -> TurnBuilder {
        TurnBuilder::new(ChatRole::Assistant)
    }

    pub fn text(&self) -> &str {
        self.content.text()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.content.image_url()
    }
}

/// Builder for Turn
#[derive(Debug)]
pub struct TurnBuilder {
    id: Option<String>,
    role: ChatRole,
    text: String,
    image_url: Option<String>,
}

impl TurnBuilder {
    /// Create a new TurnBuilder with specified role
    pub fn new(role: ChatRole) -> Self {
        Self {
            id: None,
            role,
            text: String::new(),
            image_url: None,
        }
    }

    /// Set an explicit identifier instead of a generated one
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the text content
    pub fn content<S: Into<String>>(mut self, content: S) -> Self {
        self.text = content.into();
        self
    }

    /// Attach an image reference
    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Build the Turn
    pub fn build(self) -> Turn {
        let content = match self.image_url {
            Some(image_url) => TurnContent::WithImage {
                text: self.text,
                image_url: Some(image_url),
            },
            None => TurnContent::Text(self.text),
        };
        Turn {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            role: self.role,
            content,
        }
    }
}

/// Concatenates the textual content of every turn, in order, separated by newlines.
pub fn build_prompt(turns: &[Turn]) -> String {
    turns.iter().map(Turn::text).collect::<Vec<_>>().join("\n")
}

/// Raw image bytes sent inline alongside the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime: ImageMime,
    pub data: Vec<u8>,
}

/// A single generation call: model name, prompt, and optional inline image.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier (e.g. "gemini-1.5-flash")
    pub model: String,
    /// Concatenated conversation text
    pub prompt: String,
    /// Image attached to the last turn, if any
    pub image: Option<InlineImage>,
}

/// Trait for providers that can generate text from a prompt and an optional image.
#[async_trait]
pub trait GenerationProvider: Sync + Send {
    /// Sends one generation request to the provider.
    ///
    /// # Returns
    ///
    /// The generated text (possibly empty) or an error
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_joins_turn_text_with_newlines() {
        let turns = vec![
            Turn::user().content("hello").build(),
            Turn::assistant().content("hi there").build(),
            Turn::user().content("how are you?").build(),
        ];
        assert_eq!(build_prompt(&turns), "hello\nhi there\nhow are you?");
    }

    #[test]
    fn prompt_uses_text_field_of_structured_content() {
        let turns = vec![
            Turn::user().content("hello").build(),
            Turn::user()
                .content("what is this?")
                .image_url("data:image/png;base64,AAAA")
                .build(),
        ];
        assert_eq!(build_prompt(&turns), "hello\nwhat is this?");
    }

    #[test]
    fn content_deserializes_from_both_shapes() {
        let plain: Turn =
            serde_json::from_str(r#"{"id":"1","role":"user","content":"hi"}"#).unwrap();
        assert_eq!(plain.content, TurnContent::Text("hi".into()));

        let structured: Turn = serde_json::from_str(
            r#"{"id":"2","role":"user","content":{"text":"look","image_url":"https://x/y.jpg"}}"#,
        )
        .unwrap();
        assert_eq!(structured.text(), "look");
        assert_eq!(structured.image_url(), Some("https://x/y.jpg"));
    }

    #[test]
    fn structured_content_without_text_contributes_empty_line() {
        let turn: Turn =
            serde_json::from_str(r#"{"role":"user","content":{"image_url":"https://x"}}"#)
                .unwrap();
        assert_eq!(turn.text(), "");
        assert_eq!(turn.id, "");
    }

    #[test]
    fn empty_image_url_counts_as_no_image() {
        let turn = Turn::user().content("hi").image_url("").build();
        assert_eq!(turn.image_url(), None);
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = Turn::user().content("a").build();
        let b = Turn::user().content("a").build();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn role_serializes_lowercase() {
        let turn = Turn::assistant().id("7").content("ok").build();
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "ok");
    }
}
