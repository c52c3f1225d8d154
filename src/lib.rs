//! visionchat forwards chat text and an optional image to Google Gemini.
//!
//! # Overview
//! The crate has two halves that meet over one HTTP endpoint:
//!
//! - A client-side [`chat::Conversation`] holding the turn history, pending
//!   input and pending image, which posts the whole history on each
//!   submission and appends the reply (or a fixed apology on failure).
//! - A server-side [`handler::ChatHandler`] which joins the text of every turn
//!   into one prompt, resolves an image attached to the last turn, and makes a
//!   single Gemini `generateContent` call.
//!
//! The `api` feature exposes the handler over axum as `POST /api/chat`;
//! [`client::HttpTransport`] is the matching client transport.

// Re-export for convenience
pub use async_trait::async_trait;

/// Backend implementations for generation providers
pub mod backends;

/// Builder pattern for configuring the Gemini provider
pub mod builder;

/// Turns, prompt construction and the client conversation state
pub mod chat;

/// HTTP client transport for the chat endpoint
pub mod client;

/// Environment-driven server configuration
pub mod config;

/// Error types and handling
pub mod error;

/// Generation request handler
pub mod handler;

/// Image references: data URLs, remote fetches, upload validation
pub mod image;

/// Local store for API keys
pub mod secret_store;

#[cfg(feature = "api")]
pub mod api;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
/// This is a no-op if the feature is not enabled.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
