//! Client-side conversation state.
//!
//! [`Conversation`] holds the ordered turn history together with the pending
//! input, the pending image, the in-flight flag and the last error message.
//! It is independent of any UI toolkit: a front-end feeds it user actions and
//! renders its state.
//!
//! A submission is split in two halves so that callers driving their own event
//! loop can issue the request themselves:
//!
//! 1. [`Conversation::begin_submission`] appends the user turn and returns the
//!    payload to post.
//! 2. [`Conversation::finish_submission`] records the outcome.
//!
//! [`Conversation::submit`] runs both halves around a [`ChatTransport`].

use std::path::Path;

use async_trait::async_trait;

use super::{Turn, DEFAULT_IMAGE_PROMPT};
use crate::error::ChatError;
use crate::image;

/// Assistant turn appended whenever a submission fails.
pub const APOLOGY_MESSAGE: &str = "I apologize, but I encountered an error. Please try again.";

/// Transport used to post the turn history and receive the generated reply.
#[async_trait]
pub trait ChatTransport: Sync + Send {
    /// Posts the full turn history and returns the assistant text.
    async fn send(&self, turns: &[Turn]) -> Result<String, ChatError>;
}

/// Result of the first half of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The user turn was appended; post these turns
    Ready(Vec<Turn>),
    /// Nothing to send: no text and no image
    Empty,
    /// Another submission is still in flight
    Busy,
}

/// Final outcome of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was sent because the input was empty
    Empty,
    /// Rejected because a previous submission has not finished
    Busy,
    /// The assistant reply was appended
    Answered,
    /// The request failed; the apology turn was appended
    Failed(String),
}

/// In-memory state of one chat session.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    input: String,
    pending_image: Option<String>,
    in_flight: bool,
    error: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns in submission order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Image reference that will be attached to the next user turn.
    pub fn pending_image(&self) -> Option<&str> {
        self.pending_image.as_deref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Message for the error banner, if the last action failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replaces the pending input text and clears the error banner.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.error = None;
    }

    /// Sets the pending image to an already-encoded reference (data URL or remote URL).
    pub fn attach_image(&mut self, image_url: impl Into<String>) {
        self.pending_image = Some(image_url.into());
        self.error = None;
    }

    /// Reads a local image file into a data URL and makes it the pending image.
    ///
    /// Files whose type is not an allowed upload type are refused: the error
    /// banner is set and the pending image is left untouched.
    pub fn attach_image_file(&mut self, path: impl AsRef<Path>) -> Result<(), ChatError> {
        match image::read_image_file(path.as_ref()) {
            Ok(data_url) => {
                self.attach_image(data_url);
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.public_message());
                Err(e)
            }
        }
    }

    pub fn cancel_image(&mut self) {
        self.pending_image = None;
    }

    /// Appends the user turn built from the pending input and image.
    ///
    /// The turn is appended before any request is made; the input and the
    /// pending image are cleared and the conversation is marked in flight.
    pub fn begin_submission(&mut self) -> Submission {
        if self.in_flight {
            return Submission::Busy;
        }
        let blank = self.input.trim().is_empty();
        if blank && self.pending_image.is_none() {
            return Submission::Empty;
        }

        let text = std::mem::take(&mut self.input);
        let turn = match self.pending_image.take() {
            Some(image_url) if blank => Turn::user()
                .content(DEFAULT_IMAGE_PROMPT)
                .image_url(image_url)
                .build(),
            Some(image_url) => Turn::user().content(text).image_url(image_url).build(),
            None => Turn::user().content(text).build(),
        };

        log::debug!("submitting user turn {}", turn.id);
        self.turns.push(turn);
        self.error = None;
        self.in_flight = true;
        Submission::Ready(self.turns.clone())
    }

    /// Records the result of the request started by [`begin_submission`](Self::begin_submission).
    pub fn finish_submission(&mut self, result: Result<String, ChatError>) -> SubmitOutcome {
        self.in_flight = false;
        match result {
            Ok(text) => {
                self.turns.push(Turn::assistant().content(text).build());
                SubmitOutcome::Answered
            }
            Err(e) => {
                log::error!("chat request failed: {}", e);
                let message = e.public_message();
                self.error = Some(message.clone());
                self.turns.push(Turn::assistant().content(APOLOGY_MESSAGE).build());
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Submits the pending input through `transport`, issuing at most one request.
    pub async fn submit<T>(&mut self, transport: &T) -> SubmitOutcome
    where
        T: ChatTransport + ?Sized,
    {
        match self.begin_submission() {
            Submission::Ready(turns) => {
                let result = transport.send(&turns).await;
                self.finish_submission(result)
            }
            Submission::Empty => SubmitOutcome::Empty,
            Submission::Busy => SubmitOutcome::Busy,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::chat::{ChatRole, TurnContent};

    struct MockTransport {
        reply: Result<String, String>,
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<Turn>>>,
    }

    impl MockTransport {
        fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for MockTransport {
        async fn send(&self, turns: &[Turn]) -> Result<String, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(turns.to_vec());
            self.reply.clone().map_err(ChatError::ProviderError)
        }
    }

    #[tokio::test]
    async fn whitespace_input_without_image_sends_nothing() {
        let transport = MockTransport::ok("unused");
        let mut conversation = Conversation::new();
        conversation.set_input("   \n\t");

        let outcome = conversation.submit(&transport).await;

        assert_eq!(outcome, SubmitOutcome::Empty);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert!(conversation.turns().is_empty());
        assert_eq!(conversation.input(), "   \n\t");
        assert!(!conversation.is_in_flight());
    }

    #[tokio::test]
    async fn successful_submission_appends_user_then_assistant() {
        let transport = MockTransport::ok("hi there");
        let mut conversation = Conversation::new();
        conversation.set_input("hello");

        let outcome = conversation.submit(&transport).await;

        assert_eq!(outcome, SubmitOutcome::Answered);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        let turns = conversation.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[0].text(), "hello");
        assert_eq!(turns[1].role, ChatRole::Assistant);
        assert_eq!(turns[1].text(), "hi there");
        assert_eq!(conversation.input(), "");
        assert!(conversation.error().is_none());
        assert!(!conversation.is_in_flight());
    }

    #[tokio::test]
    async fn request_carries_full_history_plus_new_turn() {
        let transport = MockTransport::ok("fine");
        let mut conversation = Conversation::new();
        conversation.set_input("hello");
        conversation.submit(&transport).await;
        conversation.set_input("how are you?");
        conversation.submit(&transport).await;

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let texts: Vec<&str> = seen[1].iter().map(Turn::text).collect();
        assert_eq!(texts, vec!["hello", "fine", "how are you?"]);
    }

    #[tokio::test]
    async fn failed_submission_appends_apology_and_sets_banner() {
        let transport = MockTransport::failing("quota exceeded");
        let mut conversation = Conversation::new();
        conversation.set_input("hello");

        let outcome = conversation.submit(&transport).await;

        assert_eq!(outcome, SubmitOutcome::Failed("quota exceeded".into()));
        let turns = conversation.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text(), "hello");
        assert_eq!(turns[1].role, ChatRole::Assistant);
        assert_eq!(turns[1].text(), APOLOGY_MESSAGE);
        assert_eq!(conversation.error(), Some("quota exceeded"));
        assert!(!conversation.is_in_flight());
    }

    #[test]
    fn image_only_submission_uses_default_prompt() {
        let mut conversation = Conversation::new();
        conversation.attach_image("data:image/png;base64,AAAA");

        let Submission::Ready(turns) = conversation.begin_submission() else {
            panic!("expected a ready submission");
        };

        assert_eq!(
            turns[0].content,
            TurnContent::WithImage {
                text: DEFAULT_IMAGE_PROMPT.to_string(),
                image_url: Some("data:image/png;base64,AAAA".to_string()),
            }
        );
        assert!(conversation.pending_image().is_none());
    }

    #[test]
    fn multi_line_input_is_sent_verbatim() {
        let mut conversation = Conversation::new();
        conversation.set_input("\nfirst line\nsecond line\n");

        let Submission::Ready(turns) = conversation.begin_submission() else {
            panic!("expected a ready submission");
        };

        assert_eq!(turns[0].text(), "\nfirst line\nsecond line\n");
        assert_eq!(conversation.input(), "");
    }

    #[test]
    fn overlapping_submission_is_rejected() {
        let mut conversation = Conversation::new();
        conversation.set_input("first");
        assert!(matches!(
            conversation.begin_submission(),
            Submission::Ready(_)
        ));

        conversation.set_input("second");
        assert_eq!(conversation.begin_submission(), Submission::Busy);
        assert_eq!(conversation.turns().len(), 1);
        assert_eq!(conversation.input(), "second");

        conversation.finish_submission(Ok("done".into()));
        assert!(matches!(
            conversation.begin_submission(),
            Submission::Ready(_)
        ));
        assert_eq!(conversation.turns().len(), 3);
    }

    #[test]
    fn cancel_image_drops_pending_image() {
        let mut conversation = Conversation::new();
        conversation.attach_image("data:image/png;base64,AAAA");
        conversation.cancel_image();
        assert!(conversation.pending_image().is_none());
        assert_eq!(conversation.begin_submission(), Submission::Empty);
    }

    #[test]
    fn invalid_file_type_sets_banner_and_keeps_previous_image() {
        let mut file = tempfile::Builder::new().suffix(".gif").tempfile().unwrap();
        file.write_all(b"GIF89a....").unwrap();

        let mut conversation = Conversation::new();
        conversation.attach_image("data:image/png;base64,AAAA");
        assert!(conversation.attach_image_file(file.path()).is_err());

        assert_eq!(
            conversation.error(),
            Some("Invalid file type. Only PNG, JPEG, JPG, and WEBP are allowed.")
        );
        assert_eq!(
            conversation.pending_image(),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[test]
    fn typing_clears_the_error_banner() {
        let mut conversation = Conversation::new();
        conversation.finish_submission(Err(ChatError::HttpError("offline".into())));
        assert_eq!(conversation.error(), Some("offline"));
        conversation.set_input("retry");
        assert!(conversation.error().is_none());
    }
}
