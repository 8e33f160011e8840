//! Conversation controller
//!
//! Owns the message list and the loading flag. Front ends either await
//! [`ChatController::submit`] directly, or split it into
//! [`ChatController::begin`] and [`ChatController::complete`] so the
//! transport call can run off the event loop.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::ai::{Transport, TransportError};
use crate::state::{ConversationSnapshot, IdGenerator, Message, MessageId, SEED_GREETING};

/// Result of trying to start a submission
#[derive(Debug)]
pub enum Submission {
    /// Input was empty after trimming; nothing happened
    Skipped,
    /// A request is already in flight; nothing happened
    Busy,
    /// User message appended and loading set; the ticket must be completed
    Dispatched(PendingRequest),
}

/// Result of a full `submit` round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Skipped,
    Busy,
    /// The assistant-slot message that was appended
    Replied(MessageId),
}

/// Ticket for a request in flight.
///
/// Not `Clone`: each ticket completes exactly once.
#[derive(Debug)]
pub struct PendingRequest {
    prompt: String,
    epoch: u64,
}

impl PendingRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

pub struct ChatController {
    transport: Arc<dyn Transport>,
    server_url: String,
    messages: Vec<Message>,
    is_loading: bool,
    ids: IdGenerator,
    epoch: u64,
}

impl ChatController {
    pub fn new(transport: Arc<dyn Transport>, server_url: impl Into<String>) -> Self {
        let mut ids = IdGenerator::new();
        let seed = Message::assistant(ids.next_id(), SEED_GREETING);
        Self {
            transport,
            server_url: server_url.into(),
            messages: vec![seed],
            is_loading: false,
            ids,
            epoch: 0,
        }
    }

    pub fn snapshot(&self) -> ConversationSnapshot<'_> {
        ConversationSnapshot {
            messages: &self.messages,
            is_loading: self.is_loading,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Only the seed greeting is present
    pub fn is_fresh(&self) -> bool {
        self.messages.len() <= 1
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Append the user message and mark the conversation as loading.
    ///
    /// The stored message is trimmed; the ticket carries the text as typed.
    pub fn begin(&mut self, text: &str) -> Submission {
        let content = text.trim();
        if content.is_empty() {
            return Submission::Skipped;
        }
        if self.is_loading {
            debug!("Submission rejected while a request is in flight");
            return Submission::Busy;
        }

        let message = Message::user(self.ids.next_id(), content);
        debug!(id = %message.id, chars = content.chars().count(), "Appended user message");
        self.messages.push(message);
        self.is_loading = true;

        Submission::Dispatched(PendingRequest {
            prompt: text.to_string(),
            epoch: self.epoch,
        })
    }

    /// Record the outcome of a request started with [`begin`](Self::begin).
    ///
    /// Always clears the loading flag. Returns `None` when the conversation
    /// was reset while the request was in flight; the reply is dropped.
    pub fn complete(
        &mut self,
        ticket: PendingRequest,
        result: Result<String, TransportError>,
    ) -> Option<&Message> {
        self.is_loading = false;

        if ticket.epoch != self.epoch {
            info!("Discarding reply for a conversation that has since been reset");
            return None;
        }

        Some(self.record_reply(result))
    }

    fn record_reply(&mut self, result: Result<String, TransportError>) -> &Message {
        let message = match result {
            Ok(reply) => Message::assistant(self.ids.next_id(), reply),
            Err(err) => {
                warn!(error = %err, "Request to inference server failed");
                Message::error(self.ids.next_id(), self.error_guidance())
            }
        };
        let index = self.messages.len();
        self.messages.push(message);
        &self.messages[index]
    }

    /// Submit and wait for the reply.
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        let ticket = match self.begin(text) {
            Submission::Skipped => return SubmitOutcome::Skipped,
            Submission::Busy => return SubmitOutcome::Busy,
            Submission::Dispatched(ticket) => ticket,
        };

        let transport = self.transport();
        let result = transport.send(ticket.prompt()).await;

        // &mut self is held across the await, so no reset can have happened
        self.is_loading = false;
        SubmitOutcome::Replied(self.record_reply(result).id)
    }

    /// Back to the single seed greeting. The loading flag is left alone.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.messages = vec![Message::assistant(self.ids.next_id(), SEED_GREETING)];
        info!("Conversation reset");
    }

    fn error_guidance(&self) -> String {
        format!(
            "Sorry, I encountered an error while processing your message. \
             Please make sure your Ollama FastAPI server is running on {}",
            self.server_url
        )
    }
}
