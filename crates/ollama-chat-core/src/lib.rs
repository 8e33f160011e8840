pub mod ai;
pub mod config;
pub mod controller;
pub mod state;

// Re-export main types for convenience
pub use ai::{ClientSettings, OllamaClient, Transport, TransportError, EMPTY_OUTPUT_PLACEHOLDER};
pub use config::Config;
pub use controller::{ChatController, PendingRequest, SubmitOutcome, Submission};
pub use state::{ConversationSnapshot, Message, MessageId, Sender, SEED_GREETING};
