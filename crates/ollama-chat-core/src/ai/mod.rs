pub mod ollama;

pub use ollama::{ClientSettings, OllamaClient};

use async_trait::async_trait;
use thiserror::Error;

/// Reply substituted when the server answers without usable output
pub const EMPTY_OUTPUT_PLACEHOLDER: &str = "No response received from the model.";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("inference server returned HTTP status {0}")]
    Status(u16),
    #[error("failed to reach inference server: {0}")]
    Request(#[from] reqwest::Error),
    #[error("inference server returned an invalid body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One prompt in, one reply out.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, prompt: &str) -> Result<String, TransportError>;
}
