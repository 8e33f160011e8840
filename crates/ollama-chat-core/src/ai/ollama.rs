use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Transport, TransportError, EMPTY_OUTPUT_PLACEHOLDER};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const DEFAULT_MODEL: &str = "mistral";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    output: Option<String>,
}

/// Where to send prompts and which model to ask for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub model: String,
    /// Passed to the server as `?timeout=`; the client itself never times out
    pub timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Client for the FastAPI wrapper around Ollama (`POST /generate`)
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    settings: ClientSettings,
}

impl OllamaClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.settings.server_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, TransportError> {
        let url = self.endpoint("/generate");

        // max_tokens and temperature of zero leave the choice to the server
        let request = GenerateRequest {
            prompt,
            model: &self.settings.model,
            max_tokens: 0,
            temperature: 0.0,
        };

        info!(
            url = %url,
            model = %self.settings.model,
            prompt_chars = prompt.chars().count(),
            "Sending prompt to inference server"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("timeout", self.settings.timeout_secs)])
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        debug!(model = ?parsed.model, "Received response from inference server");

        Ok(parsed
            .output
            .filter(|output| !output.is_empty())
            .unwrap_or_else(|| EMPTY_OUTPUT_PLACEHOLDER.to_string()))
    }
}

#[async_trait]
impl Transport for OllamaClient {
    async fn send(&self, prompt: &str) -> Result<String, TransportError> {
        self.generate(prompt).await
    }
}
