
use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use super::{ChatMessage, ChatModel, Embedder};
use crate::config::OpenAiConfig;
use crate::{RagError, Result};

const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Blocking client for an OpenAI-compatible HTTP API
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a client; the key is supplied by the caller and never read
    /// from the environment here
    #[inline]
    pub fn new(config: &OpenAiConfig, api_key: impl Into<String>) -> Result<Self> {
        let mut base = config
            .api_url()
            .map_err(|e| RagError::Config(e.to_string()))?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let agent = ureq::Agent::config_builder()
            .timeout_global(config.timeout())
            .build()
            .into();

        Ok(Self {
            base_url: base,
            api_key: api_key.into(),
            agent,
            retry_attempts: config.retry_attempts.max(1),
        })
    }

    fn post_json<T: Serialize>(&self, endpoint: &str, body: &T) -> anyhow::Result<String> {
        let url = self
            .base_url
            .join(endpoint)
            .with_context(|| format!("Failed to build URL for {}", endpoint))?;
        let request_json =
            serde_json::to_string(body).context("Failed to serialize request body")?;
        let auth = format!("Bearer {}", self.api_key.trim());

        self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Authorization", &auth)
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .with_context(|| format!("Request to {} failed", url))
    }

    /// Embed a single input with the given model
    #[inline]
    pub fn embedding(&self, model: &str, input: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", input.len());

        let response_text = self
            .post_json("embeddings", &EmbeddingRequest { model, input })
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        let response: EmbeddingResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Embedding(format!("Malformed embedding response: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| RagError::Embedding("Response contained no embedding".to_string()))?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    /// Run a chat completion with the given model
    #[inline]
    pub fn chat_completion(
        &self,
        model: &str,
        temperature: Option<f32>,
        messages: &[ChatMessage],
    ) -> Result<String> {
        debug!(
            "Requesting completion from {} with {} messages",
            model,
            messages.len()
        );

        let request = ChatRequest {
            model,
            temperature,
            messages,
        };
        let response_text = self
            .post_json("chat/completions", &request)
            .map_err(|e| RagError::Completion(format!("{:#}", e)))?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Completion(format!("Malformed completion response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::Completion("Response contained no choices".to_string()))
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> anyhow::Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) if *status == 429 || *status >= 500 => {
                            warn!(
                                "Server error (status {}), attempt {}/{}",
                                status, attempt, self.retry_attempts
                            );
                            true
                        }
                        ureq::Error::StatusCode(status) => {
                            warn!("Client error (status {}), not retrying", status);
                            return Err(anyhow!("Client error: HTTP {}", status));
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => false,
                    };

                    if !should_retry {
                        return Err(anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay =
                            Duration::from_secs(EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1));
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        if self.retry_attempts > 1 {
            error!("All retry attempts failed for request to {}", self.base_url);
        }
        Err(last_error.unwrap_or_else(|| anyhow!("Request failed after retries")))
    }
}

/// [`Embedder`] backed by the embeddings endpoint
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
}

impl OpenAiEmbedder {
    #[inline]
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl Embedder for OpenAiEmbedder {
    /// Newlines are replaced with spaces before the text is sent
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = text.replace('\n', " ");
        self.client.embedding(&self.model, &input)
    }
}

/// [`ChatModel`] backed by the chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: OpenAiClient,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiChat {
    #[inline]
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: None,
        }
    }

    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl ChatModel for OpenAiChat {
    #[inline]
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.client
            .chat_completion(&self.model, self.temperature, messages)
    }
}
