
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::http::HttpClient;
use super::{Embedder, LanguageModel};
use crate::RagError;
use crate::config::Config;

/// Client for the OpenAI API and servers that mimic it
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    temperature: f32,
    batch_size: u32,
    http: HttpClient,
}

impl std::fmt::Debug for OpenAiClient {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a client, reading the API key from the configured environment variable
    #[inline]
    pub fn from_env(config: &Config) -> crate::Result<Self> {
        let variable = &config.openai.api_key_env;
        let api_key = std::env::var(variable)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                RagError::Config(format!(
                    "environment variable {variable} is not set; it must hold the API key"
                ))
            })?;

        Ok(Self::new(config, api_key)?)
    }

    #[inline]
    pub fn new(config: &Config, api_key: String) -> Result<Self> {
        let base_url = config
            .openai
            .api_url()
            .context("Failed to parse OpenAI base URL from config")?;

        Ok(Self {
            base_url,
            api_key,
            embedding_model: config.openai.embedding_model.clone(),
            chat_model: config.openai.chat_model.clone(),
            temperature: config.generation.temperature,
            batch_size: config.openai.batch_size,
            http: HttpClient::new(config.requests.timeout(), config.requests.attempts()),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http.set_timeout(Some(timeout));
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.http.set_retry_attempts(attempts);
        self
    }

    /// Generate embeddings for multiple texts, split into batches
    #[inline]
    pub fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self
            .base_url
            .join("embeddings")
            .context("Failed to build embeddings URL")?;

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1) as usize) {
            let request = EmbeddingRequest {
                model: &self.embedding_model,
                input: batch,
            };

            let response_text = self
                .http
                .post_json(&url, &request, Some(self.api_key.as_str()))
                .with_context(|| format!("Failed to embed batch of {} texts", batch.len()))?;

            let mut response: EmbeddingResponse = serde_json::from_str(&response_text)
                .context("Failed to parse embeddings response")?;

            if response.data.len() != batch.len() {
                return Err(anyhow::anyhow!(
                    "Mismatch between request and response counts: {} vs {}",
                    batch.len(),
                    response.data.len()
                ));
            }

            response.data.sort_by_key(|data| data.index);
            results.extend(response.data.into_iter().map(|data| data.embedding));
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    /// Generate a chat completion for a single user message
    #[inline]
    pub fn generate_text(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join("chat/completions")
            .context("Failed to build chat completions URL")?;

        let request = ChatRequest {
            model: &self.chat_model,
            temperature: self.temperature,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(
            "Generating answer with {} (prompt length: {})",
            self.chat_model,
            prompt.len()
        );

        let response_text = self
            .http
            .post_json(&url, &request, Some(self.api_key.as_str()))
            .context("Failed to generate chat completion")?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .context("Failed to parse chat completion response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Chat completion contained no message content"))
    }
}

impl Embedder for OpenAiClient {
    #[inline]
    fn model_name(&self) -> &str {
        &self.embedding_model
    }

    #[inline]
    fn batch_size(&self) -> usize {
        self.batch_size.max(1) as usize
    }

    #[inline]
    fn embed_documents(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        self.generate_embeddings(texts)
            .map_err(|e| RagError::EmbeddingService(format!("{e:#}")))
    }
}

impl LanguageModel for OpenAiClient {
    #[inline]
    fn model_name(&self) -> &str {
        &self.chat_model
    }

    #[inline]
    fn generate(&self, prompt: &str) -> crate::Result<String> {
        self.generate_text(prompt)
            .map_err(|e| RagError::Generation(format!("{e:#}")))
    }
}
