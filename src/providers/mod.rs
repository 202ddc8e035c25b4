// Model providers
// Embedding and text generation services behind small synchronous traits

mod http;
pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::config::{Config, ProviderKind};
use crate::{RagError, Result};

/// Turns text into fixed-dimension vectors
pub trait Embedder {
    /// Identifier of the embedding model, recorded in the persisted index
    fn model_name(&self) -> &str;

    /// Number of texts sent per request
    #[inline]
    fn batch_size(&self) -> usize {
        16
    }

    /// Embed several texts, returning one vector per input in the same order
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])?
            .pop()
            .ok_or_else(|| RagError::EmbeddingService("empty embedding response".to_string()))
    }
}

/// Generates text from a prompt
pub trait LanguageModel {
    fn model_name(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the embedder selected by the configuration
#[inline]
pub fn embedder_from_config(config: &Config) -> Result<Box<dyn Embedder>> {
    match config.provider {
        ProviderKind::Ollama => Ok(Box::new(OllamaClient::new(config)?)),
        ProviderKind::OpenAi => Ok(Box::new(OpenAiClient::from_env(config)?)),
    }
}

/// Build the language model selected by the configuration
#[inline]
pub fn language_model_from_config(config: &Config) -> Result<Box<dyn LanguageModel>> {
    match config.provider {
        ProviderKind::Ollama => Ok(Box::new(OllamaClient::new(config)?)),
        ProviderKind::OpenAi => Ok(Box::new(OpenAiClient::from_env(config)?)),
    }
}
