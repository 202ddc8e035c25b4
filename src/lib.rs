use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("{0}")]
    Validation(String),

    #[error("Could not read any content from {}: {reason}", path.display())]
    EmptyInput { path: PathBuf, reason: String },

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("No usable index at {}: {reason}", path.display())]
    IndexNotFound { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Message suitable for showing to the person at the terminal.
    #[inline]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::EmptyInput { path, .. } => format!(
                "Error: {} is empty or unreadable. Please check your files and try again.",
                path.display()
            ),
            Self::IndexNotFound { .. } => {
                format!("{self}. Ingest some documents first with `doc-chat ingest <files>`.")
            }
            Self::EmbeddingService(_) | Self::Generation(_) => {
                format!("{self}. Check that the model service is reachable and try again.")
            }
            Self::Config(_) | Self::Io(_) | Self::Other(_) => self.to_string(),
        }
    }
}

pub mod chain;
pub mod chunking;
pub mod commands;
pub mod config;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod logging;
pub mod memory;
pub mod providers;
