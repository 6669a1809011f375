//! Embedding generation using fastembed
//!
//! Turns document and query text into vectors using a local ONNX model.
//! The model is loaded on the first call and kept for the life of the process.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// An embedding vector (384 dimensions for all-MiniLM-L6-v2)
pub type Embedding = Vec<f32>;

/// Dimensions produced by all-MiniLM-L6-v2
pub const MINILM_DIMENSIONS: usize = 384;

/// Errors raised while loading the model or running inference
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("Failed to embed text: {0}")]
    Inference(String),

    #[error("Embedding model returned no vector")]
    Empty,

    #[error("Embedding task failed: {0}")]
    Task(String),
}

/// Source of embedding vectors
///
/// Implementations must be deterministic for a fixed model version.
/// Callers never retry a failed call.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Embed several texts, one call per text
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Length of every vector this provider returns
    fn dimensions(&self) -> usize;
}

/// Embedding provider backed by fastembed's all-MiniLM-L6-v2
///
/// This model:
/// - 384 dimensions
/// - ~80MB download on first use
pub struct FastEmbedProvider {
    model: Arc<Mutex<Option<TextEmbedding>>>,
    show_download_progress: bool,
}

impl FastEmbedProvider {
    /// Create a provider; the model is not loaded until the first `embed`
    pub fn new() -> Self {
        Self {
            model: Arc::new(Mutex::new(None)),
            show_download_progress: false,
        }
    }

    pub fn with_download_progress(mut self, show: bool) -> Self {
        self.show_download_progress = show;
        self
    }

    /// Whether the model has been loaded yet
    pub fn is_loaded(&self) -> bool {
        self.model.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    fn load(show_download_progress: bool) -> Result<TextEmbedding, EmbeddingError> {
        tracing::info!("Loading embedding model all-MiniLM-L6-v2");
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                .with_show_download_progress(show_download_progress),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Embedding model failed to load");
            EmbeddingError::ModelLoad(e.to_string())
        })?;
        tracing::info!("Embedding model loaded");
        Ok(model)
    }
}

impl Default for FastEmbedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let model = Arc::clone(&self.model);
        let show_progress = self.show_download_progress;
        let text = text.to_string();

        // ONNX inference is CPU bound
        tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|e| EmbeddingError::Task(format!("model lock poisoned: {}", e)))?;
            if guard.is_none() {
                *guard = Some(Self::load(show_progress)?);
            }
            let Some(model) = guard.as_mut() else {
                return Err(EmbeddingError::Empty);
            };

            let embeddings = model
                .embed(vec![text], None)
                .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
            embeddings.into_iter().next().ok_or(EmbeddingError::Empty)
        })
        .await
        .map_err(|e| EmbeddingError::Task(e.to_string()))?
    }

    fn dimensions(&self) -> usize {
        MINILM_DIMENSIONS
    }
}
