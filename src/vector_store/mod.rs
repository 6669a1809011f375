//! Vector store client
//!
//! Owns all collection and document persistence. Documents are embedded
//! here before being handed to a backend, so backends only ever see
//! complete `(id, document, metadata, embedding)` records.
//!
//! Backends:
//! - [`LanceDbBackend`]: embedded, persistent (default)
//! - [`InMemoryBackend`]: process-local, for tests and throwaway deployments

pub mod error;
pub mod lancedb;
pub mod memory;
pub mod traits;

// Re-exports
pub use error::VectorStoreError;
pub use lancedb::LanceDbBackend;
pub use memory::InMemoryBackend;
pub use traits::VectorStoreBackend;

use crate::embeddings::{Embedding, EmbeddingProvider};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Arbitrary key-value document metadata (title, date, ...)
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Result count used when the caller does not pass one
pub const DEFAULT_QUERY_LIMIT: usize = 5;

/// Stored metadata of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub uuid: String,
    pub description: String,
}

/// A document ready for insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub embedding: Embedding,
}

/// One nearest-neighbour match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    /// Distance to the query vector, lower is closer
    pub distance: f32,
}

/// Ranked matches for a query, closest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub hits: Vec<QueryHit>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// Outcome of a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub collection: CollectionInfo,
    /// Generated document IDs, in input order
    pub ids: Vec<String>,
}

/// Configuration for the vector store backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorStoreConfig {
    /// Embedded LanceDB (default)
    Embedded {
        /// Path to store the database
        path: PathBuf,
    },
    /// Non-persistent in-process store
    InMemory,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self::Embedded {
            path: PathBuf::from("vectorstore"),
        }
    }
}

/// Vector store with swappable backend
///
/// This is the main entry point for collection and document operations.
#[derive(Clone)]
pub struct VectorStore {
    backend: Arc<dyn VectorStoreBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorStore {
    pub fn new(backend: Arc<dyn VectorStoreBackend>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { backend, embedder }
    }

    /// Create from config, sizing vectors to the embedder's output
    pub async fn from_config(
        config: VectorStoreConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, VectorStoreError> {
        let backend: Arc<dyn VectorStoreBackend> = match config {
            VectorStoreConfig::Embedded { path } => {
                tracing::info!(path = %path.display(), "Opening LanceDB vector store");
                Arc::new(LanceDbBackend::new(path, embedder.dimensions()).await?)
            }
            VectorStoreConfig::InMemory => {
                tracing::info!("Using in-memory vector store");
                Arc::new(InMemoryBackend::new())
            }
        };
        Ok(Self::new(backend, embedder))
    }

    /// Create a collection with a fresh UUID and the given description
    pub async fn create_collection(
        &self,
        name: &str,
        description: &str,
    ) -> Result<CollectionInfo, VectorStoreError> {
        validate_collection_name(name)?;

        let info = CollectionInfo {
            name: name.to_string(),
            uuid: uuid::Uuid::new_v4().to_string(),
            description: description.to_string(),
        };
        self.backend.create_collection(info.clone()).await?;

        tracing::info!(collection = %name, uuid = %info.uuid, "Created collection");
        Ok(info)
    }

    /// Delete a collection, returning a confirmation message
    pub async fn delete_collection(&self, name: &str) -> Result<String, VectorStoreError> {
        self.backend.delete_collection(name).await?;
        tracing::info!(collection = %name, "Deleted collection");
        Ok(format!("Collection {} deleted successfully.", name))
    }

    /// Embed and insert a batch of documents
    ///
    /// The batch is all-or-nothing: any validation or embedding failure
    /// aborts before the single insert call.
    pub async fn upload_documents(
        &self,
        collection_name: &str,
        documents: Vec<String>,
        metadata: Option<Vec<Metadata>>,
    ) -> Result<UploadOutcome, VectorStoreError> {
        let collection = self
            .backend
            .get_collection(collection_name)
            .await?
            .ok_or_else(|| VectorStoreError::not_found(collection_name))?;

        let ids: Vec<String> = documents
            .iter()
            .map(|_| uuid::Uuid::new_v4().to_string())
            .collect();
        let metadata = metadata.unwrap_or_else(|| vec![Metadata::new(); documents.len()]);
        if metadata.len() != documents.len() {
            return Err(count_mismatch(documents.len(), metadata.len(), None));
        }
        for entry in &metadata {
            validate_metadata(entry)?;
        }

        tracing::debug!(collection = %collection_name, count = documents.len(), "Embedding documents");
        let embeddings = self.embedder.embed_batch(&documents).await?;

        if embeddings.len() != documents.len() {
            return Err(count_mismatch(
                documents.len(),
                metadata.len(),
                Some(embeddings.len()),
            ));
        }
        let dimensions = self.embedder.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
            return Err(VectorStoreError::validation(format!(
                "Embedding has {} dimensions, expected {}",
                bad.len(),
                dimensions
            )));
        }

        let records: Vec<DocumentRecord> = ids
            .iter()
            .cloned()
            .zip(documents)
            .zip(metadata)
            .zip(embeddings)
            .map(|(((id, document), metadata), embedding)| DocumentRecord {
                id,
                document,
                metadata,
                embedding,
            })
            .collect();

        let count = records.len();
        if count > 0 {
            self.backend.add(collection_name, records).await?;
        }

        tracing::info!(collection = %collection_name, count, "Uploaded documents");
        Ok(UploadOutcome { collection, ids })
    }

    /// Nearest-neighbour search for `query_text`, at most `limit` hits
    pub async fn query(
        &self,
        query_text: &str,
        collection_name: &str,
        limit: usize,
    ) -> Result<QueryResult, VectorStoreError> {
        if limit == 0 {
            return Err(VectorStoreError::validation("Result limit must be at least 1"));
        }
        if self.backend.get_collection(collection_name).await?.is_none() {
            return Err(VectorStoreError::not_found(collection_name));
        }

        let query_vector = self.embedder.embed(query_text).await?;
        let hits = self
            .backend
            .query(collection_name, query_vector, limit)
            .await?;

        tracing::debug!(collection = %collection_name, hits = hits.len(), "Query complete");
        Ok(QueryResult { hits })
    }

    /// Every collection with its stored UUID and description
    pub async fn list_collections(&self) -> Result<Vec<CollectionInfo>, VectorStoreError> {
        self.backend.list_collections().await
    }

    /// Number of documents stored in a collection
    pub async fn count(&self, collection_name: &str) -> Result<usize, VectorStoreError> {
        self.backend.count(collection_name).await
    }

    /// Check if the backend is healthy/connected
    pub async fn health_check(&self) -> Result<(), VectorStoreError> {
        self.backend.health_check().await
    }
}

/// Collection names: 3-63 characters of `[A-Za-z0-9._-]`, starting and
/// ending with an alphanumeric character, without `..`
pub fn validate_collection_name(name: &str) -> Result<(), VectorStoreError> {
    let len = name.chars().count();
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    let alnum_ends = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());

    if !(3..=63).contains(&len) || !valid_chars || !alnum_ends || name.contains("..") {
        return Err(VectorStoreError::validation(format!(
            "Invalid collection name '{}': expected 3-63 characters of [A-Za-z0-9._-], \
             starting and ending with a letter or digit",
            name
        )));
    }
    Ok(())
}

/// Metadata values must be strings, numbers or booleans
fn validate_metadata(metadata: &Metadata) -> Result<(), VectorStoreError> {
    use serde_json::Value;

    for (key, value) in metadata {
        if !matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
            return Err(VectorStoreError::validation(format!(
                "Metadata value for '{}' must be a string, number or boolean",
                key
            )));
        }
    }
    Ok(())
}

fn count_mismatch(documents: usize, metadata: usize, embeddings: Option<usize>) -> VectorStoreError {
    let embeddings = embeddings.map(|n| format!(", {} embeddings", n)).unwrap_or_default();
    VectorStoreError::validation(format!(
        "Documents, metadata, and embeddings must be of the same length \
         (got {} documents, {} metadata{})",
        documents, metadata, embeddings
    ))
}
