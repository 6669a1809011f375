//! Vector store backend trait definition
//!
//! Defines the interface that all vector storage backends must implement.
//! Backends store what they are given; validation, ID generation and
//! embedding happen in [`super::VectorStore`].

use async_trait::async_trait;

use super::error::VectorStoreError;
use super::{CollectionInfo, DocumentRecord, QueryHit};

/// Trait for vector storage backends
///
/// Implementations must be Send + Sync for use with async runtimes.
#[async_trait]
pub trait VectorStoreBackend: Send + Sync {
    /// Register a new, empty collection
    ///
    /// Fails with `DuplicateCollection` if the name is taken.
    async fn create_collection(&self, info: CollectionInfo) -> Result<(), VectorStoreError>;

    /// Drop a collection and all its documents
    ///
    /// Fails with `CollectionNotFound` if the name is unknown.
    async fn delete_collection(&self, name: &str) -> Result<(), VectorStoreError>;

    /// Look up a collection's stored metadata
    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>, VectorStoreError>;

    /// Enumerate every collection
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, VectorStoreError>;

    /// Insert a batch of documents in a single store call
    async fn add(
        &self,
        collection: &str,
        documents: Vec<DocumentRecord>,
    ) -> Result<(), VectorStoreError>;

    /// Nearest-neighbour search, closest first
    async fn query(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<QueryHit>, VectorStoreError>;

    /// Number of documents in a collection
    async fn count(&self, collection: &str) -> Result<usize, VectorStoreError>;

    /// Check if the backend is healthy/connected
    async fn health_check(&self) -> Result<(), VectorStoreError>;
}
