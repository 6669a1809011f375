//! Vector store error types
//!
//! Unified error type for all vector storage backends and the store façade.

use thiserror::Error;

use crate::embeddings::EmbeddingError;

/// Errors that can occur during vector store operations
#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// No collection with this name exists
    #[error("Collection {0} does not exist")]
    CollectionNotFound(String),

    /// A collection with this name already exists
    #[error("Collection {0} already exists")]
    DuplicateCollection(String),

    /// Request data was rejected before touching the store
    #[error("{0}")]
    Validation(String),

    /// Embedding generation failed
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Failed to connect to the backend
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    Query(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic backend error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl VectorStoreError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound(name.into())
    }

    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateCollection(name.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
