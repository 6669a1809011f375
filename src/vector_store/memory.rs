//! In-memory backend using cosine distance
//!
//! Nothing survives a restart. Used by tests and by `VECTOR_BACKEND=memory`.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::error::VectorStoreError;
use super::traits::VectorStoreBackend;
use super::{CollectionInfo, DocumentRecord, QueryHit};

#[derive(Debug)]
struct MemoryCollection {
    info: CollectionInfo,
    documents: Vec<DocumentRecord>,
}

/// Collections keyed by name, documents kept in insertion order
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    collections: RwLock<BTreeMap<String, MemoryCollection>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine distance in [0, 2]; zero-magnitude vectors are treated as orthogonal
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStoreBackend for InMemoryBackend {
    async fn create_collection(&self, info: CollectionInfo) -> Result<(), VectorStoreError> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(&info.name) {
            return Err(VectorStoreError::duplicate(info.name));
        }
        collections.insert(
            info.name.clone(),
            MemoryCollection {
                info,
                documents: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), VectorStoreError> {
        self.collections
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| VectorStoreError::not_found(name))
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>, VectorStoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(name)
            .map(|c| c.info.clone()))
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, VectorStoreError> {
        Ok(self
            .collections
            .read()
            .await
            .values()
            .map(|c| c.info.clone())
            .collect())
    }

    async fn add(
        &self,
        collection: &str,
        documents: Vec<DocumentRecord>,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| VectorStoreError::not_found(collection))?;
        target.documents.extend(documents);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<QueryHit>, VectorStoreError> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| VectorStoreError::not_found(collection))?;

        let mut hits: Vec<QueryHit> = target
            .documents
            .iter()
            .map(|doc| QueryHit {
                id: doc.id.clone(),
                document: doc.document.clone(),
                metadata: doc.metadata.clone(),
                distance: cosine_distance(&doc.embedding, &query_vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> Result<usize, VectorStoreError> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.documents.len())
            .ok_or_else(|| VectorStoreError::not_found(collection))
    }

    async fn health_check(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }
}
