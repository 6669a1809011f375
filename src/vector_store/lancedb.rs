//! LanceDB backend for vector storage
//!
//! Embedded vector database using Apache Arrow for columnar storage.
//! No external server required - direct file access.
//!
//! Every collection is its own table. Collection metadata lives in a
//! registry table, `__collections`, whose name can never collide with a
//! valid collection name.

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connect;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::VectorStoreError;
use super::traits::VectorStoreBackend;
use super::{CollectionInfo, DocumentRecord, Metadata, QueryHit};

const REGISTRY_TABLE: &str = "__collections";

/// LanceDB backend for embedded vector storage
pub struct LanceDbBackend {
    db: lancedb::Connection,
    vector_dim: usize,
    /// Cached Arrow schemas to avoid recreation on every batch
    documents_schema: Arc<Schema>,
    registry_schema: Arc<Schema>,
}

impl LanceDbBackend {
    /// Create a new LanceDB backend
    ///
    /// # Arguments
    /// * `path` - Directory for database storage
    /// * `vector_dim` - Embedding dimension (384 for all-MiniLM-L6-v2)
    pub async fn new(path: PathBuf, vector_dim: usize) -> Result<Self, VectorStoreError> {
        std::fs::create_dir_all(&path).map_err(|e| {
            VectorStoreError::connection(format!("Failed to create directory: {}", e))
        })?;

        let db = connect(path.to_string_lossy().as_ref())
            .execute()
            .await
            .map_err(|e| VectorStoreError::connection(format!("Failed to connect: {}", e)))?;

        let backend = Self {
            db,
            vector_dim,
            documents_schema: Arc::new(Self::documents_schema_for_dim(vector_dim)),
            registry_schema: Arc::new(Self::registry_schema()),
        };

        backend.ensure_registry_exists().await?;

        Ok(backend)
    }

    fn documents_schema_for_dim(vector_dim: usize) -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("document", DataType::Utf8, false),
            Field::new("metadata_json", DataType::Utf8, false),
        ])
    }

    fn registry_schema() -> Schema {
        Schema::new(vec![
            Field::new("name", DataType::Utf8, false),
            Field::new("uuid", DataType::Utf8, false),
            Field::new("description", DataType::Utf8, false),
        ])
    }

    async fn table_names(&self) -> Result<Vec<String>, VectorStoreError> {
        self.db
            .table_names()
            .execute()
            .await
            .map_err(|e| VectorStoreError::backend(format!("Failed to list tables: {}", e)))
    }

    async fn ensure_registry_exists(&self) -> Result<(), VectorStoreError> {
        if self.table_names().await?.iter().any(|t| t == REGISTRY_TABLE) {
            return Ok(());
        }

        let batch = RecordBatch::try_new(
            self.registry_schema.clone(),
            vec![
                Arc::new(StringArray::from(Vec::<String>::new())),
                Arc::new(StringArray::from(Vec::<String>::new())),
                Arc::new(StringArray::from(Vec::<String>::new())),
            ],
        )
        .map_err(|e| VectorStoreError::backend(format!("Failed to create batch: {}", e)))?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], self.registry_schema.clone());

        self.db
            .create_table(REGISTRY_TABLE, Box::new(batches))
            .execute()
            .await
            .map_err(|e| VectorStoreError::backend(format!("Failed to create registry: {}", e)))?;

        tracing::info!("Created LanceDB collection registry");
        Ok(())
    }

    async fn registry(&self) -> Result<lancedb::Table, VectorStoreError> {
        self.db
            .open_table(REGISTRY_TABLE)
            .execute()
            .await
            .map_err(|e| VectorStoreError::backend(format!("Registry unavailable: {}", e)))
    }

    /// Open a collection's table; a missing table means a missing collection
    async fn get_table(&self, name: &str) -> Result<lancedb::Table, VectorStoreError> {
        self.db
            .open_table(name)
            .execute()
            .await
            .map_err(|e| {
                tracing::debug!(collection = %name, error = %e, "Table not found");
                VectorStoreError::not_found(name)
            })
    }

    fn empty_documents_batch(&self) -> Result<RecordBatch, VectorStoreError> {
        self.documents_to_batch(&[])
    }

    /// Convert documents to Arrow RecordBatch
    fn documents_to_batch(
        &self,
        documents: &[DocumentRecord],
    ) -> Result<RecordBatch, VectorStoreError> {
        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        let texts: Vec<&str> = documents.iter().map(|d| d.document.as_str()).collect();

        // Flatten all vectors into a single array
        let flat_vectors: Vec<f32> = documents
            .iter()
            .flat_map(|d| d.embedding.iter().copied())
            .collect();
        let values = Float32Array::from(flat_vectors);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array =
            FixedSizeListArray::try_new(field, self.vector_dim as i32, Arc::new(values), None)
                .map_err(|e| {
                    VectorStoreError::serialization(format!("Failed to create vector array: {}", e))
                })?;

        let metadata_jsons: Vec<String> = documents
            .iter()
            .map(|d| {
                serde_json::to_string(&d.metadata).map_err(|e| {
                    VectorStoreError::serialization(format!("Failed to serialize metadata: {}", e))
                })
            })
            .collect::<Result<_, _>>()?;

        RecordBatch::try_new(
            self.documents_schema.clone(),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(vector_array),
                Arc::new(StringArray::from(texts)),
                Arc::new(StringArray::from(metadata_jsons)),
            ],
        )
        .map_err(|e| VectorStoreError::backend(format!("Failed to create batch: {}", e)))
    }

    async fn register(&self, info: &CollectionInfo) -> Result<(), VectorStoreError> {
        let row = RecordBatch::try_new(
            self.registry_schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![info.name.as_str()])),
                Arc::new(StringArray::from(vec![info.uuid.as_str()])),
                Arc::new(StringArray::from(vec![info.description.as_str()])),
            ],
        )
        .map_err(|e| VectorStoreError::backend(format!("Failed to create batch: {}", e)))?;
        let rows = RecordBatchIterator::new(vec![Ok(row)], self.registry_schema.clone());

        self.registry()
            .await?
            .add(Box::new(rows))
            .execute()
            .await
            .map_err(|e| VectorStoreError::backend(format!("Failed to register collection: {}", e)))?;
        Ok(())
    }

    /// Read registry rows, optionally filtered by a SQL predicate
    async fn read_registry(
        &self,
        filter: Option<String>,
    ) -> Result<Vec<CollectionInfo>, VectorStoreError> {
        let registry = self.registry().await?;
        let total = registry
            .count_rows(None)
            .await
            .map_err(|e| VectorStoreError::query(format!("Failed to count rows: {}", e)))?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut query = registry.query().limit(total);
        if let Some(filter) = filter {
            query = query.only_if(filter);
        }
        let batches: Vec<RecordBatch> = query
            .execute()
            .await
            .map_err(|e| VectorStoreError::query(format!("Registry query failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| VectorStoreError::query(format!("Failed to collect results: {}", e)))?;

        let mut collections = Vec::new();
        for batch in batches {
            let names = string_column(&batch, "name")?;
            let uuids = string_column(&batch, "uuid")?;
            let descriptions = string_column(&batch, "description")?;

            for i in 0..batch.num_rows() {
                collections.push(CollectionInfo {
                    name: names.value(i).to_string(),
                    uuid: uuids.value(i).to_string(),
                    description: descriptions.value(i).to_string(),
                });
            }
        }
        Ok(collections)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, VectorStoreError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| VectorStoreError::query(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| VectorStoreError::query(format!("Invalid {} column type", name)))
}

fn create_table_error(name: &str, err: lancedb::Error) -> VectorStoreError {
    match err {
        lancedb::Error::TableAlreadyExists { .. } => VectorStoreError::duplicate(name),
        e => VectorStoreError::backend(format!("Failed to create table: {}", e)),
    }
}

fn name_filter(name: &str) -> String {
    // Escape single quotes
    format!("name = '{}'", name.replace('\'', "''"))
}

#[async_trait]
impl VectorStoreBackend for LanceDbBackend {
    async fn create_collection(&self, info: CollectionInfo) -> Result<(), VectorStoreError> {
        if !self.read_registry(Some(name_filter(&info.name))).await?.is_empty()
            || self.table_names().await?.contains(&info.name)
        {
            return Err(VectorStoreError::duplicate(info.name));
        }

        let batches = RecordBatchIterator::new(
            vec![Ok(self.empty_documents_batch()?)],
            self.documents_schema.clone(),
        );
        // A concurrent create of the same name loses here, not at the check above
        self.db
            .create_table(&info.name, Box::new(batches))
            .execute()
            .await
            .map_err(|e| create_table_error(&info.name, e))?;

        if let Err(e) = self.register(&info).await {
            // Roll back so the name is not left holding an unregistered table
            if let Err(drop_err) = self.db.drop_table(&info.name).await {
                tracing::error!(
                    collection = %info.name,
                    error = %drop_err,
                    "Failed to roll back table after registry write failed"
                );
            }
            return Err(e);
        }

        tracing::info!("Created LanceDB table: {}", info.name);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), VectorStoreError> {
        let registered = !self.read_registry(Some(name_filter(name))).await?.is_empty();
        let has_table = self.table_names().await?.iter().any(|t| t == name);
        if !registered && !has_table {
            return Err(VectorStoreError::not_found(name));
        }

        // Unregister first: a collection that is listed must stay deletable
        if registered {
            self.registry()
                .await?
                .delete(&name_filter(name))
                .await
                .map_err(|e| {
                    VectorStoreError::backend(format!("Failed to unregister collection: {}", e))
                })?;
        } else {
            tracing::warn!(collection = %name, "Removing table with no registry entry");
        }

        match self.db.drop_table(name).await {
            Ok(()) | Err(lancedb::Error::TableNotFound { .. }) => {}
            Err(e) => {
                return Err(VectorStoreError::backend(format!("Failed to drop table: {}", e)));
            }
        }

        tracing::info!("Dropped LanceDB table: {}", name);
        Ok(())
    }

    async fn get_collection(&self, name: &str) -> Result<Option<CollectionInfo>, VectorStoreError> {
        Ok(self
            .read_registry(Some(name_filter(name)))
            .await?
            .into_iter()
            .next())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, VectorStoreError> {
        self.read_registry(None).await
    }

    async fn add(
        &self,
        collection: &str,
        documents: Vec<DocumentRecord>,
    ) -> Result<(), VectorStoreError> {
        if documents.is_empty() {
            return Ok(());
        }

        let count = documents.len();
        let table = self.get_table(collection).await?;
        let batch = self.documents_to_batch(&documents)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        // One add call so the batch lands as a single table version
        table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| VectorStoreError::backend(format!("Failed to add documents: {}", e)))?;

        tracing::debug!("Added {} documents to LanceDB table {}", count, collection);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<QueryHit>, VectorStoreError> {
        let table = self.get_table(collection).await?;

        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| VectorStoreError::query(format!("Failed to count rows: {}", e)))?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        let results = table
            .vector_search(query_vector)
            .map_err(|e| VectorStoreError::query(format!("Failed to create search: {}", e)))?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| VectorStoreError::query(format!("Search failed: {}", e)))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| VectorStoreError::query(format!("Failed to collect results: {}", e)))?;

        let mut hits = Vec::new();

        for batch in batches {
            let ids = string_column(&batch, "id")?;
            let texts = string_column(&batch, "document")?;
            let metadata_jsons = string_column(&batch, "metadata_json")?;

            // LanceDB adds _distance column for search results
            let distances = batch
                .column_by_name("_distance")
                .ok_or_else(|| VectorStoreError::query("Missing _distance column"))?
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| VectorStoreError::query("Invalid _distance column type"))?;

            for i in 0..batch.num_rows() {
                let metadata: Metadata = serde_json::from_str(metadata_jsons.value(i)).map_err(|e| {
                    VectorStoreError::serialization(format!("Failed to deserialize metadata: {}", e))
                })?;

                hits.push(QueryHit {
                    id: ids.value(i).to_string(),
                    document: texts.value(i).to_string(),
                    metadata,
                    distance: distances.value(i),
                });
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> Result<usize, VectorStoreError> {
        let table = self.get_table(collection).await?;

        table
            .count_rows(None)
            .await
            .map_err(|e| VectorStoreError::query(format!("Failed to count rows: {}", e)))
    }

    async fn health_check(&self) -> Result<(), VectorStoreError> {
        // Try to list tables as a health check
        self.db
            .table_names()
            .execute()
            .await
            .map_err(|e| VectorStoreError::connection(format!("Health check failed: {}", e)))?;

        Ok(())
    }
}
