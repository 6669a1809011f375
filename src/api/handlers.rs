//! Endpoint handlers
//!
//! Handlers only validate and route; every operation is delegated to the
//! vector store or the answer synthesizer held in [`AppContext`].

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::AppContext;
use super::error::ApiResult;
use crate::monitoring::health::{HealthMonitor, HealthStatus, Status};
use crate::synthesis::DEFAULT_TEMPLATE;
use crate::vector_store::{CollectionInfo, DEFAULT_QUERY_LIMIT, Metadata, QueryHit};

/// Returned by `/rag_query` when retrieval finds nothing
pub const NO_RESULTS: &str = "No results found";

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub documents: Vec<String>,
    #[serde(default)]
    pub metadata: Option<Vec<Metadata>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub collection_name: String,
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub results: Vec<QueryHit>,
}

#[derive(Debug, Deserialize)]
pub struct RagQueryRequest {
    pub query: String,
    pub collection_name: String,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Either the synthesized answer or the empty-retrieval message
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RagQueryResponse {
    Answer { response: String },
    Empty { message: String },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub uuid: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub collection_name: String,
    pub metadata: CollectionMetadata,
}

impl From<CollectionInfo> for CollectionSummary {
    fn from(info: CollectionInfo) -> Self {
        Self {
            collection_name: info.name,
            metadata: CollectionMetadata {
                uuid: info.uuid,
                description: info.description,
            },
        }
    }
}

/// GET /
pub async fn root() -> Json<MessageResponse> {
    MessageResponse::new("Vector store API is running.")
}

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let monitor = HealthMonitor::new(
        ctx.store.clone(),
        ctx.synthesizer.templates().dir().to_path_buf(),
    );
    let health = monitor.check_health().await;
    let status = match health.overall {
        Status::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        Status::Healthy | Status::Degraded => StatusCode::OK,
    };
    (status, Json(health))
}

/// POST /collections/create
pub async fn create_collection(
    State(ctx): State<AppContext>,
    payload: Result<Json<CreateCollectionRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(payload) = payload?;
    let info = ctx
        .store
        .create_collection(&payload.name, &payload.description)
        .await?;
    Ok(MessageResponse::new(format!(
        "Collection '{}' created successfully.",
        info.name
    )))
}

/// GET /collections
pub async fn list_collections(
    State(ctx): State<AppContext>,
) -> ApiResult<Json<Vec<CollectionSummary>>> {
    let collections = ctx.store.list_collections().await?;
    Ok(Json(collections.into_iter().map(Into::into).collect()))
}

/// POST /collections/{name}/upload
pub async fn upload_documents(
    State(ctx): State<AppContext>,
    Path(collection_name): Path<String>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let Json(payload) = payload?;
    let outcome = ctx
        .store
        .upload_documents(&collection_name, payload.documents, payload.metadata)
        .await?;
    Ok(Json(UploadResponse {
        message: format!("Data uploaded to collection '{}'.", collection_name),
        ids: outcome.ids,
    }))
}

/// DELETE /collections/{name}
pub async fn delete_collection(
    State(ctx): State<AppContext>,
    Path(collection_name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let message = ctx.store.delete_collection(&collection_name).await?;
    Ok(MessageResponse::new(message))
}

/// POST /retrieve
pub async fn retrieve(
    State(ctx): State<AppContext>,
    payload: Result<Json<RetrieveRequest>, JsonRejection>,
) -> ApiResult<Json<RetrieveResponse>> {
    let Json(payload) = payload?;
    let result = ctx
        .store
        .query(&payload.query, &payload.collection_name, payload.limit)
        .await?;
    Ok(Json(RetrieveResponse {
        results: result.hits,
    }))
}

/// POST /rag_query
pub async fn rag_query(
    State(ctx): State<AppContext>,
    payload: Result<Json<RagQueryRequest>, JsonRejection>,
) -> ApiResult<Json<RagQueryResponse>> {
    let Json(payload) = payload?;
    let results = ctx
        .store
        .query(&payload.query, &payload.collection_name, DEFAULT_QUERY_LIMIT)
        .await?;

    if results.is_empty() {
        tracing::info!(collection = %payload.collection_name, "No documents retrieved, skipping synthesis");
        return Ok(Json(RagQueryResponse::Empty {
            message: NO_RESULTS.to_string(),
        }));
    }

    let template = payload.prompt.as_deref().unwrap_or(DEFAULT_TEMPLATE);
    let answer = ctx
        .synthesizer
        .synthesize(&payload.query, &results, template)
        .await?;
    Ok(Json(RagQueryResponse::Answer { response: answer }))
}
