//! HTTP API layer
//!
//! ```text
//! GET    /                          liveness
//! GET    /health                    component health
//! POST   /collections/create        (API key) create collection
//! GET    /collections               list collections
//! POST   /collections/{name}/upload embed + ingest documents
//! DELETE /collections/{name}        (API key) delete collection
//! POST   /retrieve                  nearest-neighbour search
//! POST   /rag_query                 retrieve, then synthesize an answer
//! ```
//!
//! The router holds no state of its own. Everything lives in the
//! [`AppContext`] built once at startup.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::synthesis::AnswerSynthesizer;
use crate::vector_store::VectorStore;

/// Process-wide handles shared by every request
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<VectorStore>,
    pub synthesizer: Arc<AnswerSynthesizer>,
    api_password: Arc<str>,
}

impl AppContext {
    pub fn new(
        store: Arc<VectorStore>,
        synthesizer: Arc<AnswerSynthesizer>,
        api_password: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            store,
            synthesizer,
            api_password: api_password.into(),
        }
    }

    pub(crate) fn api_password(&self) -> &str {
        &self.api_password
    }
}

/// Build the application router
pub fn router(ctx: AppContext) -> Router {
    let protected = Router::new()
        .route("/collections/create", post(handlers::create_collection))
        .route("/collections/{name}", delete(handlers::delete_collection))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/collections", get(handlers::list_collections))
        .route(
            "/collections/{name}/upload",
            post(handlers::upload_documents),
        )
        .route("/retrieve", post(handlers::retrieve))
        .route("/rag_query", post(handlers::rag_query))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
