//! End-to-end tests for the HTTP API
//!
//! Runs the full router against the in-memory backend, a keyword embedder
//! and a stub completion client. No network or model download required.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use rag_api::api::{self, AppContext};
use rag_api::embeddings::{Embedding, EmbeddingError, EmbeddingProvider};
use rag_api::synthesis::{
    AnswerSynthesizer, CompletionClient, PromptTemplates, SynthesisError,
};
use rag_api::vector_store::{InMemoryBackend, VectorStore};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;
use tower::ServiceExt;

const PASSWORD: &str = "test-password";

const VOCAB: [&str; 5] = ["sky", "blue", "grass", "green", "color"];

struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let mut vector: Vec<f32> = VOCAB
            .iter()
            .map(|v| if words.contains(v) { 1.0 } else { 0.0 })
            .collect();
        vector.push(0.1);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        VOCAB.len() + 1
    }
}

/// Records prompts and answers with a fixed string
#[derive(Default)]
struct StubClient {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionClient for StubClient {
    async fn complete(&self, system_prompt: &str) -> Result<Option<String>, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(system_prompt.to_string());
        Ok(Some("  The sky is blue.  ".to_string()))
    }
}

struct TestApp {
    router: Router,
    client: Arc<StubClient>,
    _prompts: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let prompts = TempDir::new().unwrap();
        std::fs::write(
            prompts.path().join("basic_rag_prompt.txt"),
            "Context:\n{RESULTS}\nQuestion: {QUERY}",
        )
        .unwrap();

        let store = VectorStore::new(Arc::new(InMemoryBackend::new()), Arc::new(KeywordEmbedder));
        let client = Arc::new(StubClient::default());
        let synthesizer =
            AnswerSynthesizer::new(PromptTemplates::new(prompts.path()), client.clone());
        let ctx = AppContext::new(Arc::new(store), Arc::new(synthesizer), PASSWORD);

        Self {
            router: api::router(ctx),
            client,
            _prompts: prompts,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = auth {
            builder = builder.header(header::AUTHORIZATION, key);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(&self, name: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/collections/create",
            Some(PASSWORD),
            Some(json!({ "name": name, "description": format!("{name} docs") })),
        )
        .await
    }

    async fn collection_names(&self) -> Vec<String> {
        let (status, body) = self.send(Method::GET, "/collections", None, None).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array()
            .unwrap()
            .iter()
            .map(|c| c["collection_name"].as_str().unwrap().to_string())
            .collect()
    }
}

#[tokio::test]
async fn test_root_reports_running() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Vector store API is running.");
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["overall"], "healthy");
    assert_eq!(body["vector_store"]["status"], "healthy");
}

#[tokio::test]
async fn test_create_requires_api_key() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/collections/create",
            None,
            Some(json!({ "name": "docs", "description": "d" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Unauthorized");

    let (status, _) = app
        .send(
            Method::POST,
            "/collections/create",
            Some("wrong"),
            Some(json!({ "name": "docs", "description": "d" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(app.collection_names().await.is_empty());
}

#[tokio::test]
async fn test_delete_requires_api_key() {
    let app = TestApp::new();
    app.create("docs").await;

    let (status, _) = app
        .send(Method::DELETE, "/collections/docs", Some("wrong"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Method::DELETE, "/collections/docs", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Unauthorized");

    assert_eq!(app.collection_names().await, vec!["docs"]);
}

#[tokio::test]
async fn test_create_list_delete() {
    let app = TestApp::new();

    let (status, body) = app.create("docs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Collection 'docs' created successfully.");

    let (_, listed) = app.send(Method::GET, "/collections", None, None).await;
    let entry = &listed.as_array().unwrap()[0];
    assert_eq!(entry["collection_name"], "docs");
    assert_eq!(entry["metadata"]["description"], "docs docs");
    assert!(
        uuid::Uuid::parse_str(entry["metadata"]["uuid"].as_str().unwrap()).is_ok(),
        "collection uuid should be a UUID"
    );

    let (status, body) = app
        .send(Method::DELETE, "/collections/docs", Some(PASSWORD), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Collection docs deleted successfully.");
    assert!(app.collection_names().await.is_empty());

    let (status, body) = app
        .send(Method::DELETE, "/collections/docs", Some(PASSWORD), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Collection docs does not exist");
}

#[tokio::test]
async fn test_duplicate_collection_conflicts() {
    let app = TestApp::new();
    app.create("docs").await;

    let (status, body) = app.create("docs").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("docs"));
    assert_eq!(app.collection_names().await, vec!["docs"]);
}

#[tokio::test]
async fn test_invalid_collection_name_rejected() {
    let app = TestApp::new();

    let (status, _) = app.create("x").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.collection_names().await.is_empty());
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/collections/create",
            Some(PASSWORD),
            Some(json!({ "name": "docs" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_upload_to_missing_collection() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/collections/ghost/upload",
            None,
            Some(json!({ "documents": ["The sky is blue."] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Collection ghost does not exist");
}

#[tokio::test]
async fn test_upload_metadata_mismatch() {
    let app = TestApp::new();
    app.create("docs").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/collections/docs/upload",
            None,
            Some(json!({
                "documents": ["The sky is blue.", "Grass is green."],
                "metadata": [{ "title": "Sky" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = app
        .send(
            Method::POST,
            "/retrieve",
            None,
            Some(json!({ "collection_name": "docs", "query": "sky" })),
        )
        .await;
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_then_retrieve_nearest() {
    let app = TestApp::new();
    app.create("docs").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/collections/docs/upload",
            None,
            Some(json!({
                "documents": ["The sky is blue.", "Grass is green."],
                "metadata": [{ "title": "Sky" }, { "title": "Grass" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Data uploaded to collection 'docs'.");
    assert_eq!(body["ids"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .send(
            Method::POST,
            "/retrieve",
            None,
            Some(json!({
                "collection_name": "docs",
                "query": "What color is the sky?",
                "limit": 1
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["document"], "The sky is blue.");
    assert_eq!(results[0]["metadata"]["title"], "Sky");
    assert!(results[0]["distance"].is_number());
}

#[tokio::test]
async fn test_retrieve_missing_collection() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/retrieve",
            None,
            Some(json!({ "collection_name": "ghost", "query": "sky" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Collection ghost does not exist");
}

#[tokio::test]
async fn test_rag_query_empty_collection_skips_model() {
    let app = TestApp::new();
    app.create("docs").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/rag_query",
            None,
            Some(json!({ "query": "What color is the sky?", "collection_name": "docs" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No results found");
    assert_eq!(app.client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rag_query_answers_from_context() {
    let app = TestApp::new();
    app.create("docs").await;
    app.send(
        Method::POST,
        "/collections/docs/upload",
        None,
        Some(json!({ "documents": ["The sky is blue.", "Grass is green."] })),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/rag_query",
            None,
            Some(json!({ "query": "What color is the sky?", "collection_name": "docs" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "The sky is blue.");
    assert_eq!(app.client.calls.load(Ordering::SeqCst), 1);

    let prompts = app.client.prompts.lock().unwrap();
    assert!(prompts[0].contains("The sky is blue."));
    assert!(prompts[0].contains("Question: What color is the sky?"));
}

#[tokio::test]
async fn test_rag_query_unknown_template() {
    let app = TestApp::new();
    app.create("docs").await;
    app.send(
        Method::POST,
        "/collections/docs/upload",
        None,
        Some(json!({ "documents": ["The sky is blue."] })),
    )
    .await;

    let (status, _) = app
        .send(
            Method::POST,
            "/rag_query",
            None,
            Some(json!({
                "query": "sky",
                "collection_name": "docs",
                "prompt": "missing_prompt"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = app
        .send(
            Method::POST,
            "/rag_query",
            None,
            Some(json!({
                "query": "sky",
                "collection_name": "docs",
                "prompt": "../secrets"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sky_scenario_without_metadata() {
    let app = TestApp::new();

    let (status, _) = app
        .send(
            Method::POST,
            "/collections/create",
            Some(PASSWORD),
            Some(json!({ "name": "docs", "description": "test" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, uploaded) = app
        .send(
            Method::POST,
            "/collections/docs/upload",
            None,
            Some(json!({ "documents": ["The sky is blue.", "Grass is green."] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::POST,
            "/retrieve",
            None,
            Some(json!({ "collection_name": "docs", "query": "color of sky", "limit": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["document"], "The sky is blue.");
    assert_eq!(results[0]["id"], uploaded["ids"][0]);
    assert_eq!(results[0]["metadata"], json!({}));
}
