//! Health monitoring for production deployments
//!
//! Provides component-level health checks for:
//! - Vector store backend
//! - Prompt template directory
//!
//! Health states: Healthy, Degraded, Unhealthy

use crate::vector_store::VectorStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Overall system health status
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall system status
    pub overall: Status,
    /// Vector store component health
    pub vector_store: ComponentHealth,
    /// Prompt template directory health
    pub prompts: ComponentHealth,
}

/// Health status levels
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// All systems operational
    Healthy,
    /// Retrieval works but answer synthesis may not
    Degraded,
    /// Vector store failing
    Unhealthy,
}

/// Individual component health
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Component status
    pub status: Status,
    /// Status message
    pub message: String,
    /// Optional latency measurement in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ComponentHealth {
    /// Create healthy component status
    pub fn healthy(message: impl Into<String>, latency_ms: Option<u64>) -> Self {
        Self {
            status: Status::Healthy,
            message: message.into(),
            latency_ms,
        }
    }

    /// Create degraded component status
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: Status::Degraded,
            message: message.into(),
            latency_ms: None,
        }
    }

    /// Create unhealthy component status
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: Status::Unhealthy,
            message: message.into(),
            latency_ms: None,
        }
    }
}

/// Health monitor for the retrieval service
pub struct HealthMonitor {
    vector_store: Arc<VectorStore>,
    prompts_dir: PathBuf,
}

impl HealthMonitor {
    pub fn new(vector_store: Arc<VectorStore>, prompts_dir: PathBuf) -> Self {
        Self {
            vector_store,
            prompts_dir,
        }
    }

    /// Perform comprehensive health check
    pub async fn check_health(&self) -> HealthStatus {
        let (vector_health, prompts_health) =
            tokio::join!(self.check_vector_store(), self.check_prompts());

        let overall = calculate_overall_status(&vector_health, &prompts_health);

        HealthStatus {
            overall,
            vector_store: vector_health,
            prompts: prompts_health,
        }
    }

    async fn check_vector_store(&self) -> ComponentHealth {
        let start = Instant::now();

        let health = self.vector_store.health_check().await;
        let collections = self.vector_store.list_collections().await;

        match health.and(collections) {
            Ok(collections) => {
                let latency = start.elapsed().as_millis() as u64;
                ComponentHealth::healthy(
                    format!("Vector store operational ({} collections)", collections.len()),
                    Some(latency),
                )
            }
            Err(e) => ComponentHealth::unhealthy(format!("Vector store error: {}", e)),
        }
    }

    async fn check_prompts(&self) -> ComponentHealth {
        match tokio::fs::read_dir(&self.prompts_dir).await {
            Ok(mut entries) => {
                let mut templates = 0usize;
                while let Ok(Some(entry)) = entries.next_entry().await {
                    if entry.path().extension().is_some_and(|ext| ext == "txt") {
                        templates += 1;
                    }
                }
                if templates == 0 {
                    ComponentHealth::degraded(format!(
                        "No prompt templates in {}",
                        self.prompts_dir.display()
                    ))
                } else {
                    ComponentHealth::healthy(format!("{} prompt templates", templates), None)
                }
            }
            Err(e) => ComponentHealth::degraded(format!(
                "Prompt directory {} unreadable: {}",
                self.prompts_dir.display(),
                e
            )),
        }
    }
}

/// Calculate overall system status from component statuses
fn calculate_overall_status(vector: &ComponentHealth, prompts: &ComponentHealth) -> Status {
    if vector.status == Status::Unhealthy {
        return Status::Unhealthy;
    }

    if vector.status == Status::Degraded || prompts.status != Status::Healthy {
        return Status::Degraded;
    }

    Status::Healthy
}
