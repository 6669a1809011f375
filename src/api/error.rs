use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::embeddings::EmbeddingError;
use crate::synthesis::SynthesisError;
use crate::vector_store::VectorStoreError;

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Failures surfaced to HTTP clients
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::VectorStore(err) => match err {
                VectorStoreError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
                VectorStoreError::DuplicateCollection(_) => StatusCode::CONFLICT,
                VectorStoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Synthesis(SynthesisError::InvalidTemplateName(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Synthesis(_) | ApiError::Embedding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }

        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                VectorStoreError::not_found("docs").into(),
                StatusCode::NOT_FOUND,
            ),
            (
                VectorStoreError::duplicate("docs").into(),
                StatusCode::CONFLICT,
            ),
            (
                VectorStoreError::validation("bad").into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                VectorStoreError::backend("disk").into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SynthesisError::TemplateNotFound("x".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SynthesisError::InvalidTemplateName("../x".into()).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                EmbeddingError::Empty.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{error}");
        }
    }

    #[test]
    fn test_not_found_message() {
        let error: ApiError = VectorStoreError::not_found("docs").into();
        assert_eq!(error.to_string(), "Collection docs does not exist");
    }
}
