//! Error types
//!
//! Cache operations themselves never fail. The errors here belong to the
//! backing store behind the cache and to the admin API in front of it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Source Error ==
/// Failure reported by the backing store.
///
/// The cache passes these through to its callers untouched and never
/// caches them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The store could not be reached or refused the request
    #[error("Backing store unavailable: {0}")]
    Unavailable(String),

    /// The requested record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

impl SourceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

// == Unknown Partition ==
/// A partition name that does not match any cache partition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown cache partition: {0}")]
pub struct UnknownPartition(pub String);

// == API Error ==
/// Errors returned by the admin API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    UnknownPartition(#[from] UnknownPartition),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownPartition(_) => StatusCode::NOT_FOUND,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Convenience Result type for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
