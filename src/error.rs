//! Error handling for the dashboard backend
//!
//! Three layers, each a thiserror enum:
//! - [`GatewayError`]: what the data store reported for one statement
//! - [`QueryError`]: the same failure attributed to a dataset, split into
//!   recoverable ("data unavailable") and fatal (connection) cases
//! - [`ApiError`]: the HTTP mapping used by the axum handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure reported by the data access gateway for a single statement
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The statement reached the store and failed there (missing table or
    /// column, type mismatch, malformed SQL).
    #[error("Query execution failed: {0}")]
    Execution(#[source] sqlx::Error),

    /// The store could not be reached at all.
    #[error("Data store connection failed: {0}")]
    Connection(#[source] sqlx::Error),
}

impl From<sqlx::Error> for GatewayError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => GatewayError::Connection(error),
            other => GatewayError::Execution(other),
        }
    }
}

/// Failure of an aggregation operation against one dataset
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Data unavailable for '{dataset}': {source}")]
    Unavailable {
        dataset: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Data store connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Unknown chart dimension '{dimension}' for '{dataset}'")]
    UnknownDimension { dataset: String, dimension: String },
}

impl QueryError {
    pub(crate) fn from_gateway(dataset: &str, error: GatewayError) -> Self {
        match error {
            GatewayError::Execution(source) => QueryError::Unavailable {
                dataset: dataset.to_string(),
                source,
            },
            GatewayError::Connection(source) => QueryError::Connection(source),
        }
    }

    /// Whether the caller should degrade to an empty / zero result instead of
    /// failing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, QueryError::Unavailable { .. })
    }
}

/// Errors surfaced to HTTP callers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<QueryError> for ApiError {
    fn from(error: QueryError) -> Self {
        match error {
            QueryError::UnknownDimension { .. } => ApiError::NotFound(error.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Result type aliases for convenience
pub type GatewayResult<T> = Result<T, GatewayError>;
pub type QueryResult<T> = Result<T, QueryError>;
pub type ApiResult<T> = Result<T, ApiError>;
