use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum FeedError {
    /// Page number below 1 or page size of zero. Rejected before any store I/O.
    InvalidPagination(String),
    /// The underlying store failed or timed out. The message carries the
    /// filter context so a caller-side retry policy has something to log.
    StoreUnavailable(String),
    Database(anyhow::Error),
    Internal(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::InvalidPagination(msg) => write!(f, "Invalid pagination: {}", msg),
            FeedError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            FeedError::Database(err) => write!(f, "Database error: {}", err),
            FeedError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            FeedError::InvalidPagination(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            FeedError::StoreUnavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable".to_string())
            }
            FeedError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            FeedError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for FeedError {
    fn from(err: anyhow::Error) -> Self {
        FeedError::Database(err)
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
