use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;
use thiserror::Error;

pub const FETCH_FAILED_MESSAGE: &str = "Не удалось получить данные товара";

/// Why a product lookup against the upstream failed. `Display` is the text
/// returned to callers in `details`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("timeout of {0}ms exceeded")]
    Timeout(u64),
    #[error("Request failed with status code {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("invalid upstream body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Status used when upstream failures are not collapsed into a 500.
    pub fn passthrough_status(&self) -> StatusCode {
        match self {
            FetchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            FetchError::Status(404) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FailureEnvelope {
    pub success: bool,
    pub error: &'static str,
    pub details: String,
}

impl FailureEnvelope {
    pub fn new(details: impl Into<String>) -> Self {
        Self { success: false, error: FETCH_FAILED_MESSAGE, details: details.into() }
    }
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(FailureEnvelope::new(self.to_string()))).into_response()
    }
}

/// Turns a handler panic into the regular failure envelope.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unexpected server error".to_string()
    };
    tracing::error!(details = %details, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(FailureEnvelope::new(details))).into_response()
}
