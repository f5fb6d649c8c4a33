//! HTTP Responses
//!
//! Renders batch outcomes as JSON:API documents for axum handlers.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::{ApiError, ErrorObject};
use crate::operations::OperationResult;

/// Media type for requests and responses of the atomic extension
pub const ATOMIC_MEDIA_TYPE: &str =
    "application/vnd.api+json; ext=\"https://jsonapi.org/ext/atomic\"";

/// Top-level error document
#[derive(Debug, Serialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

impl From<ApiError> for ErrorDocument {
    fn from(err: ApiError) -> Self {
        Self {
            errors: err.into_errors(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorDocument::from(self));
        (status, [(header::CONTENT_TYPE, ATOMIC_MEDIA_TYPE)], body).into_response()
    }
}

/// Top-level success document, one entry per operation
#[derive(Debug, Serialize)]
pub struct AtomicResultsDocument {
    #[serde(rename = "atomic:results")]
    pub results: Vec<OperationResult>,
}

impl AtomicResultsDocument {
    pub fn new(results: Vec<OperationResult>) -> Self {
        Self { results }
    }

    /// Whether any result carries data; clients expect 204 otherwise
    pub fn has_data(&self) -> bool {
        self.results.iter().any(|r| r.data.is_some())
    }
}

impl IntoResponse for AtomicResultsDocument {
    fn into_response(self) -> Response {
        if !self.has_data() {
            return StatusCode::NO_CONTENT.into_response();
        }
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, ATOMIC_MEDIA_TYPE)],
            Json(self),
        )
            .into_response()
    }
}
