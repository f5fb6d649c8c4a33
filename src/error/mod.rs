//! # Errors
//!
//! JSON:API error objects and the error types exchanged between the
//! orchestrator and its collaborators.
//!
//! - [`ApiError`]: one or more client-facing error objects (domain errors)
//! - [`OperationError`]: what collaborators return for a single operation
//! - [`AtomicError`]: what a batch returns to the caller

mod response;

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

pub use response::{AtomicResultsDocument, ErrorDocument, ATOMIC_MEDIA_TYPE};

/// Boxed error used for unexpected collaborator failures
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Prefix identifying the operations array in error pointers
pub const OPERATIONS_POINTER: &str = "/atomic:operations";

const UNEXPECTED_DETAIL: &str = "See the server logs for details.";

/// Pointer of the operation at `index`, e.g. `/atomic:operations[3]`
pub fn operation_pointer(index: usize) -> String {
    format!("{}[{}]", OPERATIONS_POINTER, index)
}

/// Location of the request element an error applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
}

/// A JSON:API error object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorObject {
    pub id: String,

    #[serde(serialize_with = "serialize_status")]
    pub status: u16,

    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,

    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

// JSON:API carries the status as a string
fn serialize_status<S: Serializer>(status: &u16, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(status)
}

impl ErrorObject {
    /// Create an error object with a fresh ID
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status,
            title: title.into(),
            detail: None,
            source: None,
            meta: Map::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: Some(pointer.into()),
        });
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Source pointer, if any
    pub fn pointer(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.pointer.as_deref())
    }

    fn prefixed(mut self, prefix: &str) -> Self {
        let pointer = match self.pointer() {
            Some(existing) => format!("{}{}", prefix, existing),
            None => prefix.to_string(),
        };
        self.source = Some(ErrorSource {
            pointer: Some(pointer),
        });
        self
    }
}

/// Domain error: one or more error objects destined for the client
#[derive(Debug, Clone)]
pub struct ApiError {
    errors: Vec<ErrorObject>,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ApiError {
    /// Create an error holding a single error object
    pub fn new(error: ErrorObject) -> Self {
        Self {
            errors: vec![error],
            cause: None,
        }
    }

    /// Create an error holding several error objects
    pub fn from_errors(errors: Vec<ErrorObject>) -> Self {
        debug_assert!(!errors.is_empty(), "ApiError requires at least one error object");
        Self {
            errors,
            cause: None,
        }
    }

    /// Attach the underlying error, kept for diagnostics only
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        let cause: BoxError = cause.into();
        self.cause = Some(Arc::from(cause));
        self
    }

    pub fn errors(&self) -> &[ErrorObject] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ErrorObject> {
        self.errors
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Attribute every error object to the operation at `index`
    ///
    /// Existing pointers are kept as a suffix, so `/data/attributes/name`
    /// becomes `/atomic:operations[2]/data/attributes/name`.
    pub fn at_operation(self, index: usize) -> Self {
        let prefix = operation_pointer(index);
        Self {
            errors: self
                .errors
                .into_iter()
                .map(|e| e.prefixed(&prefix))
                .collect(),
            cause: self.cause,
        }
    }

    /// HTTP status for the whole error document
    ///
    /// A single error keeps its own status. Multiple errors collapse to 500
    /// when any of them is a server error, otherwise to 400.
    pub fn status_code(&self) -> u16 {
        match self.errors.as_slice() {
            [single] => single.status,
            errors if errors.iter().any(|e| e.status >= 500) => 500,
            _ => 400,
        }
    }

    // ==================
    // Constructors
    // ==================

    /// 400 Bad Request
    pub fn bad_request(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorObject::new(400, title).with_detail(detail))
    }

    /// 404 Not Found
    pub fn not_found(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(ErrorObject::new(404, title).with_detail(detail))
    }

    /// 403 for an operation kind that is not available on a resource type
    pub fn operation_not_accessible(kind: &str, type_name: &str) -> Self {
        Self::new(
            ErrorObject::new(403, "The requested operation is not accessible.").with_detail(
                format!(
                    "The '{}' resource operation is not accessible for resource type '{}'.",
                    kind, type_name
                ),
            ),
        )
    }

    /// 413 for a batch over the configured size
    pub fn too_many_operations(count: usize, maximum: usize) -> Self {
        Self::new(
            ErrorObject::new(413, "Too many operations in request.")
                .with_detail(format!(
                    "The number of operations in this request ({}) is higher than the maximum of {}.",
                    count, maximum
                ))
                .with_pointer(OPERATIONS_POINTER),
        )
    }

    /// 500 for an unexpected failure while processing the operation at `index`
    ///
    /// The client only sees a generic detail. The cause is kept on the
    /// error; its chain is copied into meta only when `include_causes` is set.
    pub fn failed_operation(index: usize, cause: BoxError, include_causes: bool) -> Self {
        let mut error = ErrorObject::new(
            500,
            "An unhandled error occurred while processing an operation in this request.",
        )
        .with_detail(UNEXPECTED_DETAIL)
        .with_pointer(operation_pointer(index));

        if include_causes {
            error = error.with_meta("causes", Value::Array(cause_chain(cause.as_ref())));
        }

        Self::new(error).with_cause(cause)
    }

    /// 500 for an unexpected failure outside any single operation
    pub fn internal(cause: BoxError) -> Self {
        Self::new(
            ErrorObject::new(500, "An unhandled error occurred while processing this request.")
                .with_detail(UNEXPECTED_DETAIL),
        )
        .with_cause(cause)
    }
}

fn cause_chain(error: &(dyn StdError + 'static)) -> Vec<Value> {
    let mut chain = vec![Value::String(error.to_string())];
    let mut current = error.source();
    while let Some(source) = current {
        chain.push(Value::String(source.to_string()));
        current = source.source();
    }
    chain
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [single] => {
                write!(f, "{}", single.title)?;
                if let Some(ref detail) = single.detail {
                    write!(f, " {}", detail)?;
                }
                Ok(())
            }
            errors => write!(f, "{} errors occurred", errors.len()),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Failure of a single operation, as reported by a collaborator
#[derive(Debug, Error)]
pub enum OperationError {
    /// Domain error, passed to the client with its pointers rewritten
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The batch was canceled
    #[error("Operation canceled")]
    Canceled,

    /// Anything else; wrapped into a generic 500 by the orchestrator
    #[error("{0}")]
    Unexpected(#[source] BoxError),
}

impl OperationError {
    /// Wrap an unexpected failure
    pub fn unexpected(error: impl Into<BoxError>) -> Self {
        Self::Unexpected(error.into())
    }
}

/// Outcome of a failed atomic operations batch
#[derive(Debug, Error)]
pub enum AtomicError {
    /// Pointer-attributed errors for the client
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The client canceled the request; not a processing failure
    #[error("Atomic operations request was canceled")]
    Canceled,
}

impl AtomicError {
    /// The domain error, unless the batch was canceled
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            Self::Canceled => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_operation_prefixes_existing_pointer() {
        let error = ApiError::new(
            ErrorObject::new(422, "Invalid attribute.").with_pointer("/data/attributes/name"),
        )
        .at_operation(2);

        assert_eq!(
            error.errors()[0].pointer(),
            Some("/atomic:operations[2]/data/attributes/name")
        );
    }

    #[test]
    fn test_at_operation_without_pointer() {
        let error = ApiError::bad_request("Bad", "detail").at_operation(0);
        assert_eq!(error.errors()[0].pointer(), Some("/atomic:operations[0]"));
    }

    #[test]
    fn test_status_code_aggregation() {
        let single = ApiError::not_found("Missing", "gone");
        assert_eq!(single.status_code(), 404);

        let client = ApiError::from_errors(vec![
            ErrorObject::new(404, "a"),
            ErrorObject::new(409, "b"),
        ]);
        assert_eq!(client.status_code(), 400);

        let server = ApiError::from_errors(vec![
            ErrorObject::new(404, "a"),
            ErrorObject::new(503, "b"),
        ]);
        assert_eq!(server.status_code(), 500);
    }

    #[test]
    fn test_status_serialized_as_string() {
        let value = serde_json::to_value(ErrorObject::new(400, "Bad")).unwrap();
        assert_eq!(value["status"], "400");
        assert!(value.get("meta").is_none());
        assert!(value.get("source").is_none());
    }

    #[test]
    fn test_failed_operation_keeps_cause() {
        let cause: BoxError = "disk full".into();
        let error = ApiError::failed_operation(1, cause, false);

        assert_eq!(error.status_code(), 500);
        assert_eq!(error.errors()[0].pointer(), Some("/atomic:operations[1]"));
        assert_eq!(error.errors()[0].detail.as_deref(), Some(UNEXPECTED_DETAIL));
        assert!(error.errors()[0].meta.is_empty());
        assert_eq!(error.cause().map(|c| c.to_string()), Some("disk full".to_string()));
    }

    #[test]
    fn test_unexpected_cause_not_serialized_by_default() {
        let cause: BoxError = "password=hunter2 at db.internal:5432".into();
        let operation = serde_json::to_string(ApiError::failed_operation(0, cause, false).errors())
            .unwrap();
        assert!(!operation.contains("hunter2"));

        let cause: BoxError = "password=hunter2 at db.internal:5432".into();
        let internal = serde_json::to_string(ApiError::internal(cause).errors()).unwrap();
        assert!(!internal.contains("hunter2"));
    }

    #[test]
    fn test_failed_operation_includes_causes_on_request() {
        let cause: BoxError = "disk full".into();
        let error = ApiError::failed_operation(0, cause, true);

        assert_eq!(error.errors()[0].meta["causes"][0], "disk full");
        assert_eq!(error.errors()[0].detail.as_deref(), Some(UNEXPECTED_DETAIL));
    }

    #[test]
    fn test_too_many_operations() {
        let error = ApiError::too_many_operations(12, 10);
        assert_eq!(error.status_code(), 413);
        assert_eq!(error.errors()[0].pointer(), Some("/atomic:operations"));
    }
}
