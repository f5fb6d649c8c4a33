//! # Local ID Errors

use thiserror::Error;

use crate::error::{ApiError, ErrorObject};

/// Result type for local ID bookkeeping
pub type LocalIdResult<T> = Result<T, LocalIdError>;

/// Misuse of a local ID within a batch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalIdError {
    #[error("Another local ID with name '{local_id}' is already defined at this point.")]
    DuplicateLocalId { local_id: String },

    #[error("Server-generated value for local ID '{local_id}' is not available at this point.")]
    LocalIdNotDeclared { local_id: String },

    #[error("Local ID '{local_id}' belongs to resource type '{declared_type}' instead of '{requested_type}'.")]
    LocalIdTypeMismatch {
        local_id: String,
        declared_type: String,
        requested_type: String,
    },

    #[error("Cannot reassign to existing local ID '{local_id}'.")]
    LocalIdAlreadyAssigned { local_id: String },

    #[error("Local ID '{local_id}' cannot be both defined and used within the same operation.")]
    LocalIdNotYetAssigned { local_id: String },
}

impl LocalIdError {
    /// The local ID the error is about
    pub fn local_id(&self) -> &str {
        match self {
            Self::DuplicateLocalId { local_id }
            | Self::LocalIdNotDeclared { local_id }
            | Self::LocalIdTypeMismatch { local_id, .. }
            | Self::LocalIdAlreadyAssigned { local_id }
            | Self::LocalIdNotYetAssigned { local_id } => local_id,
        }
    }

    /// Short, stable title for the error object
    pub fn title(&self) -> &'static str {
        match self {
            Self::DuplicateLocalId { .. } => {
                "Another local ID with the same name is already defined at this point."
            }
            Self::LocalIdNotDeclared { .. } => {
                "Server-generated value for local ID is not available at this point."
            }
            Self::LocalIdTypeMismatch { .. } => "Incompatible type in Local ID usage.",
            Self::LocalIdAlreadyAssigned { .. } => "Local ID cannot be reassigned.",
            Self::LocalIdNotYetAssigned { .. } => {
                "Local ID cannot be both defined and used within the same operation."
            }
        }
    }

    /// Get error code for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateLocalId { .. } => "DUPLICATE_LOCAL_ID",
            Self::LocalIdNotDeclared { .. } => "LOCAL_ID_NOT_DECLARED",
            Self::LocalIdTypeMismatch { .. } => "LOCAL_ID_TYPE_MISMATCH",
            Self::LocalIdAlreadyAssigned { .. } => "LOCAL_ID_ALREADY_ASSIGNED",
            Self::LocalIdNotYetAssigned { .. } => "LOCAL_ID_NOT_YET_ASSIGNED",
        }
    }

    /// Local ID errors are always client input errors
    pub fn status_code(&self) -> u16 {
        400
    }
}

impl From<LocalIdError> for ApiError {
    fn from(err: LocalIdError) -> Self {
        ApiError::new(
            ErrorObject::new(err.status_code(), err.title())
                .with_detail(err.to_string())
                .with_meta("code", err.code().into()),
        )
    }
}
