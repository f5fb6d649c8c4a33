//! Operation Results

use serde::Serialize;

use super::resource::ResourceObject;

/// Outcome of one operation, in the same position as its input
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperationResult {
    /// Resource returned by the processor; absent for deletes and
    /// relationship changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResourceObject>,
}

impl OperationResult {
    /// A result that carries a resource
    pub fn with_data(resource: ResourceObject) -> Self {
        Self {
            data: Some(resource),
        }
    }

    /// A result with no content
    pub fn empty() -> Self {
        Self { data: None }
    }
}
