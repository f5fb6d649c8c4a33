//! Per-Operation Context
//!
//! Immutable view handed to the dispatcher and the transaction hooks for
//! one operation. Replaces any ambient request state: everything a
//! collaborator may need about the current operation is passed here.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::operation::Operation;
use crate::resource_graph::ResourceType;

/// Context for a single operation within a running batch
#[derive(Debug, Clone, Copy)]
pub struct OperationContext<'a> {
    /// Zero-based position in the batch
    pub index: usize,

    /// Transaction the batch runs in
    pub transaction_id: Uuid,

    /// The operation, with local IDs already resolved
    pub operation: &'a Operation,

    /// Metadata for the operation's primary resource type
    pub resource_type: &'a ResourceType,

    /// Cancellation signal for the whole batch
    pub cancel: &'a CancellationToken,
}

impl<'a> OperationContext<'a> {
    pub fn new(
        index: usize,
        transaction_id: Uuid,
        operation: &'a Operation,
        resource_type: &'a ResourceType,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            index,
            transaction_id,
            operation,
            resource_type,
            cancel,
        }
    }

    /// JSON pointer of the operation, e.g. `/atomic:operations[2]`
    pub fn pointer(&self) -> String {
        crate::error::operation_pointer(self.index)
    }
}
