//! # Operation Model
//!
//! Operations, resource descriptors and results exchanged between the
//! orchestrator and its collaborators.

mod context;
mod operation;
mod resource;
mod result;

pub use context::OperationContext;
pub use operation::{Operation, OperationKind, TargetedFields};
pub use resource::{RelationshipData, ResourceIdentity, ResourceObject};
pub use result::OperationResult;
