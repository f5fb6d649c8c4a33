//! jsonapi-atomic - All-or-nothing execution of JSON:API atomic operations
//!
//! A batch of write operations (create, update, delete and relationship
//! changes) is applied in order inside a single transaction. Operations may
//! refer to resources created earlier in the batch through client-chosen
//! local IDs. Either every operation succeeds and the transaction commits,
//! or the batch fails with one error attributed to the offending operation
//! via `/atomic:operations[i]`.
//!
//! ```ignore
//! let processor = AtomicOperationsProcessor::new(graph, dispatcher, transactions);
//! let results = processor.process(operations, &CancellationToken::new()).await?;
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod config;
pub mod dispatch;
pub mod error;
pub mod local_id;
pub mod memory;
pub mod observability;
pub mod operations;
pub mod processor;
pub mod resource_graph;
pub mod transaction;
pub mod versioning;

pub use config::AtomicOptions;
pub use dispatch::{OperationDispatcher, OperationProcessor, ProcessorRegistry};
pub use error::{ApiError, AtomicError, ErrorObject, OperationError};
pub use local_id::{LocalIdError, LocalIdTracker, LocalIdValidator};
pub use memory::{InMemoryProcessor, InMemoryStore, InMemoryTransactionFactory};
pub use operations::{
    Operation, OperationContext, OperationKind, OperationResult, RelationshipData,
    ResourceIdentity, ResourceObject, TargetedFields,
};
pub use processor::AtomicOperationsProcessor;
pub use resource_graph::{ResourceGraph, ResourceType};
pub use transaction::{OperationsTransaction, TransactionFactory};
pub use versioning::VersionTracker;

/// Boxed future returned by the collaborator traits
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
