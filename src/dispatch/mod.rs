//! # Operation Dispatch
//!
//! Routes an operation to the processor for its kind. The registry is a
//! lookup table from [`OperationKind`] to processor, optionally narrowed
//! per resource type, instead of resolving processors by reflection.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::{ApiError, OperationError};
use crate::operations::{OperationContext, OperationKind, OperationResult};
use crate::BoxFuture;

/// Resolves and invokes the processor for an operation
pub trait OperationDispatcher: Send + Sync {
    /// Process the operation in `ctx`
    ///
    /// For creates, the returned resource must carry the server-assigned ID.
    fn dispatch<'a>(
        &'a self,
        ctx: OperationContext<'a>,
    ) -> BoxFuture<'a, Result<OperationResult, OperationError>>;
}

/// Persists one kind of operation
pub trait OperationProcessor: Send + Sync {
    fn process<'a>(
        &'a self,
        ctx: OperationContext<'a>,
    ) -> BoxFuture<'a, Result<OperationResult, OperationError>>;
}

/// Lookup table of processors by operation kind
#[derive(Default, Clone)]
pub struct ProcessorRegistry {
    processors: HashMap<OperationKind, Arc<dyn OperationProcessor>>,
    allowed: HashMap<String, BTreeSet<OperationKind>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the processor for a kind, replacing any earlier one
    pub fn with_processor(
        mut self,
        kind: OperationKind,
        processor: impl OperationProcessor + 'static,
    ) -> Self {
        self.processors.insert(kind, Arc::new(processor));
        self
    }

    /// Register a shared processor for a kind
    pub fn with_shared_processor(
        mut self,
        kind: OperationKind,
        processor: Arc<dyn OperationProcessor>,
    ) -> Self {
        self.processors.insert(kind, processor);
        self
    }

    /// Only allow the given kinds on a resource type
    ///
    /// Types without a restriction accept every registered kind.
    pub fn restrict(
        mut self,
        type_name: impl Into<String>,
        kinds: impl IntoIterator<Item = OperationKind>,
    ) -> Self {
        self.allowed.insert(type_name.into(), kinds.into_iter().collect());
        self
    }

    /// Whether an operation kind can be processed for a resource type
    pub fn is_accessible(&self, kind: OperationKind, type_name: &str) -> bool {
        self.processors.contains_key(&kind)
            && self
                .allowed
                .get(type_name)
                .map_or(true, |kinds| kinds.contains(&kind))
    }

    /// Get the number of registered kinds
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    fn processor_for(
        &self,
        kind: OperationKind,
        type_name: &str,
    ) -> Result<&Arc<dyn OperationProcessor>, ApiError> {
        if !self.is_accessible(kind, type_name) {
            return Err(ApiError::operation_not_accessible(kind.name(), type_name));
        }
        self.processors
            .get(&kind)
            .ok_or_else(|| ApiError::operation_not_accessible(kind.name(), type_name))
    }
}

impl OperationDispatcher for ProcessorRegistry {
    fn dispatch<'a>(
        &'a self,
        ctx: OperationContext<'a>,
    ) -> BoxFuture<'a, Result<OperationResult, OperationError>> {
        Box::pin(async move {
            let processor = self.processor_for(ctx.operation.kind(), ctx.operation.type_name())?;
            processor.process(ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{Operation, ResourceIdentity};
    use crate::resource_graph::ResourceType;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    struct EchoProcessor;

    impl OperationProcessor for EchoProcessor {
        fn process<'a>(
            &'a self,
            ctx: OperationContext<'a>,
        ) -> BoxFuture<'a, Result<OperationResult, OperationError>> {
            let resource = ctx.operation.resource().clone();
            Box::pin(async move { Ok(OperationResult::with_data(resource)) })
        }
    }

    async fn dispatch(
        registry: &ProcessorRegistry,
        op: &Operation,
    ) -> Result<OperationResult, OperationError> {
        let resource_type = ResourceType::new(op.type_name());
        let cancel = CancellationToken::new();
        let ctx = OperationContext::new(0, Uuid::nil(), op, &resource_type, &cancel);
        registry.dispatch(ctx).await
    }

    #[tokio::test]
    async fn test_dispatch_by_kind() {
        let registry =
            ProcessorRegistry::new().with_processor(OperationKind::DeleteResource, EchoProcessor);
        let op = Operation::delete(ResourceIdentity::with_id("dogs", "1"));

        let result = dispatch(&registry, &op).await.unwrap();
        assert_eq!(result.data.unwrap().id(), Some("1"));
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_not_accessible() {
        let registry = ProcessorRegistry::new();
        let op = Operation::delete(ResourceIdentity::with_id("dogs", "1"));

        match dispatch(&registry, &op).await {
            Err(OperationError::Api(err)) => {
                assert_eq!(err.status_code(), 403);
                assert_eq!(
                    err.errors()[0].detail.as_deref(),
                    Some("The 'deleteResource' resource operation is not accessible for resource type 'dogs'.")
                );
            }
            other => panic!("Expected 403, got {:?}", other),
        }
    }

    #[test]
    fn test_restrictions() {
        let registry = ProcessorRegistry::new()
            .with_processor(OperationKind::CreateResource, EchoProcessor)
            .with_processor(OperationKind::DeleteResource, EchoProcessor)
            .restrict("dogs", [OperationKind::CreateResource]);

        assert!(registry.is_accessible(OperationKind::CreateResource, "dogs"));
        assert!(!registry.is_accessible(OperationKind::DeleteResource, "dogs"));
        assert!(registry.is_accessible(OperationKind::DeleteResource, "toys"));
        assert!(!registry.is_accessible(OperationKind::UpdateResource, "toys"));
        assert_eq!(registry.len(), 2);
    }
}
