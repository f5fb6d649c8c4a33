//! # Atomic Operations Processor
//!
//! Runs a batch of operations all-or-nothing:
//!
//! ```text
//! limit check → local ID validation → begin transaction
//!   → for each operation: cancel check → stamp → before hook
//!       → resolve local IDs → apply versions → dispatch
//!       → assign local ID → capture versions → after hook
//!   → commit
//! ```
//!
//! Any failure after the transaction opened rolls it back. Domain errors
//! are returned with their pointers prefixed by the failing operation's
//! `/atomic:operations[i]`; unexpected errors become a single 500 at that
//! pointer. Cancellation is passed through as [`AtomicError::Canceled`].

mod batch;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::AtomicOptions;
use crate::dispatch::OperationDispatcher;
use crate::error::{ApiError, AtomicError, OperationError};
use crate::local_id::{LocalIdTracker, LocalIdValidator};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};
use crate::operations::{Operation, OperationContext, OperationKind, OperationResult};
use crate::resource_graph::ResourceGraph;
use crate::transaction::{TransactionFactory, TransactionGuard};

use batch::BatchState;

/// Executes atomic operations batches
///
/// Shared across requests; every call to [`process`](Self::process) gets
/// its own local ID table, version table and transaction.
pub struct AtomicOperationsProcessor {
    graph: Arc<ResourceGraph>,
    dispatcher: Arc<dyn OperationDispatcher>,
    transactions: Arc<dyn TransactionFactory>,
    options: AtomicOptions,
    metrics: Arc<MetricsRegistry>,
}

impl AtomicOperationsProcessor {
    pub fn new(
        graph: Arc<ResourceGraph>,
        dispatcher: Arc<dyn OperationDispatcher>,
        transactions: Arc<dyn TransactionFactory>,
    ) -> Self {
        Self {
            graph,
            dispatcher,
            transactions,
            options: AtomicOptions::default(),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn with_options(mut self, options: AtomicOptions) -> Self {
        self.options = options;
        self
    }

    /// Report into a shared metrics registry
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn options(&self) -> &AtomicOptions {
        &self.options
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn resource_graph(&self) -> &Arc<ResourceGraph> {
        &self.graph
    }

    /// Process a batch
    ///
    /// Returns one result per operation, in input order, after the
    /// transaction committed. On error nothing was committed.
    pub async fn process(
        &self,
        mut operations: Vec<Operation>,
        cancel: &CancellationToken,
    ) -> Result<Vec<OperationResult>, AtomicError> {
        let count = operations.len().to_string();
        let mut scope = ObservationScope::with_fields("ATOMIC_BATCH", &[("operations", &count)]);

        if self.options.exceeds_limit(operations.len()) {
            let max = self.options.max_operations_per_request.unwrap_or_default();
            log_event_with_fields(
                Event::BatchTooLarge,
                &[("operations", &count), ("max", &max.to_string())],
            );
            scope.reject("too many operations");
            return Err(ApiError::too_many_operations(operations.len(), max).into());
        }

        let mut local_ids = LocalIdTracker::new();
        if let Err(error) = LocalIdValidator::new(&mut local_ids).validate(&operations) {
            self.metrics.increment_local_id_rejections();
            log_event_with_fields(
                Event::LocalIdValidationFailed,
                &[("pointer", first_pointer(&error)), ("detail", &error.to_string())],
            );
            scope.reject("invalid local ID usage");
            return Err(error.into());
        }

        let transaction = match self.transactions.begin_transaction(cancel).await {
            Ok(transaction) => transaction,
            Err(error) => {
                let error = batch_error(error);
                self.close_failed(scope, &error);
                return Err(error);
            }
        };
        let mut guard = TransactionGuard::new(transaction);
        scope.record("transaction_id", guard.transaction_id().to_string());

        let mut batch = BatchState::new(local_ids, Arc::clone(&self.graph), operations.len());

        for (index, operation) in operations.iter_mut().enumerate() {
            if let Err(error) = self
                .process_operation(index, operation, &mut guard, &mut batch, cancel)
                .await
            {
                let error = self.attribute(index, error);
                self.abort(guard, scope, &error).await;
                return Err(error);
            }
        }

        if cancel.is_cancelled() {
            let error = AtomicError::Canceled;
            self.abort(guard, scope, &error).await;
            return Err(error);
        }

        if let Err(error) = guard.commit().await {
            let error = batch_error(error);
            self.metrics.increment_batches_rolled_back();
            self.close_failed(scope, &error);
            return Err(error);
        }

        self.metrics.increment_batches_committed();
        let results = batch.into_results();
        scope.complete_with_fields(&[("results", &results.len().to_string())]);
        Ok(results)
    }

    async fn process_operation(
        &self,
        index: usize,
        operation: &mut Operation,
        guard: &mut TransactionGuard,
        batch: &mut BatchState,
        cancel: &CancellationToken,
    ) -> Result<(), OperationError> {
        if cancel.is_cancelled() {
            return Err(OperationError::Canceled);
        }

        let transaction_id = guard.transaction_id();
        operation.stamp_transaction(transaction_id);

        let resource_type = self.graph.require(operation.type_name())?;
        for name in operation
            .targeted_fields()
            .relationships
            .iter()
            .map(String::as_str)
            .chain(operation.relationship())
        {
            resource_type.require_relationship(name)?;
        }

        guard
            .before_operation(OperationContext::new(
                index,
                transaction_id,
                operation,
                resource_type,
                cancel,
            ))
            .await?;

        batch.resolve_local_ids(operation).map_err(ApiError::from)?;

        let track_versions = batch.versions.requires_version_tracking(operation);
        if track_versions {
            batch.versions.apply_tracked_versions(operation);
        }

        let ctx = OperationContext::new(index, transaction_id, operation, resource_type, cancel);
        let index_field = index.to_string();
        if self.options.log_operations {
            log_event_with_fields(
                Event::OperationDispatched,
                &[
                    ("index", &index_field),
                    ("op", operation.kind().name()),
                    ("type", operation.type_name()),
                ],
            );
        }

        let result = self.dispatcher.dispatch(ctx).await?;

        if operation.kind() == OperationKind::CreateResource
            && operation.resource().identity.lid.is_some()
        {
            let server_id = result
                .data
                .as_ref()
                .and_then(|resource| resource.id())
                .ok_or_else(|| {
                    OperationError::unexpected(format!(
                        "Processor returned no ID for the resource created for local ID '{}'.",
                        operation.resource().identity.lid.as_deref().unwrap_or_default()
                    ))
                })?;
            batch
                .assign_created(operation, server_id)
                .map_err(ApiError::from)?;
        }

        if track_versions {
            batch.versions.capture_versions(operation, result.data.as_ref());
        }

        guard.after_operation(ctx, &result).await?;

        if self.options.log_operations {
            log_event_with_fields(Event::OperationCompleted, &[("index", &index_field)]);
        }
        self.metrics.increment_operations_processed();
        batch.results.push(result);
        Ok(())
    }

    /// Turn an operation failure into the batch error
    fn attribute(&self, index: usize, error: OperationError) -> AtomicError {
        match error {
            OperationError::Api(error) => AtomicError::Api(error.at_operation(index)),
            OperationError::Canceled => AtomicError::Canceled,
            OperationError::Unexpected(cause) => {
                log_event_with_fields(
                    Event::OperationFailed,
                    &[("index", &index.to_string()), ("error", &cause.to_string())],
                );
                AtomicError::Api(ApiError::failed_operation(
                    index,
                    cause,
                    self.options.include_error_causes,
                ))
            }
        }
    }

    async fn abort(
        &self,
        guard: TransactionGuard,
        scope: ObservationScope<'_>,
        error: &AtomicError,
    ) {
        // The original failure is reported even if rollback fails too
        let _ = guard.rollback().await;
        self.metrics.increment_batches_rolled_back();
        self.close_failed(scope, error);
    }

    fn close_failed(&self, scope: ObservationScope<'_>, error: &AtomicError) {
        match error {
            AtomicError::Canceled => {
                self.metrics.increment_batches_canceled();
                log_event_with_fields(Event::BatchCanceled, &[]);
                scope.reject("canceled");
            }
            AtomicError::Api(api) if api.status_code() >= 500 => scope.fail(&api.to_string()),
            AtomicError::Api(api) => scope.reject(&api.to_string()),
        }
    }
}

/// Failure outside any single operation: begin or commit
fn batch_error(error: OperationError) -> AtomicError {
    match error {
        OperationError::Api(error) => AtomicError::Api(error),
        OperationError::Canceled => AtomicError::Canceled,
        OperationError::Unexpected(cause) => AtomicError::Api(ApiError::internal(cause)),
    }
}

fn first_pointer(error: &ApiError) -> &str {
    error
        .errors()
        .first()
        .and_then(|e| e.pointer())
        .unwrap_or_default()
}
