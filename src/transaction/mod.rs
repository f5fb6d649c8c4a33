//! # Operations Transaction
//!
//! Narrow contract between the orchestrator and the store transaction that
//! encloses a batch. Implementations decide what a transaction is (a
//! database transaction, a staged copy, ...). The orchestrator only begins
//! it, calls the hooks around each operation, and then either commits or
//! rolls back.
//!
//! Dropping a transaction that was neither committed nor rolled back must
//! discard its changes. This covers batches whose future is dropped
//! mid-flight.

mod guard;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::OperationError;
use crate::operations::{OperationContext, OperationResult};
use crate::BoxFuture;

pub use guard::{TransactionGuard, TransactionState};

/// A transaction enclosing one atomic operations batch
pub trait OperationsTransaction: Send {
    /// Identifier stamped on every operation of the batch
    fn transaction_id(&self) -> Uuid;

    /// Called before each operation is dispatched
    fn before_operation<'a>(
        &'a mut self,
        ctx: OperationContext<'a>,
    ) -> BoxFuture<'a, Result<(), OperationError>>;

    /// Called after each operation completed successfully
    fn after_operation<'a>(
        &'a mut self,
        ctx: OperationContext<'a>,
        result: &'a OperationResult,
    ) -> BoxFuture<'a, Result<(), OperationError>>;

    /// Make all changes of the batch durable
    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), OperationError>>;

    /// Discard all changes of the batch
    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), OperationError>>;
}

/// Opens transactions for atomic operations batches
pub trait TransactionFactory: Send + Sync {
    fn begin_transaction<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Box<dyn OperationsTransaction>, OperationError>>;
}
