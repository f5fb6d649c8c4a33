//! In-Memory Transactions

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::store::InMemoryStore;
use crate::error::OperationError;
use crate::operations::{OperationContext, OperationResult};
use crate::transaction::{OperationsTransaction, TransactionFactory};
use crate::BoxFuture;

/// Opens snapshot transactions on an [`InMemoryStore`]
#[derive(Debug, Clone)]
pub struct InMemoryTransactionFactory {
    store: Arc<InMemoryStore>,
}

impl InMemoryTransactionFactory {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

impl TransactionFactory for InMemoryTransactionFactory {
    fn begin_transaction<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Box<dyn OperationsTransaction>, OperationError>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(OperationError::Canceled);
            }
            let transaction_id = self.store.begin()?;
            Ok(Box::new(InMemoryTransaction {
                store: Arc::clone(&self.store),
                transaction_id,
                finished: false,
            }) as Box<dyn OperationsTransaction>)
        })
    }
}

/// Working copy of the store for one batch
///
/// Dropped without commit or rollback, the working copy is discarded.
#[derive(Debug)]
pub struct InMemoryTransaction {
    store: Arc<InMemoryStore>,
    transaction_id: Uuid,
    finished: bool,
}

impl OperationsTransaction for InMemoryTransaction {
    fn transaction_id(&self) -> Uuid {
        self.transaction_id
    }

    fn before_operation<'a>(
        &'a mut self,
        ctx: OperationContext<'a>,
    ) -> BoxFuture<'a, Result<(), OperationError>> {
        let open = self.store.is_pending(self.transaction_id);
        let enlisted = ctx.operation.transaction_id() == Some(self.transaction_id);
        Box::pin(async move {
            if !open {
                return Err(OperationError::unexpected("Transaction is no longer open"));
            }
            if !enlisted {
                return Err(OperationError::unexpected("Operation belongs to another transaction"));
            }
            Ok(())
        })
    }

    fn after_operation<'a>(
        &'a mut self,
        _ctx: OperationContext<'a>,
        _result: &'a OperationResult,
    ) -> BoxFuture<'a, Result<(), OperationError>> {
        Box::pin(async { Ok(()) })
    }

    fn commit(mut self: Box<Self>) -> BoxFuture<'static, Result<(), OperationError>> {
        self.finished = true;
        let outcome = self.store.commit(self.transaction_id);
        Box::pin(async move { outcome })
    }

    fn rollback(mut self: Box<Self>) -> BoxFuture<'static, Result<(), OperationError>> {
        self.finished = true;
        self.store.discard(self.transaction_id);
        Box::pin(async { Ok(()) })
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.store.discard(self.transaction_id);
        }
    }
}
