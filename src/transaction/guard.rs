//! Transaction Guard
//!
//! Owns the open transaction for the duration of a batch. Commit and
//! rollback are explicit and consume the guard. A guard dropped while the
//! transaction is still open drops the transaction too, which discards it,
//! and logs the abandonment.

use uuid::Uuid;

use super::OperationsTransaction;
use crate::error::OperationError;
use crate::observability::{log_event_with_fields, Event};
use crate::operations::{OperationContext, OperationResult};

/// Lifecycle of a guarded transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// Scope guard around an [`OperationsTransaction`]
pub struct TransactionGuard {
    inner: Option<Box<dyn OperationsTransaction>>,
    transaction_id: Uuid,
    state: TransactionState,
}

impl TransactionGuard {
    pub fn new(transaction: Box<dyn OperationsTransaction>) -> Self {
        let transaction_id = transaction.transaction_id();
        log_event_with_fields(
            Event::TransactionBegin,
            &[("transaction_id", &transaction_id.to_string())],
        );

        Self {
            inner: Some(transaction),
            transaction_id,
            state: TransactionState::Open,
        }
    }

    pub fn transaction_id(&self) -> Uuid {
        self.transaction_id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub async fn before_operation(
        &mut self,
        ctx: OperationContext<'_>,
    ) -> Result<(), OperationError> {
        self.open_transaction()?.before_operation(ctx).await
    }

    pub async fn after_operation(
        &mut self,
        ctx: OperationContext<'_>,
        result: &OperationResult,
    ) -> Result<(), OperationError> {
        self.open_transaction()?.after_operation(ctx, result).await
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), OperationError> {
        let transaction = self.take_open()?;
        transaction.commit().await?;

        self.state = TransactionState::Committed;
        log_event_with_fields(
            Event::TransactionCommit,
            &[("transaction_id", &self.transaction_id.to_string())],
        );
        Ok(())
    }

    /// Roll the transaction back
    pub async fn rollback(mut self) -> Result<(), OperationError> {
        let transaction = self.take_open()?;
        let outcome = transaction.rollback().await;

        self.state = TransactionState::RolledBack;
        log_event_with_fields(
            Event::TransactionRollback,
            &[
                ("transaction_id", &self.transaction_id.to_string()),
                ("clean", if outcome.is_ok() { "true" } else { "false" }),
            ],
        );
        outcome
    }

    fn open_transaction(
        &mut self,
    ) -> Result<&mut (dyn OperationsTransaction + 'static), OperationError> {
        self.inner
            .as_deref_mut()
            .ok_or_else(|| OperationError::unexpected("Transaction is no longer open"))
    }

    fn take_open(&mut self) -> Result<Box<dyn OperationsTransaction>, OperationError> {
        self.inner
            .take()
            .ok_or_else(|| OperationError::unexpected("Transaction is no longer open"))
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            log_event_with_fields(
                Event::TransactionAbandoned,
                &[("transaction_id", &self.transaction_id.to_string())],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
        drops: AtomicUsize,
    }

    struct CountingTransaction {
        counters: Arc<Counters>,
    }

    impl Drop for CountingTransaction {
        fn drop(&mut self) {
            self.counters.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl OperationsTransaction for CountingTransaction {
        fn transaction_id(&self) -> Uuid {
            Uuid::nil()
        }

        fn before_operation<'a>(
            &'a mut self,
            _ctx: OperationContext<'a>,
        ) -> BoxFuture<'a, Result<(), OperationError>> {
            Box::pin(async { Ok(()) })
        }

        fn after_operation<'a>(
            &'a mut self,
            _ctx: OperationContext<'a>,
            _result: &'a OperationResult,
        ) -> BoxFuture<'a, Result<(), OperationError>> {
            Box::pin(async { Ok(()) })
        }

        fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), OperationError>> {
            self.counters.commits.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }

        fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), OperationError>> {
            self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    fn guard(counters: &Arc<Counters>) -> TransactionGuard {
        TransactionGuard::new(Box::new(CountingTransaction {
            counters: Arc::clone(counters),
        }))
    }

    #[tokio::test]
    async fn test_commit() {
        let counters = Arc::new(Counters::default());
        let guard = guard(&counters);
        assert_eq!(guard.state(), TransactionState::Open);

        guard.commit().await.unwrap();
        assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 0);
        assert_eq!(counters.drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rollback() {
        let counters = Arc::new(Counters::default());
        guard(&counters).rollback().await.unwrap();

        assert_eq!(counters.commits.load(Ordering::SeqCst), 0);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_discards_open_transaction() {
        let counters = Arc::new(Counters::default());
        drop(guard(&counters));

        assert_eq!(counters.commits.load(Ordering::SeqCst), 0);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 0);
        assert_eq!(counters.drops.load(Ordering::SeqCst), 1);
    }
}
