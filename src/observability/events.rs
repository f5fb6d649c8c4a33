//! Observable events of the atomic operations engine

use std::fmt;

use super::logger::Severity;

/// Lifecycle events of a batch and its transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Batch
    /// Batch exceeded the configured operation limit
    BatchTooLarge,
    /// Local ID validation rejected the batch
    LocalIdValidationFailed,
    /// Batch stopped because the client canceled
    BatchCanceled,

    // Transaction
    TransactionBegin,
    TransactionCommit,
    TransactionRollback,
    /// Guard dropped with the transaction still open
    TransactionAbandoned,

    // Operations
    OperationDispatched,
    OperationCompleted,
    OperationFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BatchTooLarge => "ATOMIC_BATCH_TOO_LARGE",
            Event::LocalIdValidationFailed => "LOCAL_ID_VALIDATION_FAILED",
            Event::BatchCanceled => "ATOMIC_BATCH_CANCELED",

            Event::TransactionBegin => "TRANSACTION_BEGIN",
            Event::TransactionCommit => "TRANSACTION_COMMIT",
            Event::TransactionRollback => "TRANSACTION_ROLLBACK",
            Event::TransactionAbandoned => "TRANSACTION_ABANDONED",

            Event::OperationDispatched => "OPERATION_DISPATCHED",
            Event::OperationCompleted => "OPERATION_COMPLETED",
            Event::OperationFailed => "OPERATION_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::OperationDispatched | Event::OperationCompleted => Severity::Trace,
            Event::TransactionBegin | Event::TransactionCommit | Event::BatchCanceled => {
                Severity::Info
            }
            Event::BatchTooLarge
            | Event::LocalIdValidationFailed
            | Event::TransactionRollback
            | Event::TransactionAbandoned => Severity::Warn,
            Event::OperationFailed => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
