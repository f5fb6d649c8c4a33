//! # In-Memory Backend
//!
//! Reference storage for the atomic operations engine: a versioned
//! resource store, snapshot transactions over it, and processors for all
//! six operation kinds. Suitable for tests and embedding.
//!
//! ```ignore
//! let store = Arc::new(InMemoryStore::new(Arc::clone(&graph)));
//! let processor = AtomicOperationsProcessor::new(
//!     graph,
//!     Arc::new(InMemoryProcessor::registry(Arc::clone(&store))),
//!     Arc::new(InMemoryTransactionFactory::new(store)),
//! );
//! ```

mod processors;
mod store;
mod transaction;

pub use processors::InMemoryProcessor;
pub use store::InMemoryStore;
pub use transaction::{InMemoryTransaction, InMemoryTransactionFactory};
