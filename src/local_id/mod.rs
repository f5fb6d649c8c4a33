//! # Local IDs
//!
//! Bookkeeping for client-chosen local IDs within one atomic operations
//! batch.
//!
//! ## Rules
//!
//! - A local ID is declared once, by the operation that creates it
//! - Its resource type never changes for the rest of the batch
//! - It is assigned a server ID at most once
//! - It can only be read after it was assigned

mod errors;
mod tracker;
mod validator;

pub use errors::{LocalIdError, LocalIdResult};
pub use tracker::{LocalIdEntry, LocalIdTracker};
pub use validator::LocalIdValidator;
