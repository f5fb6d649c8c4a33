//! Observability for atomic operations batches
//!
//! - Structured JSON logging ([`Logger`])
//! - Typed lifecycle events ([`Event`])
//! - Begin/complete scopes ([`ObservationScope`])
//! - Monotonic counters ([`MetricsRegistry`])
//!
//! Observability never affects the outcome of a batch.

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
