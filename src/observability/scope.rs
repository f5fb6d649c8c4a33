//! Observation scope for begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` when closed
//! - Logs `{name}_INCOMPLETE` when dropped without being closed, which
//!   happens when a batch future is dropped mid-flight

use std::time::Instant;

use super::logger::Logger;

/// A scope that logs start and end of a unit of work
///
/// ```ignore
/// let scope = ObservationScope::with_fields("ATOMIC_BATCH", &[("operations", "3")]);
/// // ... process ...
/// scope.complete_with_fields(&[("results", "3")]);
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    closed: bool,
    fields: Vec<(&'a str, String)>,
    started_at: Instant,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);

        Self {
            name,
            closed: false,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started_at: Instant::now(),
        }
    }

    /// Attach a field to every later log line of this scope
    pub fn record(&mut self, key: &'a str, value: impl Into<String>) {
        self.fields.push((key, value.into()));
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.closed = true;
        let elapsed = self.elapsed_ms();
        let mut fields = self.field_refs();
        fields.push(("elapsed_ms", &elapsed));
        fields.extend(extra.iter().copied());
        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }

    /// Close the scope as failed; logged at WARN for client-caused failures
    pub fn reject(mut self, reason: &str) {
        self.closed = true;
        let mut fields = self.field_refs();
        fields.push(("reason", reason));
        Logger::warn(&format!("{}_REJECTED", self.name), &fields);
    }

    /// Close the scope as failed; logged at ERROR
    pub fn fail(mut self, reason: &str) {
        self.closed = true;
        let mut fields = self.field_refs();
        fields.push(("reason", reason));
        Logger::error(&format!("{}_FAILED", self.name), &fields);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn elapsed_ms(&self) -> String {
        self.started_at.elapsed().as_millis().to_string()
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.closed {
            let fields = self.field_refs();
            Logger::warn(&format!("{}_INCOMPLETE", self.name), &fields);
        }
    }
}
