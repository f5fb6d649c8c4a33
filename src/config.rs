//! Atomic Operations Configuration
//!
//! Options controlling how batches are accepted and how failures are
//! reported.

use serde::{Deserialize, Serialize};

/// Options for [`AtomicOperationsProcessor`](crate::AtomicOperationsProcessor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicOptions {
    /// Largest accepted batch (default: 10, `null` for no limit)
    #[serde(default = "default_max_operations")]
    pub max_operations_per_request: Option<usize>,

    /// Copy the cause chain of unexpected failures into error meta (default: false)
    #[serde(default)]
    pub include_error_causes: bool,

    /// Log a line per dispatched operation (default: true)
    #[serde(default = "default_log_operations")]
    pub log_operations: bool,
}

fn default_max_operations() -> Option<usize> {
    Some(10)
}

fn default_log_operations() -> bool {
    true
}

impl Default for AtomicOptions {
    fn default() -> Self {
        Self {
            max_operations_per_request: default_max_operations(),
            include_error_causes: false,
            log_operations: default_log_operations(),
        }
    }
}

impl AtomicOptions {
    /// Load options from JSON; missing keys take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Options with a different batch limit
    pub fn with_max_operations(max: Option<usize>) -> Self {
        Self {
            max_operations_per_request: max,
            ..Default::default()
        }
    }

    /// Whether a batch of `count` operations is over the limit
    pub fn exceeds_limit(&self, count: usize) -> bool {
        self.max_operations_per_request
            .map_or(false, |max| count > max)
    }
}
