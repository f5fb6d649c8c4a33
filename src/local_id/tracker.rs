//! Local ID Tracker
//!
//! Per-batch table mapping client-chosen local IDs to their declared
//! resource type and, once the creating operation has run, the
//! server-assigned ID.

use std::collections::HashMap;

use super::errors::{LocalIdError, LocalIdResult};

/// A declared local ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdEntry {
    resource_type: String,
    assigned_id: Option<String>,
}

impl LocalIdEntry {
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn assigned_id(&self) -> Option<&str> {
        self.assigned_id.as_deref()
    }
}

/// Request-scoped local ID table
#[derive(Debug, Default)]
pub struct LocalIdTracker {
    entries: HashMap<String, LocalIdEntry>,
}

impl LocalIdTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every declared local ID
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Declare a local ID for a resource type
    pub fn declare(&mut self, local_id: &str, resource_type: &str) -> LocalIdResult<()> {
        if self.entries.contains_key(local_id) {
            return Err(LocalIdError::DuplicateLocalId {
                local_id: local_id.to_string(),
            });
        }

        self.entries.insert(
            local_id.to_string(),
            LocalIdEntry {
                resource_type: resource_type.to_string(),
                assigned_id: None,
            },
        );
        Ok(())
    }

    /// Record the server-assigned ID of a declared local ID
    pub fn assign(
        &mut self,
        local_id: &str,
        resource_type: &str,
        server_id: &str,
    ) -> LocalIdResult<()> {
        let entry = self.declared_entry_mut(local_id, resource_type)?;

        if entry.assigned_id.is_some() {
            return Err(LocalIdError::LocalIdAlreadyAssigned {
                local_id: local_id.to_string(),
            });
        }

        entry.assigned_id = Some(server_id.to_string());
        Ok(())
    }

    /// Server-assigned ID of a local ID
    pub fn get_value(&self, local_id: &str, resource_type: &str) -> LocalIdResult<&str> {
        let entry = self
            .entries
            .get(local_id)
            .ok_or_else(|| LocalIdError::LocalIdNotDeclared {
                local_id: local_id.to_string(),
            })?;
        assert_same_type(local_id, entry, resource_type)?;

        entry
            .assigned_id
            .as_deref()
            .ok_or_else(|| LocalIdError::LocalIdNotYetAssigned {
                local_id: local_id.to_string(),
            })
    }

    /// Look up an entry without any checks
    pub fn entry(&self, local_id: &str) -> Option<&LocalIdEntry> {
        self.entries.get(local_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn declared_entry_mut(
        &mut self,
        local_id: &str,
        resource_type: &str,
    ) -> LocalIdResult<&mut LocalIdEntry> {
        let entry = self
            .entries
            .get_mut(local_id)
            .ok_or_else(|| LocalIdError::LocalIdNotDeclared {
                local_id: local_id.to_string(),
            })?;
        assert_same_type(local_id, entry, resource_type)?;
        Ok(entry)
    }
}

fn assert_same_type(
    local_id: &str,
    entry: &LocalIdEntry,
    resource_type: &str,
) -> LocalIdResult<()> {
    if entry.resource_type != resource_type {
        return Err(LocalIdError::LocalIdTypeMismatch {
            local_id: local_id.to_string(),
            declared_type: entry.resource_type.clone(),
            requested_type: resource_type.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_assign_get() {
        let mut tracker = LocalIdTracker::new();
        tracker.declare("d1", "dogs").unwrap();
        tracker.assign("d1", "dogs", "42").unwrap();

        assert_eq!(tracker.get_value("d1", "dogs").unwrap(), "42");
        assert_eq!(tracker.entry("d1").unwrap().resource_type(), "dogs");
    }

    #[test]
    fn test_duplicate_declare() {
        let mut tracker = LocalIdTracker::new();
        tracker.declare("d1", "dogs").unwrap();

        let err = tracker.declare("d1", "dogs").unwrap_err();
        assert!(matches!(err, LocalIdError::DuplicateLocalId { .. }));

        // Duplicate with a different type is still a duplicate
        let err = tracker.declare("d1", "toys").unwrap_err();
        assert!(matches!(err, LocalIdError::DuplicateLocalId { .. }));
    }

    #[test]
    fn test_assign_undeclared() {
        let mut tracker = LocalIdTracker::new();
        let err = tracker.assign("d1", "dogs", "1").unwrap_err();
        assert!(matches!(err, LocalIdError::LocalIdNotDeclared { .. }));
    }

    #[test]
    fn test_assign_twice() {
        let mut tracker = LocalIdTracker::new();
        tracker.declare("d1", "dogs").unwrap();
        tracker.assign("d1", "dogs", "1").unwrap();

        let err = tracker.assign("d1", "dogs", "2").unwrap_err();
        assert!(matches!(err, LocalIdError::LocalIdAlreadyAssigned { .. }));
        assert_eq!(tracker.get_value("d1", "dogs").unwrap(), "1");
    }

    #[test]
    fn test_get_before_assign() {
        let mut tracker = LocalIdTracker::new();
        tracker.declare("d1", "dogs").unwrap();

        let err = tracker.get_value("d1", "dogs").unwrap_err();
        assert!(matches!(err, LocalIdError::LocalIdNotYetAssigned { .. }));
    }

    #[test]
    fn test_type_mismatch() {
        let mut tracker = LocalIdTracker::new();
        tracker.declare("d1", "dogs").unwrap();

        let err = tracker.assign("d1", "toys", "1").unwrap_err();
        assert!(matches!(err, LocalIdError::LocalIdTypeMismatch { .. }));

        tracker.assign("d1", "dogs", "1").unwrap();
        let err = tracker.get_value("d1", "toys").unwrap_err();
        assert_eq!(
            err,
            LocalIdError::LocalIdTypeMismatch {
                local_id: "d1".into(),
                declared_type: "dogs".into(),
                requested_type: "toys".into(),
            }
        );
    }

    #[test]
    fn test_reset_clears_table() {
        let mut tracker = LocalIdTracker::new();
        tracker.declare("d1", "dogs").unwrap();
        tracker.reset();

        assert!(tracker.is_empty());
        tracker.declare("d1", "dogs").unwrap();
        assert_eq!(tracker.len(), 1);
    }
}
