//! # Version Tracking
//!
//! Optimistic concurrency within an atomic operations batch. After each
//! operation the versions of touched resources are captured, so a later
//! operation on the same resource carries the token produced by the earlier
//! one rather than the stale token the client sent.
//!
//! A version that becomes unknown (delete, relationship change without a
//! returned resource) is removed instead of left behind.

use std::collections::HashMap;
use std::sync::Arc;

use crate::operations::{Operation, OperationKind, ResourceIdentity, ResourceObject};
use crate::resource_graph::ResourceGraph;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VersionKey {
    resource_type: String,
    id: String,
}

impl VersionKey {
    fn new(resource_type: &str, id: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }
}

/// Request-scoped table of the latest known resource versions
///
/// Built once per atomic operations batch.
#[derive(Debug)]
pub struct VersionTracker {
    graph: Arc<ResourceGraph>,
    versions: HashMap<VersionKey, String>,
}

impl VersionTracker {
    pub fn new(graph: Arc<ResourceGraph>) -> Self {
        Self {
            graph,
            versions: HashMap::new(),
        }
    }

    /// Whether the operation involves any versioned resource type
    ///
    /// Either the primary type or the right side of a targeted relationship
    /// must be versioned.
    pub fn requires_version_tracking(&self, operation: &Operation) -> bool {
        let Some(primary) = self.graph.get(operation.type_name()) else {
            return false;
        };
        if primary.is_versioned() {
            return true;
        }

        operation
            .targeted_fields()
            .relationships
            .iter()
            .filter_map(|name| primary.relationship(name))
            .any(|relationship| self.graph.is_right_side_versioned(relationship))
    }

    /// Record versions after an operation completed
    ///
    /// `resource` is the resource returned by the operation, if any. When
    /// nothing was returned the versions of the touched resources are
    /// unknown and get removed.
    pub fn capture_versions(&mut self, operation: &Operation, resource: Option<&ResourceObject>) {
        match resource {
            Some(resource) => self.capture_from_resource(operation, resource),
            None => self.forget_touched(operation),
        }
    }

    /// Last captured version of a resource
    pub fn get_version(&self, resource_type: &str, id: &str) -> Option<&str> {
        self.versions
            .get(&VersionKey::new(resource_type, id))
            .map(String::as_str)
    }

    /// Fill in tracked versions the operation does not carry itself
    ///
    /// A version captured earlier in the batch wins over the one sent by
    /// the client, because the earlier operation already changed it.
    pub fn apply_tracked_versions(&self, operation: &mut Operation) {
        let primary = operation.identity_mut();
        if let Some(version) = self.tracked_version_of(primary) {
            primary.version = Some(version);
        }

        let updates: Vec<(usize, String)> = operation
            .secondary_resources()
            .enumerate()
            .filter_map(|(position, identity)| {
                self.tracked_version_of(identity).map(|v| (position, v))
            })
            .collect();

        if updates.is_empty() {
            return;
        }

        let mut updates = updates.into_iter().peekable();
        for (position, identity) in operation.secondary_resources_mut().enumerate() {
            if let Some((_, version)) = updates.next_if(|(p, _)| *p == position) {
                identity.version = Some(version);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    fn tracked_version_of(&self, identity: &ResourceIdentity) -> Option<String> {
        let id = identity.id.as_deref()?;
        self.get_version(&identity.type_name, id).map(str::to_string)
    }

    fn capture_from_resource(&mut self, operation: &Operation, resource: &ResourceObject) {
        let graph = Arc::clone(&self.graph);
        let Some(resource_type) = graph.get(resource.type_name()) else {
            return;
        };

        if resource_type.is_versioned() {
            if let Some(id) = resource.id() {
                self.set_version(resource.type_name(), id, resource.identity.version.as_deref());
            }
        }

        for name in &operation.targeted_fields().relationships {
            let Some(relationship) = resource_type.relationship(name) else {
                continue;
            };
            if !graph.is_right_side_versioned(relationship) {
                continue;
            }
            let Some(data) = resource.relationships.get(name) else {
                continue;
            };
            for related in data.iter() {
                if let Some(ref id) = related.id {
                    self.set_version(relationship.right_type(), id, related.version.as_deref());
                }
            }
        }
    }

    fn forget_touched(&mut self, operation: &Operation) {
        let graph = Arc::clone(&self.graph);
        let Some(resource_type) = graph.get(operation.type_name()) else {
            return;
        };

        if resource_type.is_versioned() {
            if let Some(id) = operation.resource().id() {
                self.set_version(operation.type_name(), id, None);
            }
        }

        // A deleted resource takes no related resources with it
        if operation.kind() == OperationKind::DeleteResource {
            return;
        }

        for name in &operation.targeted_fields().relationships {
            let Some(relationship) = resource_type.relationship(name) else {
                continue;
            };
            if !graph.is_right_side_versioned(relationship) {
                continue;
            }
            let ids: Vec<String> = operation
                .resource()
                .relationships
                .get(name)
                .map(|data| data.iter().filter_map(|r| r.id.clone()).collect())
                .unwrap_or_default();
            for id in ids {
                self.set_version(relationship.right_type(), &id, None);
            }
        }
    }

    fn set_version(&mut self, resource_type: &str, id: &str, version: Option<&str>) {
        let key = VersionKey::new(resource_type, id);
        match version {
            Some(version) => {
                self.versions.insert(key, version.to_string());
            }
            None => {
                self.versions.remove(&key);
            }
        }
    }
}
