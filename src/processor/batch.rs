//! Per-Batch State
//!
//! Everything that lives exactly as long as one atomic operations request:
//! the local ID table, the version table and the results collected so far.

use std::sync::Arc;

use crate::local_id::{LocalIdResult, LocalIdTracker};
use crate::operations::{Operation, OperationKind, OperationResult, ResourceIdentity};
use crate::resource_graph::ResourceGraph;
use crate::versioning::VersionTracker;

pub(crate) struct BatchState {
    pub(crate) local_ids: LocalIdTracker,
    pub(crate) versions: VersionTracker,
    pub(crate) results: Vec<OperationResult>,
}

impl BatchState {
    /// Start execution with the tracker used during validation
    ///
    /// The tracker is reset: execution declares every local ID again, this
    /// time assigning real server IDs.
    pub(crate) fn new(
        mut local_ids: LocalIdTracker,
        graph: Arc<ResourceGraph>,
        capacity: usize,
    ) -> Self {
        local_ids.reset();
        Self {
            local_ids,
            versions: VersionTracker::new(graph),
            results: Vec::with_capacity(capacity),
        }
    }

    /// Replace local IDs in the operation with their server IDs
    ///
    /// A create declares its own local ID instead; it gets assigned once
    /// the processor returned the new resource.
    pub(crate) fn resolve_local_ids(&mut self, operation: &mut Operation) -> LocalIdResult<()> {
        let is_create = operation.kind() == OperationKind::CreateResource;

        let primary = operation.identity_mut();
        if is_create {
            if let Some(ref lid) = primary.lid {
                self.local_ids.declare(lid, &primary.type_name)?;
            }
        } else {
            resolve_identity(&self.local_ids, primary)?;
        }

        for secondary in operation.secondary_resources_mut() {
            resolve_identity(&self.local_ids, secondary)?;
        }

        Ok(())
    }

    /// Record the server ID of a created resource under its local ID
    pub(crate) fn assign_created(
        &mut self,
        operation: &Operation,
        server_id: &str,
    ) -> LocalIdResult<()> {
        let primary = &operation.resource().identity;
        match primary.lid {
            Some(ref lid) => self.local_ids.assign(lid, &primary.type_name, server_id),
            None => Ok(()),
        }
    }

    pub(crate) fn into_results(self) -> Vec<OperationResult> {
        self.results
    }
}

fn resolve_identity(
    local_ids: &LocalIdTracker,
    identity: &mut ResourceIdentity,
) -> LocalIdResult<()> {
    if let Some(ref lid) = identity.lid {
        let server_id = local_ids.get_value(lid, &identity.type_name)?.to_string();
        identity.id = Some(server_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_id::LocalIdError;
    use crate::operations::{RelationshipData, ResourceObject};
    use crate::resource_graph::ResourceType;

    fn state() -> BatchState {
        let graph = ResourceGraph::builder()
            .add(ResourceType::new("dogs"))
            .add(ResourceType::new("toys").with_to_one("owner", "dogs"))
            .build()
            .unwrap();
        BatchState::new(LocalIdTracker::new(), Arc::new(graph), 2)
    }

    #[test]
    fn test_new_resets_tracker() {
        let mut tracker = LocalIdTracker::new();
        tracker.declare("d1", "dogs").unwrap();
        let graph = Arc::new(ResourceGraph::builder().build().unwrap());

        let state = BatchState::new(tracker, graph, 0);
        assert!(state.local_ids.is_empty());
    }

    #[test]
    fn test_create_declares_then_assign() {
        let mut state = state();
        let mut create =
            Operation::create(ResourceObject::new(ResourceIdentity::with_lid("dogs", "d1")));

        state.resolve_local_ids(&mut create).unwrap();
        assert_eq!(create.resource().id(), None);
        assert!(state.local_ids.entry("d1").is_some());

        state.assign_created(&create, "42").unwrap();
        assert_eq!(state.local_ids.get_value("d1", "dogs").unwrap(), "42");
    }

    #[test]
    fn test_resolves_primary_and_secondary() {
        let mut state = state();
        state.local_ids.declare("d1", "dogs").unwrap();
        state.local_ids.assign("d1", "dogs", "42").unwrap();
        state.local_ids.declare("t1", "toys").unwrap();
        state.local_ids.assign("t1", "toys", "7").unwrap();

        let mut update = Operation::update(
            ResourceObject::new(ResourceIdentity::with_lid("toys", "t1")).with_relationship(
                "owner",
                RelationshipData::ToOne(Some(ResourceIdentity::with_lid("dogs", "d1"))),
            ),
        );
        state.resolve_local_ids(&mut update).unwrap();

        assert_eq!(update.resource().id(), Some("7"));
        let owner: Vec<_> = update.secondary_resources().map(|r| r.id.as_deref()).collect();
        assert_eq!(owner, vec![Some("42")]);
    }

    #[test]
    fn test_unassigned_reference_fails() {
        let mut state = state();
        state.local_ids.declare("d1", "dogs").unwrap();

        let mut delete = Operation::delete(ResourceIdentity::with_lid("dogs", "d1"));
        let err = state.resolve_local_ids(&mut delete).unwrap_err();
        assert!(matches!(err, LocalIdError::LocalIdNotYetAssigned { .. }));
    }
}
