//! In-Memory Operation Processors
//!
//! One processor serves all six operation kinds against the working copy
//! of the operation's transaction.

use std::sync::Arc;

use serde_json::Map;

use super::store::{
    already_exists, bump_version, check_related, check_version, new_stored, not_found,
    stored_relationship, InMemoryStore, Snapshot,
};
use crate::dispatch::{OperationProcessor, ProcessorRegistry};
use crate::error::{ApiError, OperationError};
use crate::operations::{
    Operation, OperationContext, OperationKind, OperationResult, RelationshipData, ResourceIdentity,
    ResourceObject,
};
use crate::resource_graph::ResourceType;
use crate::BoxFuture;

const DATA_POINTER: &str = "/data";

/// Processes every operation kind against an [`InMemoryStore`]
#[derive(Debug, Clone)]
pub struct InMemoryProcessor {
    store: Arc<InMemoryStore>,
}

impl InMemoryProcessor {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }

    /// Registry with this processor registered for all kinds
    pub fn registry(store: Arc<InMemoryStore>) -> ProcessorRegistry {
        let processor: Arc<dyn OperationProcessor> = Arc::new(Self::new(store));
        OperationKind::ALL
            .into_iter()
            .fold(ProcessorRegistry::new(), |registry, kind| {
                registry.with_shared_processor(kind, Arc::clone(&processor))
            })
    }

    fn apply(&self, ctx: OperationContext<'_>) -> Result<OperationResult, OperationError> {
        let operation = ctx.operation;
        let transaction_id = operation.transaction_id().ok_or_else(|| {
            OperationError::unexpected("Operation is not enlisted in a transaction")
        })?;

        self.store.with_working_copy(transaction_id, |snapshot| {
            let outcome = match operation.kind() {
                OperationKind::CreateResource => create(snapshot, ctx.resource_type, operation),
                OperationKind::UpdateResource => update(snapshot, ctx.resource_type, operation),
                OperationKind::DeleteResource => delete(snapshot, operation),
                OperationKind::SetRelationship
                | OperationKind::AddToRelationship
                | OperationKind::RemoveFromRelationship => {
                    change_relationship(snapshot, ctx.resource_type, operation)
                }
            };
            outcome.map_err(OperationError::from)
        })
    }
}

impl OperationProcessor for InMemoryProcessor {
    fn process<'a>(
        &'a self,
        ctx: OperationContext<'a>,
    ) -> BoxFuture<'a, Result<OperationResult, OperationError>> {
        Box::pin(async move {
            if ctx.cancel.is_cancelled() {
                return Err(OperationError::Canceled);
            }
            self.apply(ctx)
        })
    }
}

fn create(
    snapshot: &mut Snapshot,
    resource_type: &ResourceType,
    operation: &Operation,
) -> Result<OperationResult, ApiError> {
    let targeted = targeted_resource(operation);
    check_targeted_relationships(snapshot, resource_type, operation)?;

    let stored = new_stored(resource_type, targeted);
    if snapshot.contains(stored.type_name(), stored.id().unwrap_or_default()) {
        return Err(already_exists(&stored));
    }

    snapshot.put(stored.clone());
    Ok(OperationResult::with_data(stored))
}

fn update(
    snapshot: &mut Snapshot,
    resource_type: &ResourceType,
    operation: &Operation,
) -> Result<OperationResult, ApiError> {
    check_targeted_relationships(snapshot, resource_type, operation)?;

    let changes = targeted_resource(operation);
    let stored = existing_mut(snapshot, &operation.resource().identity)?;
    check_version(stored, operation.resource().identity.version.as_deref(), DATA_POINTER)?;

    merge_attributes(stored, &changes.attributes);
    for (name, data) in changes.relationships {
        stored.relationships.insert(name, stored_relationship(data));
    }
    bump_version(stored);

    Ok(OperationResult::with_data(stored.clone()))
}

fn delete(snapshot: &mut Snapshot, operation: &Operation) -> Result<OperationResult, ApiError> {
    let identity = &operation.resource().identity;
    let stored = existing_mut(snapshot, identity)?;
    check_version(stored, identity.version.as_deref(), DATA_POINTER)?;

    let id = stored.id().unwrap_or_default().to_string();
    snapshot.remove(&identity.type_name, &id);
    Ok(OperationResult::empty())
}

fn change_relationship(
    snapshot: &mut Snapshot,
    resource_type: &ResourceType,
    operation: &Operation,
) -> Result<OperationResult, ApiError> {
    let name = operation.relationship().ok_or_else(|| {
        ApiError::bad_request(
            "The 'ref.relationship' element is required.",
            format!("Operation '{}' must target a relationship.", operation.kind()),
        )
    })?;
    let relationship = resource_type.require_relationship(name)?;
    let data = operation
        .resource()
        .relationships
        .get(name)
        .cloned()
        .unwrap_or_else(|| empty_relationship(relationship.is_to_many()));

    if operation.kind() != OperationKind::SetRelationship && !relationship.is_to_many() {
        return Err(ApiError::bad_request(
            "Only to-many relationships can be targeted through this operation.",
            format!("Relationship '{}' is not a to-many relationship.", name),
        ));
    }
    check_related(snapshot, relationship, &data)?;

    let identity = &operation.resource().identity;
    let stored = existing_mut(snapshot, identity)?;
    check_version(stored, identity.version.as_deref(), DATA_POINTER)?;

    let data = stored_relationship(data);
    let current = stored
        .relationships
        .entry(name.to_string())
        .or_insert_with(|| empty_relationship(relationship.is_to_many()));

    match operation.kind() {
        OperationKind::AddToRelationship => {
            if let RelationshipData::ToMany(members) = current {
                for added in data.iter() {
                    if !members.contains(added) {
                        members.push(added.clone());
                    }
                }
            }
        }
        OperationKind::RemoveFromRelationship => {
            if let RelationshipData::ToMany(members) = current {
                members.retain(|member| !data.iter().any(|removed| removed == member));
            }
        }
        _ => *current = data,
    }
    bump_version(stored);

    Ok(OperationResult::empty())
}

/// The operation's resource narrowed to its targeted fields
fn targeted_resource(operation: &Operation) -> ResourceObject {
    let source = operation.resource();
    let targeted = operation.targeted_fields();

    let mut resource = ResourceObject::new(source.identity.clone());
    resource.attributes = source
        .attributes
        .iter()
        .filter(|(name, _)| targeted.attributes.contains(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect::<Map<_, _>>();
    resource.relationships = source
        .relationships
        .iter()
        .filter(|(name, _)| targeted.relationships.contains(*name))
        .map(|(name, data)| (name.clone(), data.clone()))
        .collect();
    resource
}

fn check_targeted_relationships(
    snapshot: &Snapshot,
    resource_type: &ResourceType,
    operation: &Operation,
) -> Result<(), ApiError> {
    for name in &operation.targeted_fields().relationships {
        let relationship = resource_type.require_relationship(name)?;
        if let Some(data) = operation.resource().relationships.get(name) {
            check_related(snapshot, relationship, data)?;
        }
    }
    Ok(())
}

fn existing_mut<'s>(
    snapshot: &'s mut Snapshot,
    identity: &ResourceIdentity,
) -> Result<&'s mut ResourceObject, ApiError> {
    let id = identity.id.as_deref().unwrap_or_default();
    snapshot
        .get_mut(&identity.type_name, id)
        .ok_or_else(|| not_found(&identity.type_name, id))
}

fn merge_attributes(stored: &mut ResourceObject, attributes: &Map<String, serde_json::Value>) {
    for (name, value) in attributes {
        stored.attributes.insert(name.clone(), value.clone());
    }
}

fn empty_relationship(to_many: bool) -> RelationshipData {
    if to_many {
        RelationshipData::ToMany(Vec::new())
    } else {
        RelationshipData::ToOne(None)
    }
}
