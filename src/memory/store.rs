//! In-Memory Resource Store
//!
//! Committed resources live in one snapshot. Every open transaction works
//! on its own copy of that snapshot; commit publishes the copy, anything
//! else drops it. A commit whose copy was taken before another commit
//! landed is rejected with 409.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use crate::error::{ApiError, ErrorObject, OperationError};
use crate::operations::{RelationshipData, ResourceIdentity, ResourceObject};
use crate::resource_graph::{RelationshipInfo, ResourceGraph, ResourceType};

type Table = BTreeMap<String, ResourceObject>;

/// All resources, by type and then by ID
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    tables: HashMap<String, Table>,
}

impl Snapshot {
    pub(crate) fn get(&self, type_name: &str, id: &str) -> Option<&ResourceObject> {
        self.tables.get(type_name).and_then(|t| t.get(id))
    }

    pub(crate) fn get_mut(&mut self, type_name: &str, id: &str) -> Option<&mut ResourceObject> {
        self.tables.get_mut(type_name).and_then(|t| t.get_mut(id))
    }

    pub(crate) fn contains(&self, type_name: &str, id: &str) -> bool {
        self.get(type_name, id).is_some()
    }

    pub(crate) fn put(&mut self, resource: ResourceObject) {
        let id = resource.id().unwrap_or_default().to_string();
        self.tables
            .entry(resource.type_name().to_string())
            .or_default()
            .insert(id, resource);
    }

    pub(crate) fn remove(&mut self, type_name: &str, id: &str) -> Option<ResourceObject> {
        self.tables.get_mut(type_name).and_then(|t| t.remove(id))
    }

    fn count(&self, type_name: &str) -> usize {
        self.tables.get(type_name).map_or(0, BTreeMap::len)
    }
}

#[derive(Debug)]
struct WorkingCopy {
    base_generation: u64,
    snapshot: Snapshot,
}

#[derive(Debug, Default)]
struct StoreState {
    committed: Snapshot,
    generation: u64,
    pending: HashMap<Uuid, WorkingCopy>,
}

/// Versioned resource store kept in memory
///
/// Versioned resource types carry an integer version that starts at 1 and
/// is bumped on every write.
#[derive(Debug)]
pub struct InMemoryStore {
    graph: Arc<ResourceGraph>,
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new(graph: Arc<ResourceGraph>) -> Self {
        Self {
            graph,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn graph(&self) -> &Arc<ResourceGraph> {
        &self.graph
    }

    /// Committed state of a resource
    pub fn get(&self, type_name: &str, id: &str) -> Option<ResourceObject> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.committed.get(type_name, id).cloned()
    }

    /// Number of committed resources of a type
    pub fn count(&self, type_name: &str) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.committed.count(type_name)
    }

    /// Number of transactions neither committed nor discarded
    pub fn pending_transactions(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.pending.len()
    }

    /// Number of commits so far
    pub fn generation(&self) -> u64 {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.generation
    }

    /// Seed a committed resource outside of any transaction
    ///
    /// Gets a generated ID when it has none and version 1 when its type is
    /// versioned. Returns the stored resource.
    pub fn insert(&self, resource: ResourceObject) -> Result<ResourceObject, ApiError> {
        let resource_type = self.graph.require(resource.type_name())?;
        let stored = new_stored(resource_type, resource);

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.committed.contains(stored.type_name(), stored.id().unwrap_or_default()) {
            return Err(already_exists(&stored));
        }
        state.committed.put(stored.clone());
        state.generation += 1;
        Ok(stored)
    }

    pub(crate) fn begin(&self) -> Result<Uuid, OperationError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let transaction_id = Uuid::new_v4();
        let copy = WorkingCopy {
            base_generation: state.generation,
            snapshot: state.committed.clone(),
        };
        state.pending.insert(transaction_id, copy);
        Ok(transaction_id)
    }

    pub(crate) fn is_pending(&self, transaction_id: Uuid) -> bool {
        self.state
            .read()
            .map(|state| state.pending.contains_key(&transaction_id))
            .unwrap_or(false)
    }

    /// Run `f` against the working copy of a transaction
    pub(crate) fn with_working_copy<R>(
        &self,
        transaction_id: Uuid,
        f: impl FnOnce(&mut Snapshot) -> Result<R, OperationError>,
    ) -> Result<R, OperationError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let copy = state
            .pending
            .get_mut(&transaction_id)
            .ok_or_else(|| unknown_transaction(transaction_id))?;
        f(&mut copy.snapshot)
    }

    pub(crate) fn commit(&self, transaction_id: Uuid) -> Result<(), OperationError> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let copy = state
            .pending
            .remove(&transaction_id)
            .ok_or_else(|| unknown_transaction(transaction_id))?;

        if copy.base_generation != state.generation {
            return Err(ApiError::new(
                ErrorObject::new(409, "Conflicting concurrent update.").with_detail(
                    "Another request changed the data while this request was running.",
                ),
            )
            .into());
        }

        state.committed = copy.snapshot;
        state.generation += 1;
        Ok(())
    }

    pub(crate) fn discard(&self, transaction_id: Uuid) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.pending.remove(&transaction_id);
    }
}

/// Shape a new resource for storage
pub(crate) fn new_stored(resource_type: &ResourceType, resource: ResourceObject) -> ResourceObject {
    let id = resource
        .identity
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut identity = ResourceIdentity::with_id(resource.type_name(), id);
    if resource_type.is_versioned() {
        identity.version = Some(1.to_string());
    }

    let mut stored = ResourceObject::new(identity);
    stored.attributes = resource.attributes;
    for (name, data) in resource.relationships {
        stored.relationships.insert(name, stored_relationship(data));
    }
    stored
}

/// Keep only type and ID of related resources
pub(crate) fn stored_relationship(data: RelationshipData) -> RelationshipData {
    fn bare(identity: ResourceIdentity) -> Option<ResourceIdentity> {
        identity
            .id
            .map(|id| ResourceIdentity::with_id(identity.type_name, id))
    }

    match data {
        RelationshipData::ToOne(related) => RelationshipData::ToOne(related.and_then(bare)),
        RelationshipData::ToMany(related) => {
            RelationshipData::ToMany(related.into_iter().filter_map(bare).collect())
        }
    }
}

/// Bump the integer version of a stored resource of a versioned type
pub(crate) fn bump_version(resource: &mut ResourceObject) {
    if let Some(ref mut version) = resource.identity.version {
        let next = version.parse::<u64>().unwrap_or(0) + 1;
        *version = next.to_string();
    }
}

/// Fail with 412 when a supplied version differs from the stored one
pub(crate) fn check_version(
    stored: &ResourceObject,
    supplied: Option<&str>,
    pointer: &str,
) -> Result<(), ApiError> {
    match (supplied, stored.identity.version.as_deref()) {
        (Some(supplied), Some(current)) if supplied != current => Err(ApiError::new(
            ErrorObject::new(412, "The resource version does not match.")
                .with_detail(format!(
                    "Resource of type '{}' with ID '{}' is at version '{}', not '{}'.",
                    stored.type_name(),
                    stored.id().unwrap_or_default(),
                    current,
                    supplied
                ))
                .with_pointer(pointer),
        )),
        _ => Ok(()),
    }
}

/// Check that every related resource exists and has the right type
pub(crate) fn check_related(
    snapshot: &Snapshot,
    relationship: &RelationshipInfo,
    data: &RelationshipData,
) -> Result<(), ApiError> {
    let pointer = format!("/data/relationships/{}/data", relationship.name());

    if data.is_to_many() != relationship.is_to_many() {
        let expected = if relationship.is_to_many() {
            "an array"
        } else {
            "a single resource or null"
        };
        return Err(ApiError::new(
            ErrorObject::new(400, "Invalid relationship data.")
                .with_detail(format!(
                    "Relationship '{}' expects {}.",
                    relationship.name(),
                    expected
                ))
                .with_pointer(pointer),
        ));
    }

    for related in data.iter() {
        if related.type_name != relationship.right_type() {
            return Err(ApiError::new(
                ErrorObject::new(409, "Incompatible resource type found.")
                    .with_detail(format!(
                        "Type '{}' is incompatible with type '{}' of relationship '{}'.",
                        related.type_name,
                        relationship.right_type(),
                        relationship.name()
                    ))
                    .with_pointer(pointer),
            ));
        }

        let id = related.id.as_deref().unwrap_or_default();
        let stored = snapshot.get(&related.type_name, id).ok_or_else(|| {
            ApiError::new(
                ErrorObject::new(404, "A related resource does not exist.")
                    .with_detail(format!(
                        "Related resource of type '{}' with ID '{}' in relationship '{}' does not exist.",
                        related.type_name,
                        id,
                        relationship.name()
                    ))
                    .with_pointer(pointer.clone()),
            )
        })?;
        check_version(stored, related.version.as_deref(), &pointer)?;
    }

    Ok(())
}

pub(crate) fn not_found(type_name: &str, id: &str) -> ApiError {
    ApiError::not_found(
        "The requested resource does not exist.",
        format!("Resource of type '{}' with ID '{}' does not exist.", type_name, id),
    )
}

pub(crate) fn already_exists(resource: &ResourceObject) -> ApiError {
    ApiError::new(
        ErrorObject::new(409, "Another resource with the specified ID already exists.")
            .with_detail(format!(
                "Another resource of type '{}' with ID '{}' already exists.",
                resource.type_name(),
                resource.id().unwrap_or_default()
            ))
            .with_pointer("/data/id"),
    )
}

fn lock_poisoned<T>(_: PoisonError<T>) -> OperationError {
    OperationError::unexpected("In-memory store lock was poisoned")
}

fn unknown_transaction(transaction_id: Uuid) -> OperationError {
    OperationError::unexpected(format!("Transaction {} is not open", transaction_id))
}
