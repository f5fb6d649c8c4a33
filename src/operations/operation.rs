//! Atomic Operation Model
//!
//! One write inside an atomic operations batch. Operations are built once
//! per request and only touched afterwards to stamp the transaction ID and
//! to fill in server IDs resolved from local IDs.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::{RelationshipData, ResourceIdentity, ResourceObject};

/// The six write operations of the atomic extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    CreateResource,
    UpdateResource,
    DeleteResource,
    SetRelationship,
    AddToRelationship,
    RemoveFromRelationship,
}

impl OperationKind {
    pub const ALL: [Self; 6] = [
        Self::CreateResource,
        Self::UpdateResource,
        Self::DeleteResource,
        Self::SetRelationship,
        Self::AddToRelationship,
        Self::RemoveFromRelationship,
    ];

    /// Get operation name for logging and error details
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateResource => "createResource",
            Self::UpdateResource => "updateResource",
            Self::DeleteResource => "deleteResource",
            Self::SetRelationship => "setRelationship",
            Self::AddToRelationship => "addToRelationship",
            Self::RemoveFromRelationship => "removeFromRelationship",
        }
    }

    /// The `op` member used on the wire
    pub fn op_code(&self) -> &'static str {
        match self {
            Self::CreateResource | Self::AddToRelationship => "add",
            Self::UpdateResource | Self::SetRelationship => "update",
            Self::DeleteResource | Self::RemoveFromRelationship => "remove",
        }
    }

    /// Whether the operation targets a single relationship rather than a resource
    pub fn is_relationship_operation(&self) -> bool {
        matches!(
            self,
            Self::SetRelationship | Self::AddToRelationship | Self::RemoveFromRelationship
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attributes and relationships an operation writes to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetedFields {
    #[serde(default)]
    pub attributes: BTreeSet<String>,
    #[serde(default)]
    pub relationships: BTreeSet<String>,
}

impl TargetedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything present in a resource object
    pub fn of(resource: &ResourceObject) -> Self {
        Self {
            attributes: resource.attributes.keys().cloned().collect(),
            relationships: resource.relationships.keys().cloned().collect(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into());
        self
    }

    pub fn with_relationship(mut self, name: impl Into<String>) -> Self {
        self.relationships.insert(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.relationships.is_empty()
    }
}

/// A single write inside an atomic operations batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    kind: OperationKind,
    resource: ResourceObject,
    #[serde(default)]
    targeted_fields: TargetedFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relationship: Option<String>,
    #[serde(skip)]
    transaction_id: Option<Uuid>,
}

impl Operation {
    /// Create an operation with explicit targeted fields
    pub fn new(
        kind: OperationKind,
        resource: ResourceObject,
        targeted_fields: TargetedFields,
        relationship: Option<String>,
    ) -> Self {
        Self {
            kind,
            resource,
            targeted_fields,
            relationship,
            transaction_id: None,
        }
    }

    /// Create a resource; every field present in the object is targeted
    pub fn create(resource: ResourceObject) -> Self {
        let targeted = TargetedFields::of(&resource);
        Self::new(OperationKind::CreateResource, resource, targeted, None)
    }

    /// Update a resource; every field present in the object is targeted
    pub fn update(resource: ResourceObject) -> Self {
        let targeted = TargetedFields::of(&resource);
        Self::new(OperationKind::UpdateResource, resource, targeted, None)
    }

    /// Delete a resource
    pub fn delete(identity: ResourceIdentity) -> Self {
        Self::new(
            OperationKind::DeleteResource,
            ResourceObject::new(identity),
            TargetedFields::new(),
            None,
        )
    }

    /// Replace the contents of a relationship
    pub fn set_relationship(
        identity: ResourceIdentity,
        relationship: impl Into<String>,
        data: RelationshipData,
    ) -> Self {
        Self::relationship_operation(OperationKind::SetRelationship, identity, relationship, data)
    }

    /// Add members to a to-many relationship
    pub fn add_to_relationship(
        identity: ResourceIdentity,
        relationship: impl Into<String>,
        members: Vec<ResourceIdentity>,
    ) -> Self {
        Self::relationship_operation(
            OperationKind::AddToRelationship,
            identity,
            relationship,
            RelationshipData::ToMany(members),
        )
    }

    /// Remove members from a to-many relationship
    pub fn remove_from_relationship(
        identity: ResourceIdentity,
        relationship: impl Into<String>,
        members: Vec<ResourceIdentity>,
    ) -> Self {
        Self::relationship_operation(
            OperationKind::RemoveFromRelationship,
            identity,
            relationship,
            RelationshipData::ToMany(members),
        )
    }

    fn relationship_operation(
        kind: OperationKind,
        identity: ResourceIdentity,
        relationship: impl Into<String>,
        data: RelationshipData,
    ) -> Self {
        let relationship = relationship.into();
        let resource = ResourceObject::new(identity).with_relationship(relationship.clone(), data);
        let targeted = TargetedFields::new().with_relationship(relationship.clone());
        Self::new(kind, resource, targeted, Some(relationship))
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn resource(&self) -> &ResourceObject {
        &self.resource
    }

    pub fn type_name(&self) -> &str {
        self.resource.type_name()
    }

    pub fn targeted_fields(&self) -> &TargetedFields {
        &self.targeted_fields
    }

    /// Name of the relationship targeted by a relationship-only operation
    pub fn relationship(&self) -> Option<&str> {
        self.relationship.as_deref()
    }

    /// Transaction this operation was enlisted in, once the batch is running
    pub fn transaction_id(&self) -> Option<Uuid> {
        self.transaction_id
    }

    /// Related resources reachable through targeted relationships
    pub fn secondary_resources(&self) -> impl Iterator<Item = &ResourceIdentity> {
        let targeted = &self.targeted_fields.relationships;
        self.resource
            .relationships
            .iter()
            .filter(move |(name, _)| targeted.contains(*name))
            .flat_map(|(_, data)| data.iter())
    }

    pub(crate) fn secondary_resources_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut ResourceIdentity> {
        let targeted = &self.targeted_fields.relationships;
        self.resource
            .relationships
            .iter_mut()
            .filter(move |(name, _)| targeted.contains(*name))
            .flat_map(|(_, data)| data.iter_mut())
    }

    pub(crate) fn identity_mut(&mut self) -> &mut ResourceIdentity {
        &mut self.resource.identity
    }

    pub(crate) fn stamp_transaction(&mut self, transaction_id: Uuid) {
        self.transaction_id = Some(transaction_id);
    }
}
