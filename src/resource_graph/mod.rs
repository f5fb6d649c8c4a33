//! # Resource Graph
//!
//! Read-only metadata about resource types: their public names, whether
//! they take part in optimistic concurrency, and their relationships.
//! Built once at startup and shared across requests.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::ApiError;

/// Errors raised while building a resource graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceGraphError {
    #[error("Resource type '{0}' is registered more than once")]
    DuplicateResourceType(String),

    #[error("Relationship '{relationship}' on '{resource_type}' points to unknown resource type '{right_type}'")]
    UnknownRightType {
        resource_type: String,
        relationship: String,
        right_type: String,
    },
}

/// A relationship declared on a resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipInfo {
    name: String,
    right_type: String,
    to_many: bool,
}

impl RelationshipInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Public name of the resource type on the other side
    pub fn right_type(&self) -> &str {
        &self.right_type
    }

    pub fn is_to_many(&self) -> bool {
        self.to_many
    }
}

/// Metadata for one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    public_name: String,
    versioned: bool,
    relationships: BTreeMap<String, RelationshipInfo>,
}

impl ResourceType {
    pub fn new(public_name: impl Into<String>) -> Self {
        Self {
            public_name: public_name.into(),
            versioned: false,
            relationships: BTreeMap::new(),
        }
    }

    /// Mark the type as taking part in optimistic concurrency
    pub fn versioned(mut self) -> Self {
        self.versioned = true;
        self
    }

    pub fn with_to_one(self, name: impl Into<String>, right_type: impl Into<String>) -> Self {
        self.with_relationship(name.into(), right_type.into(), false)
    }

    pub fn with_to_many(self, name: impl Into<String>, right_type: impl Into<String>) -> Self {
        self.with_relationship(name.into(), right_type.into(), true)
    }

    fn with_relationship(mut self, name: String, right_type: String, to_many: bool) -> Self {
        self.relationships.insert(
            name.clone(),
            RelationshipInfo {
                name,
                right_type,
                to_many,
            },
        );
        self
    }

    pub fn public_name(&self) -> &str {
        &self.public_name
    }

    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipInfo> {
        self.relationships.get(name)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipInfo> {
        self.relationships.values()
    }

    /// Look up a relationship, failing with a client error when unknown
    pub fn require_relationship(&self, name: &str) -> Result<&RelationshipInfo, ApiError> {
        self.relationship(name).ok_or_else(|| {
            ApiError::bad_request(
                "Unknown relationship.",
                format!(
                    "Relationship '{}' does not exist on resource type '{}'.",
                    name, self.public_name
                ),
            )
        })
    }
}

/// All resource types known to the application
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    types: BTreeMap<String, ResourceType>,
}

impl ResourceGraph {
    pub fn builder() -> ResourceGraphBuilder {
        ResourceGraphBuilder::default()
    }

    pub fn get(&self, public_name: &str) -> Option<&ResourceType> {
        self.types.get(public_name)
    }

    /// Look up a resource type, failing with a client error when unknown
    pub fn require(&self, public_name: &str) -> Result<&ResourceType, ApiError> {
        self.get(public_name).ok_or_else(|| {
            ApiError::bad_request(
                "Unknown resource type.",
                format!("Resource type '{}' does not exist.", public_name),
            )
        })
    }

    /// Whether the right side of a relationship is versioned
    pub fn is_right_side_versioned(&self, relationship: &RelationshipInfo) -> bool {
        self.get(relationship.right_type())
            .map_or(false, ResourceType::is_versioned)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.values()
    }
}

/// Builder for [`ResourceGraph`]
#[derive(Debug, Default)]
pub struct ResourceGraphBuilder {
    types: Vec<ResourceType>,
}

impl ResourceGraphBuilder {
    pub fn add(mut self, resource_type: ResourceType) -> Self {
        self.types.push(resource_type);
        self
    }

    /// Build the graph, checking names are unique and relationships resolve
    pub fn build(self) -> Result<ResourceGraph, ResourceGraphError> {
        let mut types = BTreeMap::new();
        for resource_type in self.types {
            let name = resource_type.public_name.clone();
            if types.insert(name.clone(), resource_type).is_some() {
                return Err(ResourceGraphError::DuplicateResourceType(name));
            }
        }

        for resource_type in types.values() {
            for relationship in resource_type.relationships() {
                if !types.contains_key(relationship.right_type()) {
                    return Err(ResourceGraphError::UnknownRightType {
                        resource_type: resource_type.public_name.clone(),
                        relationship: relationship.name.clone(),
                        right_type: relationship.right_type.clone(),
                    });
                }
            }
        }

        Ok(ResourceGraph { types })
    }
}
