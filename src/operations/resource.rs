//! Resource Descriptors
//!
//! Parsed resource objects and identifiers as they appear inside an
//! atomic operation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifies a resource by type plus server ID and/or local ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentity {
    #[serde(rename = "type")]
    pub type_name: String,

    /// Server-assigned ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Client-chosen local ID, valid for the duration of one batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,

    /// Concurrency token for versioned resource types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ResourceIdentity {
    /// Create an identity without any ID
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            lid: None,
            version: None,
        }
    }

    /// Identity referring to a stored resource
    pub fn with_id(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new(type_name)
        }
    }

    /// Identity referring to a resource declared earlier in the batch
    pub fn with_lid(type_name: impl Into<String>, lid: impl Into<String>) -> Self {
        Self {
            lid: Some(lid.into()),
            ..Self::new(type_name)
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Relationship payload: a single (nullable) identity or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    ToMany(Vec<ResourceIdentity>),
    ToOne(Option<ResourceIdentity>),
}

impl RelationshipData {
    /// Iterate the referenced identities
    pub fn iter(&self) -> std::slice::Iter<'_, ResourceIdentity> {
        match self {
            Self::ToMany(items) => items.iter(),
            Self::ToOne(Some(item)) => std::slice::from_ref(item).iter(),
            Self::ToOne(None) => Default::default(),
        }
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, ResourceIdentity> {
        match self {
            Self::ToMany(items) => items.iter_mut(),
            Self::ToOne(Some(item)) => std::slice::from_mut(item).iter_mut(),
            Self::ToOne(None) => Default::default(),
        }
    }

    pub fn is_to_many(&self) -> bool {
        matches!(self, Self::ToMany(_))
    }
}

/// A resource object carried by create and update operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(flatten)]
    pub identity: ResourceIdentity,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, RelationshipData>,
}

impl ResourceObject {
    /// Create a resource object with no fields
    pub fn new(identity: ResourceIdentity) -> Self {
        Self {
            identity,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Add an attribute value
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Add a relationship payload
    pub fn with_relationship(mut self, name: impl Into<String>, data: RelationshipData) -> Self {
        self.relationships.insert(name.into(), data);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.identity.type_name
    }

    pub fn id(&self) -> Option<&str> {
        self.identity.id.as_deref()
    }
}
