//! Graph data model for ingested cloud resources

use crate::keys::{generate_relationship_key, generate_relationship_type};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Normalized property value: a scalar or a flat array of strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    StringArray(Vec<String>),
    Null,
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::StringArray(values) => write!(f, "{}", values.join(",")),
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&String> for PropertyValue {
    fn from(s: &String) -> Self {
        PropertyValue::String(s.clone())
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<u32> for PropertyValue {
    fn from(i: u32) -> Self {
        PropertyValue::Integer(i64::from(i))
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(values: Vec<String>) -> Self {
        PropertyValue::StringArray(values)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropertyValue::Null)
    }
}

/// A normalized node representing one cloud resource or directory object.
///
/// Entities are never mutated after they are committed to job state; the
/// builder methods below are only used while a converter assembles one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Globally unique key derived from the provider identifier
    pub key: String,
    /// Entity type tag, e.g. `azure_cosmosdb_account`
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Semantic classification tags, e.g. `Database`, `DataStore`
    pub class_labels: BTreeSet<String>,
    /// Flattened, normalized attributes
    pub properties: BTreeMap<String, PropertyValue>,
    /// Raw provider record, retained for audit and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,
}

impl Entity {
    pub fn new(key: impl Into<String>, entity_type: &str, class_labels: &[&str]) -> Self {
        Self {
            key: key.into(),
            entity_type: entity_type.to_string(),
            class_labels: class_labels.iter().map(|c| c.to_string()).collect(),
            properties: BTreeMap::new(),
            raw_data: None,
        }
    }

    /// Set a property. `Null` values are dropped so absent data stays absent.
    pub fn with_property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.properties.insert(name.to_string(), value);
        }
        self
    }

    pub fn with_raw_data(mut self, raw_data: serde_json::Value) -> Self {
        self.raw_data = Some(raw_data);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn has_class(&self, label: &str) -> bool {
        self.class_labels.contains(label)
    }
}

/// Relationship verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipClass {
    Has,
    Contains,
    Protects,
    Allows,
    Denies,
    Uses,
    Connects,
    Extends,
    Assigned,
}

impl RelationshipClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipClass::Has => "HAS",
            RelationshipClass::Contains => "CONTAINS",
            RelationshipClass::Protects => "PROTECTS",
            RelationshipClass::Allows => "ALLOWS",
            RelationshipClass::Denies => "DENIES",
            RelationshipClass::Uses => "USES",
            RelationshipClass::Connects => "CONNECTS",
            RelationshipClass::Extends => "EXTENDS",
            RelationshipClass::Assigned => "ASSIGNED",
        }
    }
}

impl fmt::Display for RelationshipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter used by the graph store to resolve a mapped relationship target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetFilter {
    /// Entity type the target is expected to have
    pub target_type: String,
    /// Properties the target must match
    pub filter: BTreeMap<String, PropertyValue>,
    /// When set, the store must not create a placeholder if nothing matches
    pub skip_target_creation: bool,
}

impl TargetFilter {
    pub fn new(target_type: &str) -> Self {
        Self {
            target_type: target_type.to_string(),
            filter: BTreeMap::new(),
            skip_target_creation: false,
        }
    }

    pub fn with_filter(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.filter.insert(name.to_string(), value.into());
        self
    }

    pub fn skip_target_creation(mut self, skip: bool) -> Self {
        self.skip_target_creation = skip;
        self
    }

    /// Stable textual form used as the target component of the relationship key
    pub fn canonical(&self) -> String {
        let pairs: Vec<String> = self
            .filter
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        format!("{}[{}]", self.target_type, pairs.join(";"))
    }
}

/// Relationship endpoint resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipTarget {
    /// Target is a locally known entity
    Direct { key: String, entity_type: String },
    /// Target is resolved later by the graph store
    Mapped(TargetFilter),
}

/// A directed, typed edge between two entity keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub key: String,
    pub class: RelationshipClass,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub from_key: String,
    pub from_type: String,
    pub target: RelationshipTarget,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Relationship {
    /// Direct relationship between two entities already in hand
    pub fn direct(class: RelationshipClass, from: &Entity, to: &Entity) -> Self {
        Self::direct_by_key(class, &from.key, &from.entity_type, &to.key, &to.entity_type)
    }

    /// Direct relationship when only keys and types are known
    pub fn direct_by_key(
        class: RelationshipClass,
        from_key: &str,
        from_type: &str,
        to_key: &str,
        to_type: &str,
    ) -> Self {
        Self {
            key: generate_relationship_key(from_key, class, to_key, None),
            class,
            relationship_type: generate_relationship_type(class, from_type, to_type),
            from_key: from_key.to_string(),
            from_type: from_type.to_string(),
            target: RelationshipTarget::Direct {
                key: to_key.to_string(),
                entity_type: to_type.to_string(),
            },
            properties: BTreeMap::new(),
        }
    }

    /// Mapped relationship whose target is resolved by filter
    pub fn mapped(class: RelationshipClass, from: &Entity, target: TargetFilter) -> Self {
        Self {
            key: generate_relationship_key(&from.key, class, &target.canonical(), None),
            class,
            relationship_type: generate_relationship_type(class, &from.entity_type, &target.target_type),
            from_key: from.key.clone(),
            from_type: from.entity_type.clone(),
            target: RelationshipTarget::Mapped(target),
            properties: BTreeMap::new(),
        }
    }

    /// Disambiguate several same-class edges between the same pair of endpoints
    pub fn with_discriminator(mut self, discriminator: &str) -> Self {
        let to_component = match &self.target {
            RelationshipTarget::Direct { key, .. } => key.clone(),
            RelationshipTarget::Mapped(filter) => filter.canonical(),
        };
        self.key = generate_relationship_key(&self.from_key, self.class, &to_component, Some(discriminator));
        self
    }

    pub fn with_property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.properties.insert(name.to_string(), value);
        }
        self
    }

    /// Target key for direct relationships
    pub fn to_key(&self) -> Option<&str> {
        match &self.target {
            RelationshipTarget::Direct { key, .. } => Some(key),
            RelationshipTarget::Mapped(_) => None,
        }
    }

    pub fn to_type(&self) -> &str {
        match &self.target {
            RelationshipTarget::Direct { entity_type, .. } => entity_type,
            RelationshipTarget::Mapped(filter) => &filter.target_type,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.target, RelationshipTarget::Mapped(_))
    }
}
