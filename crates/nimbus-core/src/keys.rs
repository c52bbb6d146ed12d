//! Deterministic entity and relationship addressing

use crate::model::RelationshipClass;

/// Key derivation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Empty identifier for {0}")]
    EmptyIdentifier(String),
}

/// Entity key for a resource that carries a provider resource ID.
///
/// Provider resource IDs are case-insensitive, and the provider does not
/// return them in a consistent case across endpoints (a subnet reference on
/// a security group may differ in case from the subnet's own `id`), so keys
/// are trimmed and lower-cased.
pub fn generate_entity_key(resource_id: &str) -> Result<String, KeyError> {
    let trimmed = resource_id.trim();
    if trimmed.is_empty() {
        return Err(KeyError::EmptyIdentifier("resource id".to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Entity key for an object without a provider resource ID, such as a
/// directory user or group: scoped to the integration instance.
pub fn generate_directory_key(instance_id: &str, object_id: &str) -> Result<String, KeyError> {
    let instance = instance_id.trim();
    let object = object_id.trim();
    if instance.is_empty() {
        return Err(KeyError::EmptyIdentifier("instance id".to_string()));
    }
    if object.is_empty() {
        return Err(KeyError::EmptyIdentifier("directory object id".to_string()));
    }
    Ok(format!("{}:{}", instance, object.to_ascii_lowercase()))
}

/// Relationship type as a pure function of `(class, from_type, to_type)`.
///
/// The leading `_`-separated segments the target type shares with the source
/// type are dropped, so `azure_account HAS azure_user` becomes
/// `azure_account_has_user`. When the target type is fully shared (same type
/// on both ends) it is kept whole.
pub fn generate_relationship_type(class: RelationshipClass, from_type: &str, to_type: &str) -> String {
    let from_parts: Vec<&str> = from_type.split('_').collect();
    let to_parts: Vec<&str> = to_type.split('_').collect();

    let shared = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let suffix = if shared >= to_parts.len() {
        to_type.to_string()
    } else {
        to_parts[shared..].join("_")
    };

    format!("{}_{}_{}", from_type, class.as_str().to_ascii_lowercase(), suffix)
}

/// Relationship key, unique per `(from, class, to)` or per the composite
/// discriminator when several same-class edges join the same pair.
pub fn generate_relationship_key(
    from_key: &str,
    class: RelationshipClass,
    to_key: &str,
    discriminator: Option<&str>,
) -> String {
    match discriminator {
        Some(d) => format!("{}|{}|{}|{}", from_key, class.as_str().to_ascii_lowercase(), to_key, d),
        None => format!("{}|{}|{}", from_key, class.as_str().to_ascii_lowercase(), to_key),
    }
}
