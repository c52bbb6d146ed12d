//! Role definitions and role assignments

use super::{direct_or_mapped, raw};
use crate::constants::{classes, entities};
use nimbus_core::{generate_directory_key, generate_entity_key, Entity, KeyError, Relationship, RelationshipClass};
use nimbus_provider::records::{RoleAssignment, RoleDefinition};

pub fn create_role_definition_entity(definition: &RoleDefinition) -> Result<Entity, KeyError> {
    let props = &definition.properties;
    let actions: Vec<String> = props.permissions.iter().flat_map(|p| p.actions.clone()).collect();
    let not_actions: Vec<String> = props.permissions.iter().flat_map(|p| p.not_actions.clone()).collect();
    let data_actions: Vec<String> = props.permissions.iter().flat_map(|p| p.data_actions.clone()).collect();

    Ok(Entity::new(
        generate_entity_key(&definition.id)?,
        entities::ROLE_DEFINITION,
        classes::ROLE_DEFINITION,
    )
    .with_property("id", &definition.id)
    .with_property("name", definition.display_name())
    .with_property("displayName", props.role_name.clone())
    .with_property("description", props.description.clone())
    .with_property("roleType", props.role_type.clone())
    .with_property("customRole", props.role_type.as_deref() == Some("CustomRole"))
    .with_property("actions", actions)
    .with_property("notActions", not_actions)
    .with_property("dataActions", data_actions)
    .with_property("assignableScopes", props.assignable_scopes.clone())
    .with_raw_data(raw(definition)))
}

pub fn create_role_assignment_entity(assignment: &RoleAssignment) -> Result<Entity, KeyError> {
    let props = &assignment.properties;
    Ok(Entity::new(
        generate_entity_key(&assignment.id)?,
        entities::ROLE_ASSIGNMENT,
        classes::ROLE_ASSIGNMENT,
    )
    .with_property("id", &assignment.id)
    .with_property("name", assignment.display_name())
    .with_property("roleDefinitionId", props.role_definition_id.clone())
    .with_property("principalId", props.principal_id.clone())
    .with_property("principalType", props.principal_type.clone())
    .with_property("scope", props.scope.clone())
    .with_raw_data(raw(assignment)))
}

/// Entity type of an assignment principal; `None` for unsupported types
pub fn principal_entity_type(principal_type: &str) -> Option<&'static str> {
    match principal_type {
        "User" => Some(entities::USER),
        "Group" => Some(entities::GROUP),
        "ServicePrincipal" => Some(entities::SERVICE_PRINCIPAL),
        _ => None,
    }
}

/// Key of the principal an assignment grants to, when it can be derived
pub fn principal_key(instance_id: &str, assignment: &RoleAssignment) -> Option<(String, &'static str)> {
    let props = &assignment.properties;
    let entity_type = principal_entity_type(props.principal_type.as_deref()?)?;
    let key = generate_directory_key(instance_id, props.principal_id.as_deref()?).ok()?;
    Some((key, entity_type))
}

/// `assignment USES role definition`
pub fn create_assignment_uses_definition(
    assignment: &Entity,
    role_definition_id: &str,
    definition_known: bool,
) -> Result<Relationship, KeyError> {
    let definition_key = generate_entity_key(role_definition_id)?;
    Ok(direct_or_mapped(
        RelationshipClass::Uses,
        assignment,
        &definition_key,
        entities::ROLE_DEFINITION,
        definition_known,
    ))
}

/// `assignment ASSIGNED principal`
pub fn create_assignment_principal_relationship(
    assignment: &Entity,
    principal_key: &str,
    principal_type: &str,
    principal_known: bool,
) -> Relationship {
    direct_or_mapped(
        RelationshipClass::Assigned,
        assignment,
        principal_key,
        principal_type,
        principal_known,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::PropertyValue;
    use serde_json::json;

    const DEFINITION_ID: &str =
        "/subscriptions/sub-1/providers/Microsoft.Authorization/roleDefinitions/ACDD72A7-3385-48EF-BD42-F606FBA81AE7";

    fn assignment() -> RoleAssignment {
        serde_json::from_value(json!({
            "id": "/subscriptions/sub-1/providers/Microsoft.Authorization/roleAssignments/ra-1",
            "name": "ra-1",
            "properties": {
                "roleDefinitionId": DEFINITION_ID,
                "principalId": "U-1",
                "principalType": "User",
                "scope": "/subscriptions/sub-1"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_role_definition_flattens_permissions() {
        let definition: RoleDefinition = serde_json::from_value(json!({
            "id": DEFINITION_ID,
            "name": "acdd72a7",
            "properties": {
                "roleName": "Reader",
                "type": "BuiltInRole",
                "permissions": [{"actions": ["*/read"]}, {"actions": ["Microsoft.Support/*"], "notActions": ["x"]}]
            }
        }))
        .unwrap();

        let entity = create_role_definition_entity(&definition).unwrap();
        assert_eq!(entity.key, DEFINITION_ID.to_ascii_lowercase());
        assert_eq!(
            entity.property("actions"),
            Some(&PropertyValue::StringArray(vec![
                "*/read".to_string(),
                "Microsoft.Support/*".to_string()
            ]))
        );
        assert_eq!(entity.property("customRole").and_then(|v| v.as_bool()), Some(false));
    }

    #[test]
    fn test_assignment_links_definition_and_principal() {
        let record = assignment();
        let entity = create_role_assignment_entity(&record).unwrap();

        let uses = create_assignment_uses_definition(&entity, DEFINITION_ID, true).unwrap();
        assert_eq!(uses.to_key(), Some(DEFINITION_ID.to_ascii_lowercase().as_str()));
        assert_eq!(uses.relationship_type, "azure_role_assignment_uses_definition");

        let (key, entity_type) = principal_key("inst", &record).unwrap();
        assert_eq!(key, "inst:u-1");
        assert_eq!(entity_type, entities::USER);

        let assigned = create_assignment_principal_relationship(&entity, &key, entity_type, false);
        assert!(assigned.is_mapped());
        assert_eq!(assigned.relationship_type, "azure_role_assignment_assigned_user");
    }

    #[test]
    fn test_unsupported_principal_type() {
        let mut record = assignment();
        record.properties.principal_type = Some("ForeignGroup".into());
        assert!(principal_key("inst", &record).is_none());
    }
}
