//! Account and directory objects

use super::raw;
use crate::config::IntegrationConfig;
use crate::constants::{classes, entities};
use nimbus_core::{generate_directory_key, Entity, KeyError};
use nimbus_provider::records::{DirectoryGroup, DirectoryObjectKind, DirectoryUser, ServicePrincipal};

/// The integration's account entity, built from configuration alone
pub fn create_account_entity(config: &IntegrationConfig) -> Result<Entity, KeyError> {
    let key = generate_directory_key(&config.instance_id, entities::ACCOUNT)?;
    Ok(Entity::new(key, entities::ACCOUNT, classes::ACCOUNT)
        .with_property("name", format!("Azure {}", config.instance_id.trim()))
        .with_property("tenantId", &config.tenant_id)
        .with_property("subscriptionId", &config.subscription_id))
}

pub fn user_key(instance_id: &str, user_id: &str) -> Result<String, KeyError> {
    generate_directory_key(instance_id, user_id)
}

pub fn create_user_entity(instance_id: &str, user: &DirectoryUser) -> Result<Entity, KeyError> {
    Ok(Entity::new(user_key(instance_id, &user.id)?, entities::USER, classes::USER)
        .with_property("id", &user.id)
        .with_property("displayName", user.display_name.clone())
        .with_property("userPrincipalName", user.user_principal_name.clone())
        .with_property("email", user.mail.clone())
        .with_property("firstName", user.given_name.clone())
        .with_property("lastName", user.surname.clone())
        .with_property("jobTitle", user.job_title.clone())
        .with_property("active", user.account_enabled)
        .with_property("userType", user.user_type.clone())
        .with_raw_data(raw(user)))
}

pub fn create_group_entity(instance_id: &str, group: &DirectoryGroup) -> Result<Entity, KeyError> {
    let key = generate_directory_key(instance_id, &group.id)?;
    Ok(Entity::new(key, entities::GROUP, classes::GROUP)
        .with_property("id", &group.id)
        .with_property("displayName", group.display_name.clone())
        .with_property("description", group.description.clone())
        .with_property("email", group.mail.clone())
        .with_property("mailEnabled", group.mail_enabled)
        .with_property("securityEnabled", group.security_enabled)
        .with_property("groupTypes", group.group_types.clone())
        .with_raw_data(raw(group)))
}

pub fn create_service_principal_entity(
    instance_id: &str,
    principal: &ServicePrincipal,
) -> Result<Entity, KeyError> {
    let key = generate_directory_key(instance_id, &principal.id)?;
    Ok(Entity::new(key, entities::SERVICE_PRINCIPAL, classes::SERVICE_PRINCIPAL)
        .with_property("id", &principal.id)
        .with_property("appId", principal.app_id.clone())
        .with_property("displayName", principal.display_name.clone())
        .with_property("servicePrincipalType", principal.service_principal_type.clone())
        .with_property("active", principal.account_enabled)
        .with_property("servicePrincipalNames", principal.service_principal_names.clone())
        .with_raw_data(raw(principal)))
}

/// Entity type a group member maps to; `None` for unsupported kinds
pub fn member_entity_type(kind: DirectoryObjectKind) -> Option<&'static str> {
    match kind {
        DirectoryObjectKind::User => Some(entities::USER),
        DirectoryObjectKind::Group => Some(entities::GROUP),
        DirectoryObjectKind::ServicePrincipal => Some(entities::SERVICE_PRINCIPAL),
        DirectoryObjectKind::Other => None,
    }
}
