//! Cosmos DB accounts, SQL databases and containers

use super::raw;
use crate::constants::{classes, entities};
use nimbus_core::{generate_entity_key, Entity, KeyError};
use nimbus_provider::records::{DatabaseAccount, SqlContainer, SqlDatabase};

pub fn create_cosmosdb_account_entity(account: &DatabaseAccount) -> Result<Entity, KeyError> {
    let props = &account.properties;
    // Reachable from the internet unless public access is disabled or a vnet filter applies
    let public = props.public_network_access.as_deref() != Some("Disabled")
        && props.is_virtual_network_filter_enabled != Some(true);

    Ok(Entity::new(
        generate_entity_key(&account.id)?,
        entities::COSMOSDB_ACCOUNT,
        classes::COSMOSDB_ACCOUNT,
    )
    .with_property("id", &account.id)
    .with_property("name", account.display_name())
    .with_property("location", account.location.clone())
    .with_property("resourceGroup", account.resource_group())
    .with_property("kind", account.kind.clone())
    .with_property("endpoint", props.document_endpoint.clone())
    .with_property("provisioningState", props.provisioning_state.clone())
    .with_property("offerType", props.database_account_offer_type.clone())
    .with_property("publicNetworkAccess", props.public_network_access.clone())
    .with_property("automaticFailover", props.enable_automatic_failover)
    .with_property("multipleWriteLocations", props.enable_multiple_write_locations)
    .with_property("keyBasedMetadataWriteAccessDisabled", props.disable_key_based_metadata_write_access)
    .with_property("public", public)
    .with_raw_data(raw(account)))
}

pub fn create_sql_database_entity(database: &SqlDatabase) -> Result<Entity, KeyError> {
    let body = database.properties.resource.as_ref();
    Ok(Entity::new(
        generate_entity_key(&database.id)?,
        entities::COSMOSDB_SQL_DATABASE,
        classes::COSMOSDB_SQL_DATABASE,
    )
    .with_property("id", &database.id)
    .with_property("name", database.display_name())
    .with_property("resourceGroup", database.resource_group())
    .with_property("databaseId", body.and_then(|b| b.id.clone()))
    .with_property("rid", body.and_then(|b| b.rid.clone()))
    .with_raw_data(raw(database)))
}

pub fn create_sql_container_entity(container: &SqlContainer) -> Result<Entity, KeyError> {
    let body = container.properties.resource.as_ref();
    Ok(Entity::new(
        generate_entity_key(&container.id)?,
        entities::COSMOSDB_SQL_CONTAINER,
        classes::COSMOSDB_SQL_CONTAINER,
    )
    .with_property("id", &container.id)
    .with_property("name", container.display_name())
    .with_property("containerId", body.and_then(|b| b.id.clone()))
    .with_property("defaultTtl", body.and_then(|b| b.default_ttl))
    .with_raw_data(raw(container)))
}
