//! Storage accounts, blob containers and file shares

use super::raw;
use crate::constants::{classes, entities};
use nimbus_core::{generate_entity_key, Entity, KeyError};
use nimbus_provider::records::{BlobContainer, FileShare, StorageAccount};

pub fn create_storage_account_entity(account: &StorageAccount) -> Result<Entity, KeyError> {
    let props = &account.properties;
    let endpoints = props.primary_endpoints.clone().unwrap_or_default();

    Ok(Entity::new(
        generate_entity_key(&account.id)?,
        entities::STORAGE_ACCOUNT,
        classes::STORAGE_ACCOUNT,
    )
    // Original-case resource ID, used to build child listing URLs
    .with_property("id", &account.id)
    .with_property("name", account.display_name())
    .with_property("location", account.location.clone())
    .with_property("resourceGroup", account.resource_group())
    .with_property("kind", account.kind.clone())
    .with_property("sku", account.sku.as_ref().and_then(|s| s.name.clone()))
    .with_property("accessTier", props.access_tier.clone())
    .with_property("httpsOnly", props.supports_https_traffic_only)
    .with_property("allowBlobPublicAccess", props.allow_blob_public_access)
    .with_property("minimumTlsVersion", props.minimum_tls_version.clone())
    .with_property("blobEndpoint", endpoints.blob)
    .with_property("fileEndpoint", endpoints.file)
    .with_property("queueEndpoint", endpoints.queue)
    .with_property("tableEndpoint", endpoints.table)
    .with_property("webEndpoint", endpoints.web)
    .with_raw_data(raw(account)))
}

pub fn create_storage_container_entity(container: &BlobContainer) -> Result<Entity, KeyError> {
    let props = &container.properties;
    let public = props
        .public_access
        .as_deref()
        .is_some_and(|access| !access.eq_ignore_ascii_case("None"));

    Ok(Entity::new(
        generate_entity_key(&container.id)?,
        entities::STORAGE_CONTAINER,
        classes::STORAGE_CONTAINER,
    )
    .with_property("id", &container.id)
    .with_property("name", container.display_name())
    .with_property("publicAccess", props.public_access.clone())
    .with_property("public", public)
    .with_property("hasImmutabilityPolicy", props.has_immutability_policy)
    .with_property("hasLegalHold", props.has_legal_hold)
    .with_property("lastModifiedTime", props.last_modified_time.clone())
    .with_raw_data(raw(container)))
}

pub fn create_file_share_entity(share: &FileShare) -> Result<Entity, KeyError> {
    let props = &share.properties;
    Ok(Entity::new(
        generate_entity_key(&share.id)?,
        entities::STORAGE_FILE_SHARE,
        classes::STORAGE_FILE_SHARE,
    )
    .with_property("id", &share.id)
    .with_property("name", share.display_name())
    .with_property("shareQuotaGb", props.share_quota)
    .with_property("enabledProtocols", props.enabled_protocols.clone())
    .with_property("accessTier", props.access_tier.clone())
    .with_property("lastModifiedTime", props.last_modified_time.clone())
    .with_raw_data(raw(share)))
}
