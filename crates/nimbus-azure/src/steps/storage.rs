use crate::constants::entities;
use crate::converters::has;
use crate::converters::storage::{
    create_file_share_entity, create_storage_account_entity, create_storage_container_entity,
};
use crate::services::AzureServices;
use async_trait::async_trait;
use nimbus_core::Entity;
use nimbus_engine::{StepContext, StepError, StepHandler};
use nimbus_provider::records::{BlobContainer, FileShare, StorageAccount};
use nimbus_provider::StorageClient;
use tracing::{debug, info, warn};

/// Storage accounts and their blob containers, isolated per account
pub struct FetchStorageAccounts;

#[async_trait]
impl StepHandler<AzureServices> for FetchStorageAccounts {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let account = ctx.require_upstream_entity(entities::ACCOUNT).await?;
        let account = &account;
        let client = ctx.services().storage_client(ctx.tracker());
        let client = &client;

        let stats = client
            .iterate_accounts(move |record: StorageAccount| async move {
                let storage_account = create_storage_account_entity(&record)?;
                ctx.commit_entity(storage_account.clone()).await?;
                ctx.commit_relationship(has(account, &storage_account)).await?;

                ctx.isolate(
                    &storage_account.key,
                    ingest_blob_containers(ctx, client, &record.id, &storage_account),
                )
                .await?;
                Ok::<(), StepError>(())
            })
            .await?;

        info!(storage_accounts = stats.items, "Storage accounts ingested");
        Ok(())
    }
}

async fn ingest_blob_containers(
    ctx: &StepContext<AzureServices>,
    client: &StorageClient,
    account_id: &str,
    storage_account: &Entity,
) -> Result<(), StepError> {
    let stats = client
        .iterate_blob_containers(account_id, move |record: BlobContainer| async move {
            let container = create_storage_container_entity(&record)?;
            ctx.commit_entity(container.clone()).await?;
            ctx.commit_relationship(has(storage_account, &container)).await?;
            Ok::<(), StepError>(())
        })
        .await?;

    debug!(account_key = %storage_account.key, containers = stats.items, "Blob containers ingested");
    Ok(())
}

/// File shares of every storage account already in job state
pub struct FetchStorageFileShares;

#[async_trait]
impl StepHandler<AzureServices> for FetchStorageFileShares {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let client = ctx.services().storage_client(ctx.tracker());
        let client = &client;

        let accounts = ctx
            .job_state()
            .iterate_entities_of_type(entities::STORAGE_ACCOUNT, move |storage_account: Entity| async move {
                ctx.isolate(&storage_account.key, ingest_file_shares(ctx, client, &storage_account))
                    .await?;
                Ok::<(), StepError>(())
            })
            .await?;

        info!(storage_accounts = accounts, "File shares ingested");
        Ok(())
    }
}

async fn ingest_file_shares(
    ctx: &StepContext<AzureServices>,
    client: &StorageClient,
    storage_account: &Entity,
) -> Result<(), StepError> {
    let Some(account_id) = storage_account.property("id").and_then(|v| v.as_str()) else {
        warn!(account_key = %storage_account.key, "Storage account entity has no resource id");
        return Ok(());
    };

    let stats = client
        .iterate_file_shares(account_id, move |record: FileShare| async move {
            let share = create_file_share_entity(&record)?;
            ctx.commit_entity(share.clone()).await?;
            ctx.commit_relationship(has(storage_account, &share)).await?;
            Ok::<(), StepError>(())
        })
        .await?;

    debug!(account_key = %storage_account.key, shares = stats.items, "File shares ingested");
    Ok(())
}
