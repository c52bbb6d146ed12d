//! Cosmos DB hierarchy: account -> SQL database -> container.
//!
//! Each database account's database listing and each database's container
//! listing run isolated. A parent whose children cannot be fetched keeps its
//! own entity, is recorded as a sibling failure, and its siblings continue.

use crate::constants::entities;
use crate::converters::database::{
    create_cosmosdb_account_entity, create_sql_container_entity, create_sql_database_entity,
};
use crate::converters::has;
use crate::services::AzureServices;
use async_trait::async_trait;
use nimbus_core::Entity;
use nimbus_engine::{StepContext, StepError, StepHandler};
use nimbus_provider::records::{DatabaseAccount, SqlContainer, SqlDatabase};
use nimbus_provider::DatabaseClient;
use tracing::{debug, info};

pub struct FetchCosmosDbAccounts;

#[async_trait]
impl StepHandler<AzureServices> for FetchCosmosDbAccounts {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let account = ctx.require_upstream_entity(entities::ACCOUNT).await?;
        let account = &account;
        let client = ctx.services().database_client(ctx.tracker());
        let client = &client;

        let stats = client
            .iterate_accounts(move |record: DatabaseAccount| async move {
                let db_account = create_cosmosdb_account_entity(&record)?;
                ctx.commit_entity(db_account.clone()).await?;
                ctx.commit_relationship(has(account, &db_account)).await?;

                ctx.isolate(&db_account.key, ingest_databases(ctx, client, &record.id, &db_account))
                    .await?;
                Ok::<(), StepError>(())
            })
            .await?;

        info!(
            cosmosdb_accounts = stats.items,
            sibling_failures = ctx.sibling_failures().len(),
            "Cosmos DB accounts ingested"
        );
        Ok(())
    }
}

async fn ingest_databases(
    ctx: &StepContext<AzureServices>,
    client: &DatabaseClient,
    account_id: &str,
    db_account: &Entity,
) -> Result<(), StepError> {
    let stats = client
        .iterate_sql_databases(account_id, move |record: SqlDatabase| async move {
            let database = create_sql_database_entity(&record)?;
            ctx.commit_entity(database.clone()).await?;
            ctx.commit_relationship(has(db_account, &database)).await?;

            ctx.isolate(&database.key, ingest_containers(ctx, client, &record.id, &database))
                .await?;
            Ok::<(), StepError>(())
        })
        .await?;

    debug!(account_key = %db_account.key, databases = stats.items, "SQL databases ingested");
    Ok(())
}

async fn ingest_containers(
    ctx: &StepContext<AzureServices>,
    client: &DatabaseClient,
    database_id: &str,
    database: &Entity,
) -> Result<(), StepError> {
    let stats = client
        .iterate_sql_containers(database_id, move |record: SqlContainer| async move {
            let container = create_sql_container_entity(&record)?;
            ctx.commit_entity(container.clone()).await?;
            ctx.commit_relationship(has(database, &container)).await?;
            Ok::<(), StepError>(())
        })
        .await?;

    debug!(database_key = %database.key, containers = stats.items, "SQL containers ingested");
    Ok(())
}
