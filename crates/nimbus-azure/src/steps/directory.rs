//! Directory users, groups, service principals and group membership

use crate::constants::entities;
use crate::converters::directory::{
    create_group_entity, create_service_principal_entity, create_user_entity, member_entity_type,
};
use crate::converters::{direct_or_mapped, has};
use crate::services::AzureServices;
use async_trait::async_trait;
use nimbus_core::{generate_directory_key, Entity, RelationshipClass};
use nimbus_engine::{StepContext, StepError, StepHandler};
use nimbus_provider::records::{DirectoryGroup, DirectoryObject, DirectoryUser, ServicePrincipal};
use nimbus_provider::DirectoryClient;
use tracing::{debug, info};

pub struct FetchUsers;

#[async_trait]
impl StepHandler<AzureServices> for FetchUsers {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let account = ctx.require_upstream_entity(entities::ACCOUNT).await?;
        let account = &account;
        let instance_id = ctx.services().instance_id();
        let client = ctx.services().directory_client(ctx.tracker());

        let stats = client
            .iterate_users(move |user: DirectoryUser| async move {
                let entity = create_user_entity(instance_id, &user)?;
                ctx.commit_entity(entity.clone()).await?;
                ctx.commit_relationship(has(account, &entity)).await?;
                Ok::<(), StepError>(())
            })
            .await?;

        info!(users = stats.items, pages = stats.pages, "Users ingested");
        Ok(())
    }
}

pub struct FetchGroups;

#[async_trait]
impl StepHandler<AzureServices> for FetchGroups {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let account = ctx.require_upstream_entity(entities::ACCOUNT).await?;
        let account = &account;
        let instance_id = ctx.services().instance_id();
        let client = ctx.services().directory_client(ctx.tracker());

        let stats = client
            .iterate_groups(move |group: DirectoryGroup| async move {
                let entity = create_group_entity(instance_id, &group)?;
                ctx.commit_entity(entity.clone()).await?;
                ctx.commit_relationship(has(account, &entity)).await?;
                Ok::<(), StepError>(())
            })
            .await?;

        info!(groups = stats.items, pages = stats.pages, "Groups ingested");
        Ok(())
    }
}

pub struct FetchServicePrincipals;

#[async_trait]
impl StepHandler<AzureServices> for FetchServicePrincipals {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let account = ctx.require_upstream_entity(entities::ACCOUNT).await?;
        let account = &account;
        let instance_id = ctx.services().instance_id();
        let client = ctx.services().directory_client(ctx.tracker());

        let stats = client
            .iterate_service_principals(move |principal: ServicePrincipal| async move {
                let entity = create_service_principal_entity(instance_id, &principal)?;
                ctx.commit_entity(entity.clone()).await?;
                ctx.commit_relationship(has(account, &entity)).await?;
                Ok::<(), StepError>(())
            })
            .await?;

        info!(service_principals = stats.items, pages = stats.pages, "Service principals ingested");
        Ok(())
    }
}

/// Membership edges for every committed group.
///
/// Each group's member listing is isolated: a failure for one group is
/// recorded and the remaining groups are still walked.
pub struct FetchGroupMembers;

#[async_trait]
impl StepHandler<AzureServices> for FetchGroupMembers {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let client = ctx.services().directory_client(ctx.tracker());
        let client = &client;

        let groups = ctx
            .job_state()
            .iterate_entities_of_type(entities::GROUP, move |group: Entity| async move {
                ctx.isolate(&group.key, ingest_members(ctx, client, &group)).await?;
                Ok::<(), StepError>(())
            })
            .await?;

        info!(groups, "Group memberships ingested");
        Ok(())
    }
}

async fn ingest_members(
    ctx: &StepContext<AzureServices>,
    client: &DirectoryClient,
    group: &Entity,
) -> Result<(), StepError> {
    let Some(group_id) = group.property("id").and_then(|v| v.as_str()) else {
        debug!(group_key = %group.key, "Group entity has no object id, skipping members");
        return Ok(());
    };
    let instance_id = ctx.services().instance_id();

    client
        .iterate_group_members(group_id, move |member: DirectoryObject| async move {
            let Some(member_type) = member_entity_type(member.kind()) else {
                debug!(member_id = %member.id, odata_type = ?member.odata_type, "Skipping unsupported member type");
                return Ok(());
            };
            let member_key = generate_directory_key(instance_id, &member.id)?;
            let known = ctx.has_entity(&member_key).await;
            ctx.commit_relationship(direct_or_mapped(
                RelationshipClass::Has,
                group,
                &member_key,
                member_type,
                known,
            ))
            .await?;
            Ok::<(), StepError>(())
        })
        .await?;

    Ok(())
}
