use crate::converters::authorization::{
    create_assignment_principal_relationship, create_assignment_uses_definition, create_role_assignment_entity,
    create_role_definition_entity, principal_key,
};
use crate::services::AzureServices;
use async_trait::async_trait;
use nimbus_core::generate_entity_key;
use nimbus_engine::{StepContext, StepError, StepHandler};
use nimbus_provider::records::{RoleAssignment, RoleDefinition};
use tracing::{debug, info};

pub struct FetchRoleDefinitions;

#[async_trait]
impl StepHandler<AzureServices> for FetchRoleDefinitions {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let client = ctx.services().authorization_client(ctx.tracker());

        let stats = client
            .iterate_role_definitions(move |definition: RoleDefinition| async move {
                ctx.commit_entity(create_role_definition_entity(&definition)?).await?;
                Ok::<(), StepError>(())
            })
            .await?;

        info!(role_definitions = stats.items, "Role definitions ingested");
        Ok(())
    }
}

/// Role assignments, linked to their definition and principal.
///
/// Links are direct when the target was committed by an earlier step and
/// mapped otherwise, so a failed directory step degrades to mapped edges.
pub struct FetchRoleAssignments;

#[async_trait]
impl StepHandler<AzureServices> for FetchRoleAssignments {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let instance_id = ctx.services().instance_id();
        let client = ctx.services().authorization_client(ctx.tracker());

        let stats = client
            .iterate_role_assignments(move |assignment: RoleAssignment| async move {
                let entity = create_role_assignment_entity(&assignment)?;
                ctx.commit_entity(entity.clone()).await?;

                if let Some(definition_id) = assignment.properties.role_definition_id.as_deref() {
                    let known = ctx.has_entity(&generate_entity_key(definition_id)?).await;
                    ctx.commit_relationship(create_assignment_uses_definition(&entity, definition_id, known)?)
                        .await?;
                }

                match principal_key(instance_id, &assignment) {
                    Some((key, entity_type)) => {
                        let known = ctx.has_entity(&key).await;
                        ctx.commit_relationship(create_assignment_principal_relationship(
                            &entity,
                            &key,
                            entity_type,
                            known,
                        ))
                        .await?;
                    }
                    None => debug!(
                        assignment_key = %entity.key,
                        principal_type = ?assignment.properties.principal_type,
                        "Assignment principal not linkable"
                    ),
                }
                Ok::<(), StepError>(())
            })
            .await?;

        if !ctx.upstream_failures().is_empty() {
            info!(
                upstream_failures = ?ctx.upstream_failures(),
                "Some principal steps failed; unresolved principals were mapped"
            );
        }
        info!(role_assignments = stats.items, "Role assignments ingested");
        Ok(())
    }
}
