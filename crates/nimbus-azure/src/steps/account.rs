use crate::converters::directory::create_account_entity;
use crate::services::AzureServices;
use async_trait::async_trait;
use nimbus_engine::{StepContext, StepError, StepHandler};
use tracing::info;

/// Commits the singleton account entity every other step hangs off
pub struct FetchAccount;

#[async_trait]
impl StepHandler<AzureServices> for FetchAccount {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let account = create_account_entity(ctx.services().config())?;
        info!(account_key = %account.key, "Committing account entity");
        ctx.commit_entity(account).await
    }
}
