use super::ClientBase;
use crate::pagination::IterationStats;
use crate::records::{DatabaseAccount, SqlContainer, SqlDatabase};
use crate::ProviderError;
use std::future::Future;

pub const COSMOSDB_API_VERSION: &str = "2023-04-15";

/// Cosmos DB client: accounts, their SQL databases, and their containers.
///
/// Databases and containers are optional sub-resources; accounts created for
/// other APIs answer 404 and are listed as empty.
#[derive(Clone)]
pub struct DatabaseClient {
    base: ClientBase,
}

impl DatabaseClient {
    pub fn new(base: ClientBase) -> Self {
        Self { base }
    }

    pub fn accounts_url(&self) -> String {
        self.base
            .subscription_url("/providers/Microsoft.DocumentDB/databaseAccounts", COSMOSDB_API_VERSION)
    }

    pub fn sql_databases_url(&self, account_id: &str) -> String {
        self.base
            .config()
            .arm_url(&format!("{}/sqlDatabases", account_id), COSMOSDB_API_VERSION)
    }

    pub fn sql_containers_url(&self, database_id: &str) -> String {
        self.base
            .config()
            .arm_url(&format!("{}/containers", database_id), COSMOSDB_API_VERSION)
    }

    pub async fn iterate_accounts<F, Fut, E>(&self, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(DatabaseAccount) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.accounts_url(), callback).await
    }

    pub async fn iterate_sql_databases<F, Fut, E>(
        &self,
        account_id: &str,
        callback: F,
    ) -> Result<IterationStats, E>
    where
        F: FnMut(SqlDatabase) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base
            .iterate_optional(self.sql_databases_url(account_id), callback)
            .await
    }

    pub async fn iterate_sql_containers<F, Fut, E>(
        &self,
        database_id: &str,
        callback: F,
    ) -> Result<IterationStats, E>
    where
        F: FnMut(SqlContainer) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base
            .iterate_optional(self.sql_containers_url(database_id), callback)
            .await
    }
}
