use super::ClientBase;
use crate::pagination::IterationStats;
use crate::records::{BlobContainer, FileShare, StorageAccount};
use crate::ProviderError;
use std::future::Future;

pub const STORAGE_API_VERSION: &str = "2023-01-01";

/// Storage client: accounts plus their blob containers and file shares
#[derive(Clone)]
pub struct StorageClient {
    base: ClientBase,
}

impl StorageClient {
    pub fn new(base: ClientBase) -> Self {
        Self { base }
    }

    pub fn accounts_url(&self) -> String {
        self.base
            .subscription_url("/providers/Microsoft.Storage/storageAccounts", STORAGE_API_VERSION)
    }

    pub fn blob_containers_url(&self, account_id: &str) -> String {
        self.base.config().arm_url(
            &format!("{}/blobServices/default/containers", account_id),
            STORAGE_API_VERSION,
        )
    }

    pub fn file_shares_url(&self, account_id: &str) -> String {
        self.base.config().arm_url(
            &format!("{}/fileServices/default/shares", account_id),
            STORAGE_API_VERSION,
        )
    }

    pub async fn iterate_accounts<F, Fut, E>(&self, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(StorageAccount) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.accounts_url(), callback).await
    }

    /// Blob containers; accounts without a blob service list as empty
    pub async fn iterate_blob_containers<F, Fut, E>(
        &self,
        account_id: &str,
        callback: F,
    ) -> Result<IterationStats, E>
    where
        F: FnMut(BlobContainer) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base
            .iterate_optional(self.blob_containers_url(account_id), callback)
            .await
    }

    /// File shares; accounts without a file service list as empty
    pub async fn iterate_file_shares<F, Fut, E>(
        &self,
        account_id: &str,
        callback: F,
    ) -> Result<IterationStats, E>
    where
        F: FnMut(FileShare) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base
            .iterate_optional(self.file_shares_url(account_id), callback)
            .await
    }
}
