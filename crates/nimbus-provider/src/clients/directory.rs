use super::ClientBase;
use crate::pagination::IterationStats;
use crate::records::{DirectoryGroup, DirectoryObject, DirectoryUser, ServicePrincipal};
use crate::ProviderError;
use std::future::Future;

/// Directory (Microsoft Graph) client
#[derive(Clone)]
pub struct DirectoryClient {
    base: ClientBase,
}

impl DirectoryClient {
    pub fn new(base: ClientBase) -> Self {
        Self { base }
    }

    pub fn users_url(&self) -> String {
        self.base.config().graph_url("users")
    }

    pub fn groups_url(&self) -> String {
        self.base.config().graph_url("groups")
    }

    pub fn group_members_url(&self, group_id: &str) -> String {
        self.base.config().graph_url(&format!("groups/{}/members", group_id))
    }

    pub fn service_principals_url(&self) -> String {
        self.base.config().graph_url("servicePrincipals")
    }

    pub async fn iterate_users<F, Fut, E>(&self, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(DirectoryUser) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.users_url(), callback).await
    }

    pub async fn iterate_groups<F, Fut, E>(&self, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(DirectoryGroup) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.groups_url(), callback).await
    }

    /// Direct members of one group
    pub async fn iterate_group_members<F, Fut, E>(&self, group_id: &str, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(DirectoryObject) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.group_members_url(group_id), callback).await
    }

    pub async fn iterate_service_principals<F, Fut, E>(&self, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(ServicePrincipal) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.service_principals_url(), callback).await
    }
}
