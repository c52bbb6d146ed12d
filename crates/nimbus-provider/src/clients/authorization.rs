use super::ClientBase;
use crate::pagination::IterationStats;
use crate::records::{RoleAssignment, RoleDefinition};
use crate::ProviderError;
use std::future::Future;

pub const AUTHORIZATION_API_VERSION: &str = "2022-04-01";

/// Role-based access control client (subscription scope)
#[derive(Clone)]
pub struct AuthorizationClient {
    base: ClientBase,
}

impl AuthorizationClient {
    pub fn new(base: ClientBase) -> Self {
        Self { base }
    }

    pub fn role_definitions_url(&self) -> String {
        self.base.subscription_url(
            "/providers/Microsoft.Authorization/roleDefinitions",
            AUTHORIZATION_API_VERSION,
        )
    }

    pub fn role_assignments_url(&self) -> String {
        self.base.subscription_url(
            "/providers/Microsoft.Authorization/roleAssignments",
            AUTHORIZATION_API_VERSION,
        )
    }

    pub async fn iterate_role_definitions<F, Fut, E>(&self, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(RoleDefinition) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.role_definitions_url(), callback).await
    }

    pub async fn iterate_role_assignments<F, Fut, E>(&self, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(RoleAssignment) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.role_assignments_url(), callback).await
    }
}
