//! Services shared by every Azure step

use crate::config::IntegrationConfig;
use nimbus_core::EndpointTracker;
use nimbus_provider::{
    AuthorizationClient, ClientBase, DatabaseClient, DirectoryClient, NetworkClient, ProviderConfig,
    RetryPolicy, StorageClient, Transport,
};
use std::sync::Arc;

/// Configuration plus the transport every client is built on
pub struct AzureServices {
    config: IntegrationConfig,
    provider_config: ProviderConfig,
    policy: RetryPolicy,
    transport: Arc<dyn Transport>,
}

impl AzureServices {
    pub fn new(config: IntegrationConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            provider_config: config.provider_config(),
            policy: config.retry.policy(),
            config,
            transport,
        }
    }

    /// Override the retry policy derived from configuration
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        &self.config.instance_id
    }

    fn base(&self, tracker: &EndpointTracker) -> ClientBase {
        ClientBase::new(self.transport.clone(), self.provider_config.clone(), self.policy.clone())
            .with_tracker(tracker.clone())
    }

    pub fn directory_client(&self, tracker: &EndpointTracker) -> DirectoryClient {
        DirectoryClient::new(self.base(tracker))
    }

    pub fn authorization_client(&self, tracker: &EndpointTracker) -> AuthorizationClient {
        AuthorizationClient::new(self.base(tracker))
    }

    pub fn database_client(&self, tracker: &EndpointTracker) -> DatabaseClient {
        DatabaseClient::new(self.base(tracker))
    }

    pub fn network_client(&self, tracker: &EndpointTracker) -> NetworkClient {
        NetworkClient::new(self.base(tracker))
    }

    pub fn storage_client(&self, tracker: &EndpointTracker) -> StorageClient {
        StorageClient::new(self.base(tracker))
    }
}
