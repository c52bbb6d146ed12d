//! Resource clients, one per resource family

mod authorization;
mod database;
mod directory;
mod network;
mod storage;

pub use authorization::{AuthorizationClient, AUTHORIZATION_API_VERSION};
pub use database::{DatabaseClient, COSMOSDB_API_VERSION};
pub use directory::DirectoryClient;
pub use network::{NetworkClient, NETWORK_API_VERSION};
pub use storage::{StorageClient, STORAGE_API_VERSION};

use crate::pagination::{IterationStats, ResourceIterator};
use crate::retry::RetryPolicy;
use crate::transport::{Transport, TransportPageSource};
use crate::{ProviderConfig, ProviderError};
use nimbus_core::EndpointTracker;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Shared plumbing for resource clients: transport, endpoints and the iterator
#[derive(Clone)]
pub struct ClientBase {
    transport: Arc<dyn Transport>,
    config: ProviderConfig,
    iterator: ResourceIterator,
}

impl ClientBase {
    pub fn new(transport: Arc<dyn Transport>, config: ProviderConfig, policy: RetryPolicy) -> Self {
        Self {
            transport,
            config,
            iterator: ResourceIterator::new(policy),
        }
    }

    /// Report in-flight endpoints to `tracker`
    pub fn with_tracker(mut self, tracker: EndpointTracker) -> Self {
        self.iterator = self.iterator.with_tracker(tracker);
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// ARM URL scoped to the configured subscription
    pub(crate) fn subscription_url(&self, provider_path: &str, api_version: &str) -> String {
        let path = format!("{}{}", self.config.subscription_path(), provider_path);
        self.config.arm_url(&path, api_version)
    }

    /// Stream every item of a list endpoint
    pub async fn iterate<T, F, Fut, E>(&self, url: String, callback: F) -> Result<IterationStats, E>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnMut(T) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        let source = TransportPageSource::<T>::new(self.transport.clone(), url);
        self.iterator.for_each(&source, callback).await
    }

    /// Stream a known-optional sub-resource: a not-found initial page is
    /// logged and treated as an empty list.
    pub async fn iterate_optional<T, F, Fut, E>(&self, url: String, callback: F) -> Result<IterationStats, E>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnMut(T) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        let source = TransportPageSource::<T>::new(self.transport.clone(), url);
        match self.iterator.for_each_optional(&source, callback).await? {
            Some(stats) => Ok(stats),
            None => {
                debug!(endpoint = %source.url(), "Optional sub-resource not found, treating as empty");
                Ok(IterationStats::default())
            }
        }
    }
}
