use super::ClientBase;
use crate::pagination::IterationStats;
use crate::records::{NetworkSecurityGroup, PublicIpAddress, VirtualNetwork};
use crate::ProviderError;
use std::future::Future;

pub const NETWORK_API_VERSION: &str = "2023-09-01";

/// Networking client. Subnets arrive embedded in their virtual network and
/// security rules embedded in their security group.
#[derive(Clone)]
pub struct NetworkClient {
    base: ClientBase,
}

impl NetworkClient {
    pub fn new(base: ClientBase) -> Self {
        Self { base }
    }

    pub fn virtual_networks_url(&self) -> String {
        self.base
            .subscription_url("/providers/Microsoft.Network/virtualNetworks", NETWORK_API_VERSION)
    }

    pub fn security_groups_url(&self) -> String {
        self.base
            .subscription_url("/providers/Microsoft.Network/networkSecurityGroups", NETWORK_API_VERSION)
    }

    pub fn public_ip_addresses_url(&self) -> String {
        self.base
            .subscription_url("/providers/Microsoft.Network/publicIPAddresses", NETWORK_API_VERSION)
    }

    pub async fn iterate_virtual_networks<F, Fut, E>(&self, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(VirtualNetwork) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.virtual_networks_url(), callback).await
    }

    pub async fn iterate_security_groups<F, Fut, E>(&self, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(NetworkSecurityGroup) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.security_groups_url(), callback).await
    }

    pub async fn iterate_public_ip_addresses<F, Fut, E>(&self, callback: F) -> Result<IterationStats, E>
    where
        F: FnMut(PublicIpAddress) -> Fut + Send,
        Fut: Future<Output = Result<(), E>> + Send,
        E: From<ProviderError>,
    {
        self.base.iterate(self.public_ip_addresses_url(), callback).await
    }
}
