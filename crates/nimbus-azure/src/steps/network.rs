use crate::constants::entities;
use crate::converters::has;
use crate::converters::network::{
    create_protects_subnet, create_public_ip_entity, create_rule_relationships, create_security_group_entity,
    create_subnet_entity, create_vnet_entity,
};
use crate::services::AzureServices;
use async_trait::async_trait;
use nimbus_core::{generate_entity_key, Relationship, RelationshipClass};
use nimbus_engine::{StepContext, StepError, StepHandler};
use nimbus_provider::records::{NetworkSecurityGroup, PublicIpAddress, VirtualNetwork};
use tracing::info;

/// Virtual networks and the subnets embedded in each listing record
pub struct FetchVirtualNetworks;

#[async_trait]
impl StepHandler<AzureServices> for FetchVirtualNetworks {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let client = ctx.services().network_client(ctx.tracker());

        let stats = client
            .iterate_virtual_networks(move |record: VirtualNetwork| async move {
                let vnet = create_vnet_entity(&record)?;
                ctx.commit_entity(vnet.clone()).await?;

                for subnet in &record.properties.subnets {
                    let subnet = create_subnet_entity(&vnet, subnet)?;
                    ctx.commit_entity(subnet.clone()).await?;
                    ctx.commit_relationship(Relationship::direct(RelationshipClass::Contains, &vnet, &subnet))
                        .await?;
                }
                Ok::<(), StepError>(())
            })
            .await?;

        info!(virtual_networks = stats.items, "Virtual networks ingested");
        Ok(())
    }
}

/// Security groups, the subnets they protect, and one edge per rule target
pub struct FetchNetworkSecurityGroups;

#[async_trait]
impl StepHandler<AzureServices> for FetchNetworkSecurityGroups {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let client = ctx.services().network_client(ctx.tracker());

        let stats = client
            .iterate_security_groups(move |record: NetworkSecurityGroup| async move {
                let nsg = create_security_group_entity(&record)?;
                ctx.commit_entity(nsg.clone()).await?;

                let mut protected_subnets = Vec::new();
                for subnet in &record.properties.subnets {
                    let subnet_key = generate_entity_key(&subnet.id)?;
                    let known = ctx.has_entity(&subnet_key).await;
                    ctx.commit_relationship(create_protects_subnet(&nsg, &subnet_key, known))
                        .await?;
                    if known {
                        protected_subnets.push(subnet_key);
                    }
                }

                let rules = record
                    .properties
                    .security_rules
                    .iter()
                    .chain(record.properties.default_security_rules.iter());
                for rule in rules {
                    for relationship in create_rule_relationships(&nsg, rule, &protected_subnets) {
                        ctx.commit_relationship(relationship).await?;
                    }
                }
                Ok::<(), StepError>(())
            })
            .await?;

        info!(
            security_groups = stats.items,
            relationships = ctx.relationships_committed(),
            "Network security groups ingested"
        );
        Ok(())
    }
}

pub struct FetchPublicIpAddresses;

#[async_trait]
impl StepHandler<AzureServices> for FetchPublicIpAddresses {
    async fn execute(&self, ctx: &StepContext<AzureServices>) -> Result<(), StepError> {
        let account = ctx.require_upstream_entity(entities::ACCOUNT).await?;
        let account = &account;
        let client = ctx.services().network_client(ctx.tracker());

        let stats = client
            .iterate_public_ip_addresses(move |record: PublicIpAddress| async move {
                let address = create_public_ip_entity(&record)?;
                ctx.commit_entity(address.clone()).await?;
                ctx.commit_relationship(has(account, &address)).await?;
                Ok::<(), StepError>(())
            })
            .await?;

        info!(public_ip_addresses = stats.items, "Public IP addresses ingested");
        Ok(())
    }
}
