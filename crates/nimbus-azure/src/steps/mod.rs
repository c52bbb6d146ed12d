//! Step handlers and the static step catalog

mod account;
mod authorization;
mod database;
mod directory;
mod network;
mod storage;

pub use account::FetchAccount;
pub use authorization::{FetchRoleAssignments, FetchRoleDefinitions};
pub use database::FetchCosmosDbAccounts;
pub use directory::{FetchGroupMembers, FetchGroups, FetchServicePrincipals, FetchUsers};
pub use network::{FetchNetworkSecurityGroups, FetchPublicIpAddresses, FetchVirtualNetworks};
pub use storage::{FetchStorageAccounts, FetchStorageFileShares};

use crate::config::IntegrationConfig;
use crate::constants::{entities, relationship_type, steps};
use crate::services::AzureServices;
use nimbus_core::RelationshipClass::{Allows, Assigned, Contains, Denies, Has, Protects, Uses};
use nimbus_engine::{GraphError, Step, StepGraph};
use std::sync::Arc;

/// Every step id in declaration order
const CATALOG: &[&str] = &[
    steps::ACCOUNT,
    steps::USERS,
    steps::GROUPS,
    steps::SERVICE_PRINCIPALS,
    steps::GROUP_MEMBERS,
    steps::ROLE_DEFINITIONS,
    steps::ROLE_ASSIGNMENTS,
    steps::COSMOSDB_ACCOUNTS,
    steps::VIRTUAL_NETWORKS,
    steps::NETWORK_SECURITY_GROUPS,
    steps::PUBLIC_IP_ADDRESSES,
    steps::STORAGE_ACCOUNTS,
    steps::STORAGE_FILE_SHARES,
];

/// Declared but only run when explicitly activated
const OPT_IN: &[&str] = &[steps::STORAGE_FILE_SHARES];

pub fn catalog_step_ids() -> Vec<&'static str> {
    CATALOG.to_vec()
}

pub fn default_active_steps() -> Vec<&'static str> {
    CATALOG
        .iter()
        .copied()
        .filter(|id| !OPT_IN.contains(id))
        .collect()
}

pub type AzureStep = Step<AzureServices>;

/// The full step catalog, active or not
pub fn all_steps() -> Vec<AzureStep> {
    use entities::*;

    vec![
        AzureStep::new(steps::ACCOUNT, "Fetch Account", Arc::new(FetchAccount))
            .produces_entities(&[ACCOUNT]),
        AzureStep::new(steps::USERS, "Fetch Users", Arc::new(FetchUsers))
            .depends_on(&[steps::ACCOUNT])
            .produces_entities(&[USER])
            .produces_relationships(&[relationship_type(Has, ACCOUNT, USER)])
            .requires_permissions(&["User.Read.All"]),
        AzureStep::new(steps::GROUPS, "Fetch Groups", Arc::new(FetchGroups))
            .depends_on(&[steps::ACCOUNT])
            .produces_entities(&[GROUP])
            .produces_relationships(&[relationship_type(Has, ACCOUNT, GROUP)])
            .requires_permissions(&["Group.Read.All"]),
        AzureStep::new(
            steps::SERVICE_PRINCIPALS,
            "Fetch Service Principals",
            Arc::new(FetchServicePrincipals),
        )
        .depends_on(&[steps::ACCOUNT])
        .produces_entities(&[SERVICE_PRINCIPAL])
        .produces_relationships(&[relationship_type(Has, ACCOUNT, SERVICE_PRINCIPAL)])
        .requires_permissions(&["Application.Read.All"]),
        AzureStep::new(steps::GROUP_MEMBERS, "Fetch Group Members", Arc::new(FetchGroupMembers))
            .depends_on(&[steps::USERS, steps::GROUPS, steps::SERVICE_PRINCIPALS])
            .produces_relationships(&[
                relationship_type(Has, GROUP, USER),
                relationship_type(Has, GROUP, GROUP),
                relationship_type(Has, GROUP, SERVICE_PRINCIPAL),
            ])
            .requires_permissions(&["GroupMember.Read.All"]),
        AzureStep::new(
            steps::ROLE_DEFINITIONS,
            "Fetch Role Definitions",
            Arc::new(FetchRoleDefinitions),
        )
        .depends_on(&[steps::ACCOUNT])
        .produces_entities(&[ROLE_DEFINITION])
        .requires_permissions(&["Microsoft.Authorization/roleDefinitions/read"]),
        AzureStep::new(
            steps::ROLE_ASSIGNMENTS,
            "Fetch Role Assignments",
            Arc::new(FetchRoleAssignments),
        )
        .depends_on(&[
            steps::ROLE_DEFINITIONS,
            steps::USERS,
            steps::GROUPS,
            steps::SERVICE_PRINCIPALS,
        ])
        .produces_entities(&[ROLE_ASSIGNMENT])
        .produces_relationships(&[
            relationship_type(Uses, ROLE_ASSIGNMENT, ROLE_DEFINITION),
            relationship_type(Assigned, ROLE_ASSIGNMENT, USER),
            relationship_type(Assigned, ROLE_ASSIGNMENT, GROUP),
            relationship_type(Assigned, ROLE_ASSIGNMENT, SERVICE_PRINCIPAL),
        ])
        .requires_permissions(&["Microsoft.Authorization/roleAssignments/read"]),
        AzureStep::new(
            steps::COSMOSDB_ACCOUNTS,
            "Fetch Cosmos DB Accounts",
            Arc::new(FetchCosmosDbAccounts),
        )
        .depends_on(&[steps::ACCOUNT])
        .produces_entities(&[COSMOSDB_ACCOUNT, COSMOSDB_SQL_DATABASE, COSMOSDB_SQL_CONTAINER])
        .produces_relationships(&[
            relationship_type(Has, ACCOUNT, COSMOSDB_ACCOUNT),
            relationship_type(Has, COSMOSDB_ACCOUNT, COSMOSDB_SQL_DATABASE),
            relationship_type(Has, COSMOSDB_SQL_DATABASE, COSMOSDB_SQL_CONTAINER),
        ])
        .requires_permissions(&[
            "Microsoft.DocumentDB/databaseAccounts/read",
            "Microsoft.DocumentDB/databaseAccounts/sqlDatabases/read",
            "Microsoft.DocumentDB/databaseAccounts/sqlDatabases/containers/read",
        ]),
        AzureStep::new(
            steps::VIRTUAL_NETWORKS,
            "Fetch Virtual Networks",
            Arc::new(FetchVirtualNetworks),
        )
        .depends_on(&[steps::ACCOUNT])
        .produces_entities(&[VNET, SUBNET])
        .produces_relationships(&[relationship_type(Contains, VNET, SUBNET)])
        .requires_permissions(&["Microsoft.Network/virtualNetworks/read"]),
        AzureStep::new(
            steps::NETWORK_SECURITY_GROUPS,
            "Fetch Network Security Groups",
            Arc::new(FetchNetworkSecurityGroups),
        )
        .depends_on(&[steps::VIRTUAL_NETWORKS])
        .produces_entities(&[SECURITY_GROUP])
        .produces_relationships(&[
            relationship_type(Protects, SECURITY_GROUP, SUBNET),
            relationship_type(Allows, SECURITY_GROUP, SUBNET),
            relationship_type(Denies, SECURITY_GROUP, SUBNET),
            relationship_type(Allows, SECURITY_GROUP, INTERNET),
            relationship_type(Denies, SECURITY_GROUP, INTERNET),
            relationship_type(Allows, SECURITY_GROUP, IP_ADDRESS),
            relationship_type(Denies, SECURITY_GROUP, IP_ADDRESS),
            relationship_type(Allows, SECURITY_GROUP, SERVICE_TAG),
            relationship_type(Denies, SECURITY_GROUP, SERVICE_TAG),
        ])
        .requires_permissions(&["Microsoft.Network/networkSecurityGroups/read"]),
        AzureStep::new(
            steps::PUBLIC_IP_ADDRESSES,
            "Fetch Public IP Addresses",
            Arc::new(FetchPublicIpAddresses),
        )
        .depends_on(&[steps::ACCOUNT])
        .produces_entities(&[PUBLIC_IP_ADDRESS])
        .produces_relationships(&[relationship_type(Has, ACCOUNT, PUBLIC_IP_ADDRESS)])
        .requires_permissions(&["Microsoft.Network/publicIPAddresses/read"]),
        AzureStep::new(
            steps::STORAGE_ACCOUNTS,
            "Fetch Storage Accounts",
            Arc::new(FetchStorageAccounts),
        )
        .depends_on(&[steps::ACCOUNT])
        .produces_entities(&[STORAGE_ACCOUNT, STORAGE_CONTAINER])
        .produces_relationships(&[
            relationship_type(Has, ACCOUNT, STORAGE_ACCOUNT),
            relationship_type(Has, STORAGE_ACCOUNT, STORAGE_CONTAINER),
        ])
        .requires_permissions(&[
            "Microsoft.Storage/storageAccounts/read",
            "Microsoft.Storage/storageAccounts/blobServices/containers/read",
        ]),
        AzureStep::new(
            steps::STORAGE_FILE_SHARES,
            "Fetch Storage File Shares",
            Arc::new(FetchStorageFileShares),
        )
        .depends_on(&[steps::STORAGE_ACCOUNTS])
        .produces_entities(&[STORAGE_FILE_SHARE])
        .produces_relationships(&[relationship_type(Has, STORAGE_ACCOUNT, STORAGE_FILE_SHARE)])
        .requires_permissions(&["Microsoft.Storage/storageAccounts/fileServices/shares/read"]),
    ]
}

/// Step graph with the configured allow-list, or the default active set
pub fn build_graph(config: &IntegrationConfig) -> Result<StepGraph<AzureServices>, GraphError> {
    match &config.active_steps {
        Some(active) => StepGraph::with_active_steps(all_steps(), active),
        None => StepGraph::with_active_steps(all_steps(), &default_active_steps()),
    }
}
