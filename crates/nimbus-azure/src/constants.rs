//! Step ids, entity types and class labels

use nimbus_core::{generate_relationship_type, RelationshipClass};

pub mod steps {
    pub const ACCOUNT: &str = "fetch-account";
    pub const USERS: &str = "fetch-users";
    pub const GROUPS: &str = "fetch-groups";
    pub const SERVICE_PRINCIPALS: &str = "fetch-service-principals";
    pub const GROUP_MEMBERS: &str = "fetch-group-members";
    pub const ROLE_DEFINITIONS: &str = "fetch-role-definitions";
    pub const ROLE_ASSIGNMENTS: &str = "fetch-role-assignments";
    pub const COSMOSDB_ACCOUNTS: &str = "fetch-cosmosdb-accounts";
    pub const VIRTUAL_NETWORKS: &str = "fetch-virtual-networks";
    pub const NETWORK_SECURITY_GROUPS: &str = "fetch-network-security-groups";
    pub const PUBLIC_IP_ADDRESSES: &str = "fetch-public-ip-addresses";
    pub const STORAGE_ACCOUNTS: &str = "fetch-storage-accounts";
    pub const STORAGE_FILE_SHARES: &str = "fetch-storage-file-shares";
}

pub mod entities {
    pub const ACCOUNT: &str = "azure_account";
    pub const USER: &str = "azure_user";
    pub const GROUP: &str = "azure_user_group";
    pub const SERVICE_PRINCIPAL: &str = "azure_service_principal";
    pub const ROLE_DEFINITION: &str = "azure_role_definition";
    pub const ROLE_ASSIGNMENT: &str = "azure_role_assignment";
    pub const COSMOSDB_ACCOUNT: &str = "azure_cosmosdb_account";
    pub const COSMOSDB_SQL_DATABASE: &str = "azure_cosmosdb_sql_database";
    pub const COSMOSDB_SQL_CONTAINER: &str = "azure_cosmosdb_sql_container";
    pub const VNET: &str = "azure_vnet";
    pub const SUBNET: &str = "azure_subnet";
    pub const SECURITY_GROUP: &str = "azure_security_group";
    pub const PUBLIC_IP_ADDRESS: &str = "azure_public_ip_address";
    pub const STORAGE_ACCOUNT: &str = "azure_storage_account";
    pub const STORAGE_CONTAINER: &str = "azure_storage_container";
    pub const STORAGE_FILE_SHARE: &str = "azure_storage_file_share";

    // Targets of mapped relationships, resolved by the graph store
    pub const INTERNET: &str = "internet";
    pub const IP_ADDRESS: &str = "ip_address";
    pub const SERVICE_TAG: &str = "azure_service_tag";
}

pub mod classes {
    pub const ACCOUNT: &[&str] = &["Account"];
    pub const USER: &[&str] = &["User"];
    pub const GROUP: &[&str] = &["UserGroup"];
    pub const SERVICE_PRINCIPAL: &[&str] = &["Service"];
    pub const ROLE_DEFINITION: &[&str] = &["AccessRole"];
    pub const ROLE_ASSIGNMENT: &[&str] = &["AccessPolicy"];
    pub const COSMOSDB_ACCOUNT: &[&str] = &["Account", "Service"];
    pub const COSMOSDB_SQL_DATABASE: &[&str] = &["Database", "DataStore"];
    pub const COSMOSDB_SQL_CONTAINER: &[&str] = &["DataCollection"];
    pub const VNET: &[&str] = &["Network"];
    pub const SUBNET: &[&str] = &["Network"];
    pub const SECURITY_GROUP: &[&str] = &["Firewall"];
    pub const PUBLIC_IP_ADDRESS: &[&str] = &["IpAddress"];
    pub const STORAGE_ACCOUNT: &[&str] = &["Service"];
    pub const STORAGE_CONTAINER: &[&str] = &["DataStore"];
    pub const STORAGE_FILE_SHARE: &[&str] = &["DataStore"];
}

/// Well-known key of the global internet entity
pub const INTERNET_KEY: &str = "global:internet";

/// Relationship type for a class between two entity types
pub fn relationship_type(class: RelationshipClass, from_type: &str, to_type: &str) -> String {
    generate_relationship_type(class, from_type, to_type)
}
