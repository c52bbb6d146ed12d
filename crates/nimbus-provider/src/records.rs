//! Typed raw provider records.
//!
//! Every field the provider may omit is an `Option` or carries a serde
//! default, so converters check presence explicitly. Unknown fields are
//! ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Directory (Microsoft Graph)
// ---------------------------------------------------------------------------

/// Graph user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub job_title: Option<String>,
    pub account_enabled: Option<bool>,
    pub user_type: Option<String>,
}

/// Graph group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryGroup {
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub mail: Option<String>,
    pub mail_enabled: Option<bool>,
    pub security_enabled: Option<bool>,
    #[serde(default)]
    pub group_types: Vec<String>,
}

/// Group member: a user, group or service principal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryObject {
    pub id: String,
    /// `#microsoft.graph.user`, `#microsoft.graph.group`, ...
    #[serde(rename = "@odata.type")]
    pub odata_type: Option<String>,
    pub display_name: Option<String>,
    pub mail: Option<String>,
}

/// Kind of a directory object, from its `@odata.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryObjectKind {
    User,
    Group,
    ServicePrincipal,
    Other,
}

impl DirectoryObject {
    pub fn kind(&self) -> DirectoryObjectKind {
        match self.odata_type.as_deref() {
            Some("#microsoft.graph.user") => DirectoryObjectKind::User,
            Some("#microsoft.graph.group") => DirectoryObjectKind::Group,
            Some("#microsoft.graph.servicePrincipal") => DirectoryObjectKind::ServicePrincipal,
            _ => DirectoryObjectKind::Other,
        }
    }
}

/// Graph service principal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    pub id: String,
    pub app_id: Option<String>,
    pub display_name: Option<String>,
    pub service_principal_type: Option<String>,
    pub account_enabled: Option<bool>,
    #[serde(default)]
    pub service_principal_names: Vec<String>,
}

// ---------------------------------------------------------------------------
// Resource management (ARM)
// ---------------------------------------------------------------------------

/// ARM SKU block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    pub name: Option<String>,
    pub tier: Option<String>,
}

/// Common ARM resource envelope with family-specific `properties`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmResource<P> {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub kind: Option<String>,
    pub sku: Option<Sku>,
    #[serde(default)]
    pub properties: P,
}

impl<P> ArmResource<P> {
    /// Name, falling back to the last segment of the resource ID
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.id
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string()
        })
    }

    /// Resource group parsed from the resource ID
    pub fn resource_group(&self) -> Option<String> {
        let mut segments = self.id.split('/');
        while let Some(segment) = segments.next() {
            if segment.eq_ignore_ascii_case("resourceGroups") {
                return segments.next().map(str::to_string);
            }
        }
        None
    }
}

/// Subscription record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub subscription_id: String,
    pub display_name: Option<String>,
    pub state: Option<String>,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolePermission {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, rename = "notActions")]
    pub not_actions: Vec<String>,
    #[serde(default, rename = "dataActions")]
    pub data_actions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefinitionProperties {
    pub role_name: Option<String>,
    pub description: Option<String>,
    /// `BuiltInRole` or `CustomRole`
    #[serde(rename = "type")]
    pub role_type: Option<String>,
    #[serde(default)]
    pub permissions: Vec<RolePermission>,
    #[serde(default)]
    pub assignable_scopes: Vec<String>,
}

pub type RoleDefinition = ArmResource<RoleDefinitionProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentProperties {
    pub role_definition_id: Option<String>,
    pub principal_id: Option<String>,
    /// `User`, `Group`, `ServicePrincipal`, ...
    pub principal_type: Option<String>,
    pub scope: Option<String>,
}

pub type RoleAssignment = ArmResource<RoleAssignmentProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseAccountProperties {
    pub document_endpoint: Option<String>,
    pub provisioning_state: Option<String>,
    pub database_account_offer_type: Option<String>,
    pub public_network_access: Option<String>,
    pub enable_automatic_failover: Option<bool>,
    pub enable_multiple_write_locations: Option<bool>,
    pub disable_key_based_metadata_write_access: Option<bool>,
    pub is_virtual_network_filter_enabled: Option<bool>,
}

pub type DatabaseAccount = ArmResource<DatabaseAccountProperties>;

/// Inner `resource` block of SQL database and container records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlResourceBody {
    pub id: Option<String>,
    #[serde(rename = "_rid")]
    pub rid: Option<String>,
    #[serde(rename = "defaultTtl")]
    pub default_ttl: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlResourceProperties {
    pub resource: Option<SqlResourceBody>,
}

pub type SqlDatabase = ArmResource<SqlResourceProperties>;
pub type SqlContainer = ArmResource<SqlResourceProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubResource {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    pub address_prefix: Option<String>,
    pub network_security_group: Option<SubResource>,
    pub provisioning_state: Option<String>,
}

pub type Subnet = ArmResource<SubnetProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    pub address_space: Option<AddressSpace>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    pub provisioning_state: Option<String>,
}

pub type VirtualNetwork = ArmResource<VirtualNetworkProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRuleProperties {
    /// `Allow` or `Deny`
    pub access: Option<String>,
    /// `Inbound` or `Outbound`
    pub direction: Option<String>,
    pub priority: Option<i64>,
    pub protocol: Option<String>,
    pub source_address_prefix: Option<String>,
    #[serde(default)]
    pub source_address_prefixes: Vec<String>,
    pub destination_address_prefix: Option<String>,
    #[serde(default)]
    pub destination_address_prefixes: Vec<String>,
    pub destination_port_range: Option<String>,
    #[serde(default)]
    pub destination_port_ranges: Vec<String>,
}

pub type SecurityRule = ArmResource<SecurityRuleProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSecurityGroupProperties {
    #[serde(default)]
    pub security_rules: Vec<SecurityRule>,
    #[serde(default)]
    pub default_security_rules: Vec<SecurityRule>,
    #[serde(default)]
    pub subnets: Vec<SubResource>,
    #[serde(default)]
    pub network_interfaces: Vec<SubResource>,
}

pub type NetworkSecurityGroup = ArmResource<NetworkSecurityGroupProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressProperties {
    pub ip_address: Option<String>,
    pub public_ip_allocation_method: Option<String>,
    pub public_ip_address_version: Option<String>,
    pub idle_timeout_in_minutes: Option<i64>,
}

pub type PublicIpAddress = ArmResource<PublicIpAddressProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageEndpoints {
    pub blob: Option<String>,
    pub file: Option<String>,
    pub queue: Option<String>,
    pub table: Option<String>,
    pub web: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountProperties {
    pub primary_endpoints: Option<StorageEndpoints>,
    pub access_tier: Option<String>,
    pub supports_https_traffic_only: Option<bool>,
    pub allow_blob_public_access: Option<bool>,
    pub minimum_tls_version: Option<String>,
    pub provisioning_state: Option<String>,
}

pub type StorageAccount = ArmResource<StorageAccountProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobContainerProperties {
    /// `None`, `Blob` or `Container`
    pub public_access: Option<String>,
    pub has_immutability_policy: Option<bool>,
    pub has_legal_hold: Option<bool>,
    pub last_modified_time: Option<String>,
}

pub type BlobContainer = ArmResource<BlobContainerProperties>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileShareProperties {
    pub share_quota: Option<i64>,
    pub enabled_protocols: Option<String>,
    pub access_tier: Option<String>,
    pub last_modified_time: Option<String>,
}

pub type FileShare = ArmResource<FileShareProperties>;
