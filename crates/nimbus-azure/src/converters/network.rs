//! Virtual networks, subnets, security groups and public IP addresses

use super::{direct_or_mapped, raw, KEY_FILTER};
use crate::constants::{classes, entities, INTERNET_KEY};
use nimbus_core::{generate_entity_key, Entity, KeyError, Relationship, RelationshipClass, TargetFilter};
use nimbus_provider::records::{NetworkSecurityGroup, PublicIpAddress, SecurityRule, Subnet, VirtualNetwork};

pub fn create_vnet_entity(vnet: &VirtualNetwork) -> Result<Entity, KeyError> {
    let prefixes = vnet
        .properties
        .address_space
        .as_ref()
        .map(|space| space.address_prefixes.clone())
        .unwrap_or_default();

    Ok(Entity::new(generate_entity_key(&vnet.id)?, entities::VNET, classes::VNET)
        .with_property("id", &vnet.id)
        .with_property("name", vnet.display_name())
        .with_property("location", vnet.location.clone())
        .with_property("resourceGroup", vnet.resource_group())
        .with_property("addressPrefixes", prefixes)
        .with_property("provisioningState", vnet.properties.provisioning_state.clone())
        .with_raw_data(raw(vnet)))
}

pub fn create_subnet_entity(vnet: &Entity, subnet: &Subnet) -> Result<Entity, KeyError> {
    Ok(Entity::new(generate_entity_key(&subnet.id)?, entities::SUBNET, classes::SUBNET)
        .with_property("id", &subnet.id)
        .with_property("name", subnet.display_name())
        .with_property("vnetKey", &vnet.key)
        .with_property("addressPrefix", subnet.properties.address_prefix.clone())
        .with_property(
            "securityGroupId",
            subnet.properties.network_security_group.as_ref().map(|nsg| nsg.id.clone()),
        )
        .with_property("provisioningState", subnet.properties.provisioning_state.clone())
        .with_raw_data(raw(subnet)))
}

pub fn create_security_group_entity(nsg: &NetworkSecurityGroup) -> Result<Entity, KeyError> {
    Ok(Entity::new(generate_entity_key(&nsg.id)?, entities::SECURITY_GROUP, classes::SECURITY_GROUP)
        .with_property("id", &nsg.id)
        .with_property("name", nsg.display_name())
        .with_property("location", nsg.location.clone())
        .with_property("resourceGroup", nsg.resource_group())
        .with_property("ruleCount", nsg.properties.security_rules.len() as i64)
        .with_raw_data(raw(nsg)))
}

pub fn create_public_ip_entity(address: &PublicIpAddress) -> Result<Entity, KeyError> {
    let props = &address.properties;
    Ok(Entity::new(
        generate_entity_key(&address.id)?,
        entities::PUBLIC_IP_ADDRESS,
        classes::PUBLIC_IP_ADDRESS,
    )
    .with_property("id", &address.id)
    .with_property("name", address.display_name())
    .with_property("location", address.location.clone())
    .with_property("resourceGroup", address.resource_group())
    .with_property("publicIp", props.ip_address.clone())
    .with_property("allocationMethod", props.public_ip_allocation_method.clone())
    .with_property("ipVersion", props.public_ip_address_version.clone())
    .with_property("idleTimeoutMinutes", props.idle_timeout_in_minutes)
    .with_property("sku", address.sku.as_ref().and_then(|s| s.name.clone()))
    .with_property("public", true)
    .with_raw_data(raw(address)))
}

/// `security group PROTECTS subnet`
pub fn create_protects_subnet(nsg: &Entity, subnet_key: &str, subnet_known: bool) -> Relationship {
    direct_or_mapped(RelationshipClass::Protects, nsg, subnet_key, entities::SUBNET, subnet_known)
}

/// Remote side of a security rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    Internet,
    /// The `VirtualNetwork` service tag: the subnets the group protects
    VirtualNetwork,
    IpAddress(String),
    ServiceTag(String),
}

pub fn classify_address_prefix(prefix: &str) -> RuleTarget {
    let prefix = prefix.trim();
    match prefix {
        "*" | "0.0.0.0/0" | "Internet" => RuleTarget::Internet,
        "VirtualNetwork" => RuleTarget::VirtualNetwork,
        _ if prefix.starts_with(|c: char| c.is_ascii_digit()) || prefix.contains(':') => {
            RuleTarget::IpAddress(prefix.to_string())
        }
        _ => RuleTarget::ServiceTag(prefix.to_string()),
    }
}

fn inbound(rule: &SecurityRule) -> bool {
    !rule
        .properties
        .direction
        .as_deref()
        .is_some_and(|d| d.eq_ignore_ascii_case("Outbound"))
}

fn combined(single: &Option<String>, many: &[String]) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in single.iter().chain(many) {
        let value = value.trim();
        if !value.is_empty() && !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    values
}

/// Remote prefixes grouped by the target they resolve to, first prefix kept.
/// `0.0.0.0/0` and `Internet` in one rule are the same edge.
fn distinct_targets(remotes: &[String]) -> Vec<(RuleTarget, &str)> {
    let mut targets: Vec<(RuleTarget, &str)> = Vec::new();
    for remote in remotes {
        let target = classify_address_prefix(remote);
        if !targets.iter().any(|(seen, _)| *seen == target) {
            targets.push((target, remote.as_str()));
        }
    }
    targets
}

/// `security group ALLOWS|DENIES target` edges for one rule.
///
/// The remote side is the rule's source for inbound rules and its
/// destination for outbound rules. One edge is emitted per distinct remote
/// target and destination port, keyed with a `rule_name:port` discriminator.
/// Rules without an access value yield nothing.
pub fn create_rule_relationships(
    nsg: &Entity,
    rule: &SecurityRule,
    protected_subnet_keys: &[String],
) -> Vec<Relationship> {
    let props = &rule.properties;
    let class = match props.access.as_deref() {
        Some(access) if access.eq_ignore_ascii_case("Allow") => RelationshipClass::Allows,
        Some(access) if access.eq_ignore_ascii_case("Deny") => RelationshipClass::Denies,
        _ => return Vec::new(),
    };

    let inbound = inbound(rule);
    let remotes = if inbound {
        combined(&props.source_address_prefix, &props.source_address_prefixes)
    } else {
        combined(&props.destination_address_prefix, &props.destination_address_prefixes)
    };
    let mut ports = combined(&props.destination_port_range, &props.destination_port_ranges);
    if ports.is_empty() {
        ports.push("*".to_string());
    }

    let rule_name = rule.display_name();
    let mut relationships = Vec::new();

    for (target, remote) in distinct_targets(&remotes) {
        for port in &ports {
            let discriminator = format!("{}:{}", rule_name, port);
            let edges: Vec<Relationship> = match &target {
                RuleTarget::Internet => vec![Relationship::mapped(
                    class,
                    nsg,
                    TargetFilter::new(entities::INTERNET).with_filter(KEY_FILTER, INTERNET_KEY),
                )],
                RuleTarget::VirtualNetwork => protected_subnet_keys
                    .iter()
                    .map(|subnet_key| {
                        Relationship::direct_by_key(class, &nsg.key, &nsg.entity_type, subnet_key, entities::SUBNET)
                    })
                    .collect(),
                RuleTarget::IpAddress(address) => vec![Relationship::mapped(
                    class,
                    nsg,
                    TargetFilter::new(entities::IP_ADDRESS).with_filter("address", address),
                )],
                RuleTarget::ServiceTag(tag) => vec![Relationship::mapped(
                    class,
                    nsg,
                    TargetFilter::new(entities::SERVICE_TAG)
                        .with_filter("name", tag)
                        .skip_target_creation(true),
                )],
            };

            relationships.extend(edges.into_iter().map(|edge| {
                edge.with_discriminator(&discriminator)
                    .with_property("ruleName", rule_name.as_str())
                    .with_property("ingress", inbound)
                    .with_property("egress", !inbound)
                    .with_property("priority", props.priority)
                    .with_property("protocol", props.protocol.clone())
                    .with_property("portRange", port.as_str())
                    .with_property("remoteAddress", remote)
            }));
        }
    }

    relationships
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::RelationshipTarget;
    use serde_json::json;

    const NSG_ID: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkSecurityGroups/nsg1";

    fn nsg_entity() -> Entity {
        let record: NetworkSecurityGroup = serde_json::from_value(json!({"id": NSG_ID, "name": "nsg1"})).unwrap();
        create_security_group_entity(&record).unwrap()
    }

    fn rule(value: serde_json::Value) -> SecurityRule {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_classify_address_prefix() {
        assert_eq!(classify_address_prefix("*"), RuleTarget::Internet);
        assert_eq!(classify_address_prefix("Internet"), RuleTarget::Internet);
        assert_eq!(classify_address_prefix("VirtualNetwork"), RuleTarget::VirtualNetwork);
        assert_eq!(
            classify_address_prefix("10.0.0.0/24"),
            RuleTarget::IpAddress("10.0.0.0/24".into())
        );
        assert_eq!(
            classify_address_prefix("AzureLoadBalancer"),
            RuleTarget::ServiceTag("AzureLoadBalancer".into())
        );
    }

    #[test]
    fn test_inbound_internet_rule_per_port() {
        let nsg = nsg_entity();
        let rule = rule(json!({
            "id": format!("{}/securityRules/allow-web", NSG_ID),
            "name": "allow-web",
            "properties": {
                "access": "Allow",
                "direction": "Inbound",
                "priority": 100,
                "protocol": "Tcp",
                "sourceAddressPrefix": "*",
                "destinationPortRanges": ["80", "443"]
            }
        }));

        let edges = create_rule_relationships(&nsg, &rule, &[]);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.class == RelationshipClass::Allows));
        assert_eq!(edges[0].relationship_type, "azure_security_group_allows_internet");
        assert_ne!(edges[0].key, edges[1].key);
        assert!(edges[1].key.ends_with("|allow-web:443"));
        match &edges[0].target {
            RelationshipTarget::Mapped(filter) => {
                assert_eq!(filter.filter[KEY_FILTER].as_str(), Some(INTERNET_KEY))
            }
            other => panic!("expected mapped target, got {:?}", other),
        }
    }

    #[test]
    fn test_outbound_rule_uses_destination_and_virtual_network_targets_subnets() {
        let nsg = nsg_entity();
        let rule = rule(json!({
            "id": "r",
            "name": "deny-vnet",
            "properties": {
                "access": "Deny",
                "direction": "Outbound",
                "sourceAddressPrefix": "Internet",
                "destinationAddressPrefix": "VirtualNetwork",
                "destinationPortRange": "*"
            }
        }));

        let subnets = vec!["subnet-a".to_string(), "subnet-b".to_string()];
        let edges = create_rule_relationships(&nsg, &rule, &subnets);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.class == RelationshipClass::Denies && !e.is_mapped()));
        assert_eq!(edges[0].to_key(), Some("subnet-a"));
        assert_eq!(edges[0].relationship_type, "azure_security_group_denies_subnet");
    }

    #[test]
    fn test_aliased_internet_prefixes_yield_one_edge_per_port() {
        let nsg = nsg_entity();
        let rule = rule(json!({
            "id": "r",
            "name": "allow-any",
            "properties": {
                "access": "Allow",
                "direction": "Inbound",
                "sourceAddressPrefixes": ["0.0.0.0/0", "Internet", "*"],
                "destinationPortRange": "443",
                "destinationPortRanges": ["443", "8443"]
            }
        }));

        let edges = create_rule_relationships(&nsg, &rule, &[]);
        let keys: Vec<&str> = edges.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(edges.len(), 2, "keys: {:?}", keys);
        assert!(keys[0].ends_with("|allow-any:443"));
        assert!(keys[1].ends_with("|allow-any:8443"));
        assert_eq!(
            edges[0].properties.get("remoteAddress").and_then(|v| v.as_str()),
            Some("0.0.0.0/0")
        );
    }

    #[test]
    fn test_distinct_targets_in_one_rule_keep_separate_edges() {
        let nsg = nsg_entity();
        let rule = rule(json!({
            "id": "r",
            "name": "mixed",
            "properties": {
                "access": "Deny",
                "sourceAddressPrefixes": ["Internet", "10.0.0.0/8", "AzureLoadBalancer"],
                "destinationPortRange": "22"
            }
        }));

        let edges = create_rule_relationships(&nsg, &rule, &[]);
        assert_eq!(edges.len(), 3);
        let mut keys: Vec<&str> = edges.iter().map(|e| e.key.as_str()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_rule_without_access_is_skipped() {
        let nsg = nsg_entity();
        let rule = rule(json!({"id": "r", "name": "r", "properties": {"sourceAddressPrefix": "*"}}));
        assert!(create_rule_relationships(&nsg, &rule, &[]).is_empty());
    }

    #[test]
    fn test_subnet_entity_records_vnet() {
        let vnet: VirtualNetwork = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v1",
            "properties": {
                "addressSpace": {"addressPrefixes": ["10.0.0.0/16"]},
                "subnets": [{"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v1/subnets/default",
                             "properties": {"addressPrefix": "10.0.0.0/24"}}]
            }
        }))
        .unwrap();

        let vnet_entity = create_vnet_entity(&vnet).unwrap();
        let subnet = create_subnet_entity(&vnet_entity, &vnet.properties.subnets[0]).unwrap();
        assert_eq!(subnet.property("name").and_then(|v| v.as_str()), Some("default"));
        assert_eq!(subnet.property("vnetKey").and_then(|v| v.as_str()), Some(vnet_entity.key.as_str()));
    }
}
