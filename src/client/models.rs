//! Request and response shapes of the Azure Resource Manager API.
//!
//! Field names follow the ARM JSON documents. Everything the API may omit is
//! an `Option`, so flatteners have to decide on a default explicitly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ArmResource;

/// Resource tags as returned by ARM.
pub type Tags = BTreeMap<String, String>;

/// A reference to another resource by ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SubResource {
    /// Reference the resource with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

/// A list of CIDR prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefixes: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Point-to-site VPN gateways
// ---------------------------------------------------------------------------

/// `Microsoft.Network/p2sVpnGateways`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct P2sVpnGateway {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<P2sVpnGatewayProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct P2sVpnGatewayProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_hub: Option<SubResource>,
    #[serde(
        rename = "p2SVpnServerConfiguration",
        skip_serializing_if = "Option::is_none"
    )]
    pub p2s_vpn_server_configuration: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_client_address_pool: Option<AddressSpace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_routes: Option<AddressSpace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_gateway_scale_unit: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_client_connection_health: Option<VpnClientConnectionHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// Read-only connection statistics of a point-to-site gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnClientConnectionHealth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ingress_bytes_transferred: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_egress_bytes_transferred: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_client_connections_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_ip_addresses: Option<Vec<String>>,
}

impl ArmResource for P2sVpnGateway {
    const PROVIDER_NAMESPACE: &'static str = "Microsoft.Network";
    const RESOURCE_TYPE: &'static str = "p2sVpnGateways";
    const API_VERSION: &'static str = "2019-06-01";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Private endpoints
// ---------------------------------------------------------------------------

/// `Microsoft.Network/privateEndpoints`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivateEndpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PrivateEndpointProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateEndpointProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interfaces: Option<Vec<SubResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_link_service_connections: Option<Vec<PrivateLinkServiceConnection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_private_link_service_connections: Option<Vec<PrivateLinkServiceConnection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// One connection from a private endpoint to a private link service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivateLinkServiceConnection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PrivateLinkServiceConnectionProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateLinkServiceConnectionProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_link_service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_link_service_connection_state: Option<PrivateLinkServiceConnectionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// Approval state reported by the service provider side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateLinkServiceConnectionState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions_required: Option<String>,
}

impl ArmResource for PrivateEndpoint {
    const PROVIDER_NAMESPACE: &'static str = "Microsoft.Network";
    const RESOURCE_TYPE: &'static str = "privateEndpoints";
    const API_VERSION: &'static str = "2019-06-01";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Application Insights
// ---------------------------------------------------------------------------

/// `Microsoft.Insights/components`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInsightsComponent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ApplicationInsightsComponentProperties>,
}

/// The components API uses PascalCase property names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInsightsComponentProperties {
    #[serde(rename = "AppId", skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(rename = "Application_Type", skip_serializing_if = "Option::is_none")]
    pub application_type: Option<String>,
    #[serde(rename = "InstrumentationKey", skip_serializing_if = "Option::is_none")]
    pub instrumentation_key: Option<String>,
}

impl ArmResource for ApplicationInsightsComponent {
    const PROVIDER_NAMESPACE: &'static str = "Microsoft.Insights";
    const RESOURCE_TYPE: &'static str = "components";
    const API_VERSION: &'static str = "2015-05-01";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Resource groups and subscriptions
// ---------------------------------------------------------------------------

/// `Microsoft.Resources/resourceGroups`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

/// A subscription as returned by `GET /subscriptions/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_policies: Option<SubscriptionPolicies>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPolicies {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_placement_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spending_limit: Option<String>,
}

// ---------------------------------------------------------------------------
// Automation variables
// ---------------------------------------------------------------------------

/// `Microsoft.Automation/automationAccounts/variables`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationVariable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<AutomationVariableProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationVariableProperties {
    /// JSON-encoded value, e.g. `"true"` or `"\"text\""`. Absent when
    /// encrypted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_encrypted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_p2s_gateway_wire_names() {
        let body = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/p2sVpnGateways/gw",
            "name": "gw",
            "location": "westus2",
            "properties": {
                "virtualHub": {"id": "hub"},
                "p2SVpnServerConfiguration": {"id": "cfg"},
                "vpnClientAddressPool": {"addressPrefixes": ["101.3.0.0/16"]},
                "vpnGatewayScaleUnit": 1,
                "vpnClientConnectionHealth": {"vpnClientConnectionsCount": 2}
            }
        });
        let gw: P2sVpnGateway = serde_json::from_value(body).unwrap();
        let props = gw.properties.unwrap();
        assert_eq!(props.virtual_hub, Some(SubResource::new("hub")));
        assert_eq!(props.p2s_vpn_server_configuration, Some(SubResource::new("cfg")));
        assert_eq!(props.vpn_gateway_scale_unit, Some(1));
        assert!(props.custom_routes.is_none());
        assert_eq!(
            props
                .vpn_client_connection_health
                .unwrap()
                .vpn_client_connections_count,
            Some(2)
        );
    }

    #[test]
    fn test_absent_fields_are_not_serialized() {
        let gw = P2sVpnGateway {
            name: Some("gw".to_string()),
            properties: Some(P2sVpnGatewayProperties {
                virtual_hub: Some(SubResource::new("hub")),
                ..Default::default()
            }),
            ..Default::default()
        };
        let value = serde_json::to_value(&gw).unwrap();
        assert_eq!(
            value,
            json!({"name": "gw", "properties": {"virtualHub": {"id": "hub"}}})
        );
    }

    #[test]
    fn test_application_insights_pascal_case_properties() {
        let body = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Insights/components/ai",
            "properties": {
                "AppId": "app",
                "Application_Type": "web",
                "InstrumentationKey": "key"
            }
        });
        let component: ApplicationInsightsComponent = serde_json::from_value(body).unwrap();
        let props = component.properties.unwrap();
        assert_eq!(props.app_id.as_deref(), Some("app"));
        assert_eq!(props.application_type.as_deref(), Some("web"));
        assert_eq!(props.instrumentation_key.as_deref(), Some("key"));
    }
}
