//! `azurerm_p2s_vpn_gateway`: point-to-site VPN gateways on a virtual hub.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{expand_address_space, flatten_address_space};
use crate::azure::{self, normalize_location};
use crate::client::models::{P2sVpnGateway, P2sVpnGatewayProperties, SubResource, VpnClientConnectionHealth};
use crate::client::{ArmResource, Clients};
use crate::config::Features;
use crate::context::OperationContext;
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema, StringValidation};
use crate::services::lifecycle::{self, require_non_empty, Target};
use crate::services::null_as_default;

/// Host type name.
pub const TYPE_NAME: &str = "azurerm_p2s_vpn_gateway";

const KIND: &str = "P2S VPN Gateway";

/// Declared configuration of the managed resource.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct P2sVpnGatewayConfig {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub p2s_vpn_server_configuration_id: String,
    pub virtual_hub_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_route_address_prefixes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vpn_client_address_pool_prefixes: Vec<String>,
    #[serde(default)]
    pub scale_unit: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,
}

/// Result record of the managed resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct P2sVpnGatewayState {
    pub id: String,
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub p2s_vpn_server_configuration_id: Option<String>,
    pub virtual_hub_id: Option<String>,
    pub custom_route_address_prefixes: Vec<String>,
    pub vpn_client_address_pool_prefixes: Vec<String>,
    pub scale_unit: Option<i32>,
    pub tags: BTreeMap<String, String>,
}

/// Identifying fields of the data source.
#[derive(Debug, Clone, Deserialize)]
pub struct P2sVpnGatewayLookup {
    pub name: String,
    pub resource_group_name: String,
}

/// Result record of the data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct P2sVpnGatewayDataState {
    #[serde(flatten)]
    pub gateway: P2sVpnGatewayState,
    pub vpn_client_connection_health: Vec<ConnectionHealthState>,
}

/// Flattened `vpn_client_connection_health` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionHealthState {
    pub allocated_ip_addresses: Vec<String>,
    pub total_egress_bytes_transferred: i64,
    pub total_ingress_bytes_transferred: i64,
    pub vpn_client_connections_count: i64,
}

pub fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("Manages a Point-to-Site VPN Gateway.")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_force_new()
                .with_validation(StringValidation::NotEmpty),
        )
        .with_attribute("resource_group_name", azure::schema_resource_group_name())
        .with_attribute("location", azure::schema_location())
        .with_attribute(
            "p2s_vpn_server_configuration_id",
            Attribute::required_string().with_validation(StringValidation::ResourceId),
        )
        .with_attribute(
            "virtual_hub_id",
            Attribute::required_string().with_validation(StringValidation::ResourceId),
        )
        .with_attribute("custom_route_address_prefixes", Attribute::optional_string_set())
        .with_attribute("vpn_client_address_pool_prefixes", Attribute::optional_string_set())
        .with_attribute("scale_unit", Attribute::optional_int64())
        .with_attribute("tags", azure::schema_tags())
}

pub fn data_source_schema() -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string().with_validation(StringValidation::NotEmpty),
        )
        .with_attribute(
            "resource_group_name",
            azure::schema_resource_group_name_for_data_source(),
        )
        .with_attribute("location", azure::schema_location_for_data_source())
        .with_attribute("p2s_vpn_server_configuration_id", Attribute::computed_string())
        .with_attribute("virtual_hub_id", Attribute::computed_string())
        .with_attribute("custom_route_address_prefixes", Attribute::computed_string_list())
        .with_attribute("vpn_client_address_pool_prefixes", Attribute::computed_string_list())
        .with_attribute("scale_unit", Attribute::computed_int64())
        .with_attribute("tags", azure::schema_tags_for_data_source())
        .with_block(
            "vpn_client_connection_health",
            NestedBlock::computed_list(
                Block::new()
                    .with_attribute("allocated_ip_addresses", Attribute::computed_string_list())
                    .with_attribute("total_egress_bytes_transferred", Attribute::computed_int64())
                    .with_attribute("total_ingress_bytes_transferred", Attribute::computed_int64())
                    .with_attribute("vpn_client_connections_count", Attribute::computed_int64()),
            ),
        )
}

/// Build the request payload.
pub fn expand(config: &P2sVpnGatewayConfig) -> P2sVpnGateway {
    P2sVpnGateway {
        name: Some(config.name.clone()),
        location: Some(normalize_location(&config.location)),
        tags: azure::expand_tags(&config.tags),
        properties: Some(P2sVpnGatewayProperties {
            virtual_hub: Some(SubResource::new(&config.virtual_hub_id)),
            p2s_vpn_server_configuration: Some(SubResource::new(
                &config.p2s_vpn_server_configuration_id,
            )),
            vpn_client_address_pool: expand_address_space(&config.vpn_client_address_pool_prefixes),
            custom_routes: expand_address_space(&config.custom_route_address_prefixes),
            vpn_gateway_scale_unit: config.scale_unit,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Flatten an API object into the result record.
pub fn flatten(
    gateway: &P2sVpnGateway,
    resource_group: &str,
    name: &str,
) -> Result<P2sVpnGatewayState, ProviderError> {
    let props = gateway.properties.as_ref().ok_or_else(|| {
        ProviderError::Configuration(format!(
            "{} has no properties",
            Target::new(KIND, resource_group, name)
        ))
    })?;

    Ok(P2sVpnGatewayState {
        id: gateway.id.clone().unwrap_or_default(),
        name: gateway.name.clone().unwrap_or_else(|| name.to_string()),
        resource_group_name: resource_group.to_string(),
        location: gateway
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        p2s_vpn_server_configuration_id: props
            .p2s_vpn_server_configuration
            .as_ref()
            .and_then(|r| r.id.clone()),
        virtual_hub_id: props.virtual_hub.as_ref().and_then(|r| r.id.clone()),
        custom_route_address_prefixes: flatten_address_space(props.custom_routes.as_ref()),
        vpn_client_address_pool_prefixes: flatten_address_space(
            props.vpn_client_address_pool.as_ref(),
        ),
        scale_unit: props.vpn_gateway_scale_unit,
        tags: azure::flatten_tags(gateway.tags.as_ref()),
    })
}

/// Flatten connection statistics; absent statistics become an empty list.
pub fn flatten_connection_health(
    health: Option<&VpnClientConnectionHealth>,
) -> Vec<ConnectionHealthState> {
    health
        .map(|h| ConnectionHealthState {
            allocated_ip_addresses: h.allocated_ip_addresses.clone().unwrap_or_default(),
            total_egress_bytes_transferred: h.total_egress_bytes_transferred.unwrap_or_default(),
            total_ingress_bytes_transferred: h.total_ingress_bytes_transferred.unwrap_or_default(),
            vpn_client_connections_count: h.vpn_client_connections_count.map(i64::from).unwrap_or_default(),
        })
        .into_iter()
        .collect()
}

#[instrument(skip(clients, ctx, config), fields(resource_group = %config.resource_group_name, name = %config.name))]
pub async fn create_update(
    clients: &Clients,
    ctx: &OperationContext,
    features: Features,
    config: &P2sVpnGatewayConfig,
    is_new: bool,
) -> Result<P2sVpnGatewayState, ProviderError> {
    require_non_empty("name", &config.name)?;
    require_non_empty("resource_group_name", &config.resource_group_name)?;

    let target = Target::new(KIND, &config.resource_group_name, &config.name);
    let read = lifecycle::upsert(
        clients.p2s_vpn_gateways.as_ref(),
        ctx,
        features,
        target,
        TYPE_NAME,
        &expand(config),
        is_new,
    )
    .await?;

    flatten(&read, &config.resource_group_name, &config.name)
}

/// Refresh by coordinates; `None` when the gateway is gone.
#[instrument(skip(clients, ctx))]
pub async fn read(
    clients: &Clients,
    ctx: &OperationContext,
    resource_group: &str,
    name: &str,
) -> Result<Option<P2sVpnGatewayState>, ProviderError> {
    let target = Target::new(KIND, resource_group, name);
    match lifecycle::refresh(ctx, target, clients.p2s_vpn_gateways.get(resource_group, name)).await? {
        Some(gateway) => flatten(&gateway, resource_group, name).map(Some),
        None => Ok(None),
    }
}

#[instrument(skip(clients, ctx))]
pub async fn delete(
    clients: &Clients,
    ctx: &OperationContext,
    resource_group: &str,
    name: &str,
) -> Result<(), ProviderError> {
    lifecycle::destroy(
        clients.p2s_vpn_gateways.as_ref(),
        ctx,
        Target::new(KIND, resource_group, name),
    )
    .await
}

#[instrument(skip(clients, ctx, lookup), fields(resource_group = %lookup.resource_group_name, name = %lookup.name))]
pub async fn read_data_source(
    clients: &Clients,
    ctx: &OperationContext,
    lookup: &P2sVpnGatewayLookup,
) -> Result<P2sVpnGatewayDataState, ProviderError> {
    require_non_empty("name", &lookup.name)?;
    require_non_empty("resource_group_name", &lookup.resource_group_name)?;

    let target = Target::new(KIND, &lookup.resource_group_name, &lookup.name);
    let gateway = lifecycle::lookup(
        ctx,
        target,
        clients
            .p2s_vpn_gateways
            .get(&lookup.resource_group_name, &lookup.name),
    )
    .await?;

    let health = gateway
        .properties
        .as_ref()
        .and_then(|p| p.vpn_client_connection_health.as_ref());
    Ok(P2sVpnGatewayDataState {
        vpn_client_connection_health: flatten_connection_health(health),
        gateway: flatten(&gateway, &lookup.resource_group_name, &lookup.name)?,
    })
}

/// ARM type segment of gateway IDs.
pub fn arm_type() -> &'static str {
    P2sVpnGateway::RESOURCE_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HUB_ID: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualHubs/hub";
    const CFG_ID: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualWans/wan/p2sVpnServerConfigurations/cfg";

    fn config() -> P2sVpnGatewayConfig {
        serde_json::from_value(json!({
            "name": "gw",
            "resource_group_name": "rg",
            "location": "West Europe",
            "p2s_vpn_server_configuration_id": CFG_ID,
            "virtual_hub_id": HUB_ID,
            "vpn_client_address_pool_prefixes": ["101.3.0.0/16"],
            "custom_route_address_prefixes": null,
        }))
        .unwrap()
    }

    #[test]
    fn test_expand() {
        let gateway = expand(&config());
        assert_eq!(gateway.location.as_deref(), Some("westeurope"));
        let props = gateway.properties.unwrap();
        assert_eq!(props.virtual_hub, Some(SubResource::new(HUB_ID)));
        assert_eq!(
            props.vpn_client_address_pool.unwrap().address_prefixes,
            Some(vec!["101.3.0.0/16".to_string()])
        );
        assert!(props.custom_routes.is_none());
        assert!(props.vpn_gateway_scale_unit.is_none());
    }

    #[test]
    fn test_flatten_defaults_absent_fields() {
        let gateway = P2sVpnGateway {
            id: Some("id".into()),
            location: Some("West Europe".into()),
            properties: Some(P2sVpnGatewayProperties::default()),
            ..Default::default()
        };
        let state = flatten(&gateway, "rg", "gw").unwrap();
        assert_eq!(state.name, "gw");
        assert_eq!(state.location, "westeurope");
        assert!(state.custom_route_address_prefixes.is_empty());
        assert!(state.virtual_hub_id.is_none());
        assert!(state.tags.is_empty());
    }

    #[test]
    fn test_flatten_without_properties_is_configuration_error() {
        let err = flatten(&P2sVpnGateway::default(), "rg", "gw").unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_flatten_round_trip() {
        let mut config = config();
        config.custom_route_address_prefixes = vec!["101.168.0.6/32".into()];
        config.scale_unit = Some(1);
        config.tags.insert("env".into(), "test".into());

        let mut gateway = expand(&config);
        gateway.id =
            Some("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/p2sVpnGateways/gw".to_string());
        let state = flatten(&gateway, "rg", "gw").unwrap();

        assert_eq!(state.custom_route_address_prefixes, config.custom_route_address_prefixes);
        assert_eq!(state.vpn_client_address_pool_prefixes, config.vpn_client_address_pool_prefixes);
        assert_eq!(state.scale_unit, Some(1));
        assert_eq!(state.tags["env"], "test");
        assert_eq!(state.p2s_vpn_server_configuration_id.as_deref(), Some(CFG_ID));
    }

    #[test]
    fn test_flatten_connection_health() {
        assert!(flatten_connection_health(None).is_empty());

        let health = VpnClientConnectionHealth {
            vpn_client_connections_count: Some(3),
            allocated_ip_addresses: Some(vec!["101.3.0.4".into()]),
            ..Default::default()
        };
        let flat = flatten_connection_health(Some(&health));
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].vpn_client_connections_count, 3);
        assert_eq!(flat[0].total_egress_bytes_transferred, 0);
    }

    #[test]
    fn test_schemas() {
        let schema = resource_schema();
        assert!(schema.block.attributes["name"].force_new);
        assert!(schema.block.attributes["location"].force_new);
        assert!(!schema.block.attributes["virtual_hub_id"].force_new);
        assert!(data_source_schema().block.blocks["vpn_client_connection_health"].computed);
    }
}
