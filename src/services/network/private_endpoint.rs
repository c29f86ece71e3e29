//! `azurerm_private_endpoint`: a network interface in a subnet that connects
//! privately to a private link service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::azure::{self, normalize_location};
use crate::client::models::{
    PrivateEndpoint, PrivateEndpointProperties, PrivateLinkServiceConnection,
    PrivateLinkServiceConnectionProperties, SubResource,
};
use crate::client::{ArmResource, Clients};
use crate::config::Features;
use crate::context::OperationContext;
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema, StringValidation};
use crate::services::lifecycle::{self, require_non_empty, Target};
use crate::services::null_as_default;

/// Host type name.
pub const TYPE_NAME: &str = "azurerm_private_endpoint";

/// Sent when a connection declares no request message.
pub const DEFAULT_REQUEST_MESSAGE: &str = "Please approve my connection.";

const KIND: &str = "Private Endpoint";

fn default_request_message() -> String {
    DEFAULT_REQUEST_MESSAGE.to_string()
}

/// One declared or flattened private link service connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub private_link_service_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub group_ids: Vec<String>,
    #[serde(default = "default_request_message")]
    pub request_message: String,
}

/// Declared configuration of the managed resource.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrivateEndpointConfig {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub private_link_service_connections: Vec<ConnectionConfig>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub manual_private_link_service_connections: Vec<ConnectionConfig>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,
}

/// Result record of both the managed resource and the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateEndpointState {
    pub id: String,
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub subnet_id: Option<String>,
    pub private_link_service_connections: Vec<ConnectionConfig>,
    pub manual_private_link_service_connections: Vec<ConnectionConfig>,
    pub network_interface_ids: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

/// Identifying fields of the data source.
#[derive(Debug, Clone, Deserialize)]
pub struct PrivateEndpointLookup {
    pub name: String,
    pub resource_group_name: String,
}

fn connection_block() -> Block {
    Block::new()
        .with_attribute(
            "name",
            Attribute::required_string().with_validation(StringValidation::NotEmpty),
        )
        .with_attribute(
            "private_link_service_id",
            Attribute::required_string().with_validation(StringValidation::ResourceId),
        )
        .with_attribute("group_ids", Attribute::optional_string_list())
        .with_attribute(
            "request_message",
            Attribute::optional_string()
                .with_default(serde_json::json!(DEFAULT_REQUEST_MESSAGE))
                .with_validation(StringValidation::NotEmpty),
        )
}

fn computed_connection_block() -> Block {
    Block::new()
        .with_attribute("name", Attribute::computed_string())
        .with_attribute("private_link_service_id", Attribute::computed_string())
        .with_attribute("group_ids", Attribute::computed_string_list())
        .with_attribute("request_message", Attribute::computed_string())
}

pub fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("Manages a Private Endpoint.")
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
            "subnet_id",
            Attribute::optional_string().with_validation(StringValidation::ResourceId),
        )
        .with_attribute("network_interface_ids", Attribute::computed_string_list())
        .with_attribute("tags", azure::schema_tags())
        .with_block(
            "private_link_service_connections",
            NestedBlock::list(connection_block()).with_min_items(1),
        )
        .with_block(
            "manual_private_link_service_connections",
            NestedBlock::list(connection_block()).with_min_items(1),
        )
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
        .with_attribute("subnet_id", Attribute::computed_string())
        .with_attribute("network_interface_ids", Attribute::computed_string_list())
        .with_attribute("tags", azure::schema_tags_for_data_source())
        .with_block(
            "private_link_service_connections",
            NestedBlock::computed_list(computed_connection_block()),
        )
        .with_block(
            "manual_private_link_service_connections",
            NestedBlock::computed_list(computed_connection_block()),
        )
}

fn expand_connections(connections: &[ConnectionConfig]) -> Option<Vec<PrivateLinkServiceConnection>> {
    if connections.is_empty() {
        return None;
    }
    Some(
        connections
            .iter()
            .map(|c| PrivateLinkServiceConnection {
                name: Some(c.name.clone()),
                properties: Some(PrivateLinkServiceConnectionProperties {
                    private_link_service_id: Some(c.private_link_service_id.clone()),
                    group_ids: Some(c.group_ids.clone()),
                    request_message: Some(c.request_message.clone()),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect(),
    )
}

/// Flatten connections in API order. Absent fields become empty values.
pub fn flatten_connections(connections: Option<&Vec<PrivateLinkServiceConnection>>) -> Vec<ConnectionConfig> {
    connections
        .map(|list| {
            list.iter()
                .map(|c| {
                    let props = c.properties.as_ref();
                    ConnectionConfig {
                        name: c.name.clone().unwrap_or_default(),
                        private_link_service_id: props
                            .and_then(|p| p.private_link_service_id.clone())
                            .unwrap_or_default(),
                        group_ids: props.and_then(|p| p.group_ids.clone()).unwrap_or_default(),
                        request_message: props
                            .and_then(|p| p.request_message.clone())
                            .unwrap_or_default(),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Build the request payload.
pub fn expand(config: &PrivateEndpointConfig) -> PrivateEndpoint {
    PrivateEndpoint {
        name: Some(config.name.clone()),
        location: Some(normalize_location(&config.location)),
        tags: azure::expand_tags(&config.tags),
        properties: Some(PrivateEndpointProperties {
            subnet: config
                .subnet_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(SubResource::new),
            private_link_service_connections: expand_connections(&config.private_link_service_connections),
            manual_private_link_service_connections: expand_connections(
                &config.manual_private_link_service_connections,
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Flatten an API object into the result record.
pub fn flatten(
    endpoint: &PrivateEndpoint,
    resource_group: &str,
    name: &str,
) -> Result<PrivateEndpointState, ProviderError> {
    let props = endpoint.properties.as_ref().ok_or_else(|| {
        ProviderError::Configuration(format!(
            "{} has no properties",
            Target::new(KIND, resource_group, name)
        ))
    })?;

    Ok(PrivateEndpointState {
        id: endpoint.id.clone().unwrap_or_default(),
        name: endpoint.name.clone().unwrap_or_else(|| name.to_string()),
        resource_group_name: resource_group.to_string(),
        location: endpoint
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        subnet_id: props.subnet.as_ref().and_then(|s| s.id.clone()),
        private_link_service_connections: flatten_connections(
            props.private_link_service_connections.as_ref(),
        ),
        manual_private_link_service_connections: flatten_connections(
            props.manual_private_link_service_connections.as_ref(),
        ),
        network_interface_ids: props
            .network_interfaces
            .iter()
            .flatten()
            .filter_map(|nic| nic.id.clone())
            .collect(),
        tags: azure::flatten_tags(endpoint.tags.as_ref()),
    })
}

#[instrument(skip(clients, ctx, config), fields(resource_group = %config.resource_group_name, name = %config.name))]
pub async fn create_update(
    clients: &Clients,
    ctx: &OperationContext,
    features: Features,
    config: &PrivateEndpointConfig,
    is_new: bool,
) -> Result<PrivateEndpointState, ProviderError> {
    require_non_empty("name", &config.name)?;
    require_non_empty("resource_group_name", &config.resource_group_name)?;

    let target = Target::new(KIND, &config.resource_group_name, &config.name);
    let read = lifecycle::upsert(
        clients.private_endpoints.as_ref(),
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

/// Refresh by coordinates; `None` when the endpoint is gone.
#[instrument(skip(clients, ctx))]
pub async fn read(
    clients: &Clients,
    ctx: &OperationContext,
    resource_group: &str,
    name: &str,
) -> Result<Option<PrivateEndpointState>, ProviderError> {
    let target = Target::new(KIND, resource_group, name);
    match lifecycle::refresh(ctx, target, clients.private_endpoints.get(resource_group, name)).await? {
        Some(endpoint) => flatten(&endpoint, resource_group, name).map(Some),
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
        clients.private_endpoints.as_ref(),
        ctx,
        Target::new(KIND, resource_group, name),
    )
    .await
}

#[instrument(skip(clients, ctx, lookup), fields(resource_group = %lookup.resource_group_name, name = %lookup.name))]
pub async fn read_data_source(
    clients: &Clients,
    ctx: &OperationContext,
    lookup: &PrivateEndpointLookup,
) -> Result<PrivateEndpointState, ProviderError> {
    require_non_empty("name", &lookup.name)?;
    require_non_empty("resource_group_name", &lookup.resource_group_name)?;

    let target = Target::new(KIND, &lookup.resource_group_name, &lookup.name);
    let endpoint = lifecycle::lookup(
        ctx,
        target,
        clients
            .private_endpoints
            .get(&lookup.resource_group_name, &lookup.name),
    )
    .await?;

    flatten(&endpoint, &lookup.resource_group_name, &lookup.name)
}

/// ARM type segment of private endpoint IDs.
pub fn arm_type() -> &'static str {
    PrivateEndpoint::RESOURCE_TYPE
}
