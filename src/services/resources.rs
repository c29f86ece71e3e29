//! `azurerm_resource_group` and `azurerm_subscription` data sources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::azure::{self, normalize_location};
use crate::client::Clients;
use crate::context::OperationContext;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema, StringValidation};
use crate::services::lifecycle::{self, require_non_empty};

pub const RESOURCE_GROUP_TYPE_NAME: &str = "azurerm_resource_group";
pub const SUBSCRIPTION_TYPE_NAME: &str = "azurerm_subscription";

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceGroupLookup {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceGroupState {
    pub id: String,
    pub name: String,
    pub location: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionLookup {
    #[serde(default)]
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionState {
    pub id: String,
    pub subscription_id: String,
    pub display_name: Option<String>,
    pub tenant_id: Option<String>,
    pub state: Option<String>,
    pub location_placement_id: Option<String>,
    pub quota_id: Option<String>,
    pub spending_limit: Option<String>,
}

pub fn resource_group_schema() -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string().with_validation(StringValidation::NotEmpty),
        )
        .with_attribute("location", azure::schema_location_for_data_source())
        .with_attribute("tags", azure::schema_tags_for_data_source())
}

pub fn subscription_schema() -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "subscription_id",
            Attribute::new(
                crate::schema::AttributeType::String,
                crate::schema::AttributeFlags::optional_computed(),
            )
            .with_description("Defaults to the subscription the provider is configured for."),
        )
        .with_attribute("display_name", Attribute::computed_string())
        .with_attribute("tenant_id", Attribute::computed_string())
        .with_attribute("state", Attribute::computed_string())
        .with_attribute("location_placement_id", Attribute::computed_string())
        .with_attribute("quota_id", Attribute::computed_string())
        .with_attribute("spending_limit", Attribute::computed_string())
}

#[instrument(skip(clients, ctx, lookup), fields(name = %lookup.name))]
pub async fn read_resource_group(
    clients: &Clients,
    ctx: &OperationContext,
    lookup: &ResourceGroupLookup,
) -> Result<ResourceGroupState, ProviderError> {
    require_non_empty("name", &lookup.name)?;

    let what = format!("Resource Group {:?}", lookup.name);
    let group = lifecycle::lookup(ctx, &what, clients.resource_groups.get(&lookup.name)).await?;

    Ok(ResourceGroupState {
        id: group.id.unwrap_or_default(),
        name: group.name.unwrap_or_else(|| lookup.name.clone()),
        location: group
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        tags: azure::flatten_tags(group.tags.as_ref()),
    })
}

/// Read a subscription; without an explicit ID, the configured one.
#[instrument(skip(clients, ctx, lookup))]
pub async fn read_subscription(
    clients: &Clients,
    ctx: &OperationContext,
    lookup: &SubscriptionLookup,
) -> Result<SubscriptionState, ProviderError> {
    let subscription_id = lookup
        .subscription_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .unwrap_or(&clients.subscription_id);

    let what = format!("Subscription {:?}", subscription_id);
    let found = lifecycle::lookup(ctx, &what, clients.subscriptions.get(subscription_id)).await?;
    let policies = found.subscription_policies.unwrap_or_default();

    Ok(SubscriptionState {
        id: found.id.unwrap_or_default(),
        subscription_id: found
            .subscription_id
            .unwrap_or_else(|| subscription_id.to_string()),
        display_name: found.display_name,
        tenant_id: found.tenant_id,
        state: found.state,
        location_placement_id: policies.location_placement_id,
        quota_id: policies.quota_id,
        spending_limit: policies.spending_limit,
    })
}
