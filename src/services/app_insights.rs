//! `azurerm_application_insights` data source.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::azure::{self, normalize_location};
use crate::client::Clients;
use crate::context::OperationContext;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema, StringValidation};
use crate::services::lifecycle::{self, require_non_empty, Target};

pub const TYPE_NAME: &str = "azurerm_application_insights";

const KIND: &str = "Application Insights bucket";

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationInsightsLookup {
    pub name: String,
    pub resource_group_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationInsightsState {
    pub id: String,
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub app_id: Option<String>,
    pub application_type: Option<String>,
    pub instrumentation_key: Option<String>,
    pub tags: BTreeMap<String, String>,
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
        .with_attribute("app_id", Attribute::computed_string())
        .with_attribute("application_type", Attribute::computed_string())
        .with_attribute("instrumentation_key", Attribute::computed_string().sensitive())
        .with_attribute("tags", azure::schema_tags_for_data_source())
}

#[instrument(skip(clients, ctx, lookup), fields(resource_group = %lookup.resource_group_name, name = %lookup.name))]
pub async fn read_data_source(
    clients: &Clients,
    ctx: &OperationContext,
    lookup: &ApplicationInsightsLookup,
) -> Result<ApplicationInsightsState, ProviderError> {
    require_non_empty("name", &lookup.name)?;
    require_non_empty("resource_group_name", &lookup.resource_group_name)?;

    let target = Target::new(KIND, &lookup.resource_group_name, &lookup.name);
    let component = lifecycle::lookup(
        ctx,
        target,
        clients
            .application_insights
            .get(&lookup.resource_group_name, &lookup.name),
    )
    .await?;

    let props = component.properties.unwrap_or_default();
    Ok(ApplicationInsightsState {
        id: component.id.unwrap_or_default(),
        name: component.name.unwrap_or_else(|| lookup.name.clone()),
        resource_group_name: lookup.resource_group_name.clone(),
        location: component
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        app_id: props.app_id,
        application_type: props.application_type,
        instrumentation_key: props.instrumentation_key,
        tags: azure::flatten_tags(component.tags.as_ref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrumentation_key_is_sensitive() {
        let schema = data_source_schema();
        assert!(schema.block.attributes["instrumentation_key"].flags.sensitive);
        assert!(!schema.block.attributes["app_id"].flags.sensitive);
    }
}
