//! Azure conventions shared by every resource type: resource IDs, location
//! normalization, tags, and the schema fragments that recur across types.

mod resource_id;

pub use resource_id::{is_resource_id, ResourceId};

use std::collections::BTreeMap;

use crate::client::models::Tags;
use crate::schema::{Attribute, AttributeType, StateNormalization, StringValidation};

/// Canonical form of an Azure location: lower case, no spaces.
///
/// ```
/// assert_eq!(azurerm_provider::azure::normalize_location("West US 2"), "westus2");
/// ```
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

/// Declared tags as sent to the API. Empty maps are sent as empty, so tags
/// removed from configuration are removed remotely.
pub fn expand_tags(tags: &BTreeMap<String, String>) -> Option<Tags> {
    Some(tags.clone())
}

/// API tags as stored in state; absent tags become an empty map.
pub fn flatten_tags(tags: Option<&Tags>) -> BTreeMap<String, String> {
    tags.cloned().unwrap_or_default()
}

/// `resource_group_name` on a managed resource.
pub fn schema_resource_group_name() -> Attribute {
    Attribute::required_string()
        .with_force_new()
        .with_validation(StringValidation::NotEmpty)
        .with_description("The name of the resource group in which to create the resource.")
}

/// `resource_group_name` on a data source.
pub fn schema_resource_group_name_for_data_source() -> Attribute {
    Attribute::required_string()
        .with_validation(StringValidation::NotEmpty)
        .with_description("The name of the resource group the object lives in.")
}

/// `location` on a managed resource.
pub fn schema_location() -> Attribute {
    Attribute::required_string()
        .with_force_new()
        .with_validation(StringValidation::NotEmpty)
        .with_normalization(StateNormalization::Location)
        .with_description("The Azure location where the resource exists.")
}

/// `location` on a data source.
pub fn schema_location_for_data_source() -> Attribute {
    Attribute::computed_string()
}

/// `tags` on a managed resource.
pub fn schema_tags() -> Attribute {
    Attribute::new(
        AttributeType::map(AttributeType::String),
        crate::schema::AttributeFlags::optional(),
    )
}

/// `tags` on a data source.
pub fn schema_tags_for_data_source() -> Attribute {
    Attribute::new(
        AttributeType::map(AttributeType::String),
        crate::schema::AttributeFlags::computed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_location() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("westeurope"), "westeurope");
        assert_eq!(normalize_location("East US 2"), "eastus2");
    }

    #[test]
    fn test_tags_expand_and_flatten() {
        let mut tags = BTreeMap::new();
        tags.insert("env".to_string(), "test".to_string());

        let expanded = expand_tags(&tags).unwrap();
        assert_eq!(expanded.get("env").map(String::as_str), Some("test"));
        assert_eq!(flatten_tags(Some(&expanded)), tags);
        assert!(flatten_tags(None).is_empty());
    }

    #[test]
    fn test_common_schema_flags() {
        let rg = schema_resource_group_name();
        assert!(rg.flags.required);
        assert!(rg.force_new);

        assert_eq!(
            schema_location().normalization,
            Some(StateNormalization::Location)
        );

        let location = schema_location_for_data_source();
        assert!(location.flags.computed);
        assert!(!location.flags.required);

        assert_eq!(
            schema_tags().attr_type,
            AttributeType::map(AttributeType::String)
        );
        assert!(schema_tags_for_data_source().flags.computed);
    }
}
