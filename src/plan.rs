//! Shallow plan computation from a schema.
//!
//! The host owns the real diff, but the protocol asks the provider for a
//! planned state. Changes are reported per top-level attribute or block;
//! nested values are compared as a whole, after defaults are filled and
//! normalized strings are put in canonical form. An unset collection equals
//! an empty one.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::schema::{AttributeType, Block, BlockNestingMode, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Plan the transition from `prior` to `proposed`.
///
/// - `prior` null: a create; every set attribute is added.
/// - `proposed` null: a destroy; every prior attribute is removed.
/// - otherwise an update; a changed force-new attribute sets
///   `requires_replace`, and computed values the user did not set are carried
///   forward from `prior` unless the resource is being replaced.
///
/// # Examples
///
/// ```
/// use azurerm_provider::plan::plan;
/// use azurerm_provider::schema::{Attribute, Schema};
/// use serde_json::json;
///
/// let schema = Schema::v0()
///     .with_attribute("location", Attribute::required_string().with_force_new())
///     .with_attribute("id", Attribute::computed_string());
///
/// let result = plan(
///     &schema,
///     &json!({"location": "westus", "id": "x"}),
///     &json!({"location": "eastus"}),
/// );
/// assert!(result.requires_replace);
/// assert!(result.planned_state.get("id").is_none());
/// ```
pub fn plan(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let empty = Map::new();
    let prior_obj = prior.as_object().unwrap_or(&empty);

    let Some(proposed_obj) = proposed.as_object() else {
        let changes = sorted_keys(prior_obj)
            .into_iter()
            .filter_map(|name| {
                non_null(prior_obj.get(name)).map(|v| AttributeChange::removed(name, v.clone()))
            })
            .collect();
        return PlanResult::with_changes(Value::Null, changes, false);
    };

    let mut planned = proposed_obj.clone();
    canonicalize(&schema.block, &mut planned);
    let mut canonical_prior = prior_obj.clone();
    canonicalize(&schema.block, &mut canonical_prior);

    let is_create = prior.is_null();
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for name in field_names(schema) {
        if is_computed(schema, name) && non_null(planned.get(name)).is_none() {
            continue;
        }
        let before = non_null(canonical_prior.get(name));
        let after = non_null(planned.get(name));
        if values_equal(schema, name, before, after) {
            continue;
        }
        if !is_create && is_force_new(schema, name) {
            requires_replace = true;
        }
        changes.push(AttributeChange::new(
            name,
            non_null(prior_obj.get(name)).cloned(),
            after.cloned(),
        ));
    }

    if !is_create && !requires_replace {
        for name in field_names(schema) {
            if is_computed(schema, name) && non_null(planned.get(name)).is_none() {
                if let Some(value) = non_null(prior_obj.get(name)) {
                    planned.insert(name.to_string(), value.clone());
                }
            }
        }
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

/// Fill defaults and rewrite normalized strings into their canonical form,
/// descending into nested block items.
fn canonicalize(block: &Block, object: &mut Map<String, Value>) {
    for (name, attr) in &block.attributes {
        if let Some(default) = &attr.default {
            if non_null(object.get(name)).is_none() {
                object.insert(name.clone(), default.clone());
            }
        }
        let canonical = match (attr.normalization, object.get(name)) {
            (Some(normalization), Some(Value::String(value))) => Some(normalization.apply(value)),
            _ => None,
        };
        if let Some(canonical) = canonical {
            object.insert(name.clone(), Value::String(canonical));
        }
    }

    for (name, nested) in &block.blocks {
        match object.get_mut(name) {
            Some(Value::Array(items)) => {
                for item in items.iter_mut() {
                    if let Value::Object(item) = item {
                        canonicalize(&nested.block, item);
                    }
                }
            },
            Some(Value::Object(item)) if nested.nesting_mode == BlockNestingMode::Single => {
                canonicalize(&nested.block, item);
            },
            _ => {},
        }
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn sorted_keys(object: &Map<String, Value>) -> BTreeSet<&str> {
    object.keys().map(String::as_str).collect()
}

fn field_names(schema: &Schema) -> BTreeSet<&str> {
    schema
        .block
        .attributes
        .keys()
        .chain(schema.block.blocks.keys())
        .map(String::as_str)
        .collect()
}

/// Whether the provider may fill this field without it being declared.
fn is_computed(schema: &Schema, name: &str) -> bool {
    if let Some(attr) = schema.block.attributes.get(name) {
        return attr.flags.computed;
    }
    schema.block.blocks.get(name).is_some_and(|b| b.computed)
}

fn is_force_new(schema: &Schema, name: &str) -> bool {
    schema
        .block
        .attributes
        .get(name)
        .is_some_and(|attr| attr.force_new)
}

fn is_set_typed(schema: &Schema, name: &str) -> bool {
    if let Some(attr) = schema.block.attributes.get(name) {
        return matches!(attr.attr_type, AttributeType::Set(_));
    }
    schema
        .block
        .blocks
        .get(name)
        .is_some_and(|b| b.nesting_mode == BlockNestingMode::Set)
}

fn values_equal(schema: &Schema, name: &str, before: Option<&Value>, after: Option<&Value>) -> bool {
    // Unset collections are stored as empty ones.
    let before = before.map(without_empty).filter(|v| !is_empty_collection(v));
    let after = after.map(without_empty).filter(|v| !is_empty_collection(v));
    match (&before, &after) {
        (Some(Value::Array(a)), Some(Value::Array(b))) if is_set_typed(schema, name) => {
            sorted_elements(a) == sorted_elements(b)
        },
        _ => before == after,
    }
}

fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Copy of `value` with null and empty-collection fields dropped from every
/// nested object.
fn without_empty(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(without_empty).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .filter(|(_, v)| !v.is_null() && !is_empty_collection(v))
                .map(|(k, v)| (k.clone(), without_empty(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn sorted_elements(values: &[Value]) -> Vec<String> {
    let mut elements: Vec<String> = values.iter().map(Value::to_string).collect();
    elements.sort();
    elements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, NestedBlock, StateNormalization};
    use serde_json::json;

    fn gateway_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("location", Attribute::required_string().with_force_new())
            .with_attribute("scale_unit", Attribute::optional_int64())
            .with_attribute("custom_route_address_prefixes", Attribute::optional_string_set())
            .with_attribute(
                "request_message",
                Attribute::optional_string().with_default(json!("Please approve my connection.")),
            )
            .with_block(
                "vpn_client_connection_health",
                NestedBlock::computed_list(Block::new()),
            )
    }

    #[test]
    fn test_create_plan_adds_declared_attributes() {
        let result = plan(
            &gateway_schema(),
            &Value::Null,
            &json!({"name": "gw", "location": "westus"}),
        );

        assert!(!result.requires_replace);
        let paths: Vec<_> = result.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["location", "name", "request_message"]);
        assert_eq!(
            result.planned_state["request_message"],
            "Please approve my connection."
        );
    }

    #[test]
    fn test_update_carries_computed_values() {
        let prior = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/p2sVpnGateways/gw",
            "name": "gw",
            "location": "westus",
            "request_message": "Please approve my connection.",
            "vpn_client_connection_health": [{"vpn_client_connections_count": 0}],
        });
        let result = plan(
            &gateway_schema(),
            &prior,
            &json!({"name": "gw", "location": "westus", "scale_unit": 1}),
        );

        assert!(!result.requires_replace);
        assert_eq!(result.changes, vec![AttributeChange::added("scale_unit", json!(1))]);
        assert_eq!(result.planned_state["id"], prior["id"]);
        assert_eq!(
            result.planned_state["vpn_client_connection_health"],
            prior["vpn_client_connection_health"]
        );
    }

    #[test]
    fn test_force_new_change_requires_replace() {
        let prior = json!({"id": "x", "name": "gw", "location": "westus"});
        let result = plan(
            &gateway_schema(),
            &prior,
            &json!({"name": "gw", "location": "eastus"}),
        );

        assert!(result.requires_replace);
        assert!(result.planned_state.get("id").is_none());
    }

    #[test]
    fn test_sets_compare_unordered() {
        let prior = json!({
            "name": "gw",
            "location": "westus",
            "request_message": "Please approve my connection.",
            "custom_route_address_prefixes": ["10.0.0.0/8", "101.168.0.6/32"],
        });
        let proposed = json!({
            "name": "gw",
            "location": "westus",
            "custom_route_address_prefixes": ["101.168.0.6/32", "10.0.0.0/8"],
        });
        let result = plan(&gateway_schema(), &prior, &proposed);
        assert!(!result.has_changes());
    }

    #[test]
    fn test_destroy_plan_removes_everything() {
        let prior = json!({"id": "x", "name": "gw", "tags": null});
        let result = plan(&gateway_schema(), &prior, &Value::Null);

        assert!(result.planned_state.is_null());
        assert_eq!(
            result.changes,
            vec![
                AttributeChange::removed("id", json!("x")),
                AttributeChange::removed("name", json!("gw")),
            ]
        );
    }

    fn endpoint_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "location",
                Attribute::required_string()
                    .with_force_new()
                    .with_normalization(StateNormalization::Location),
            )
            .with_attribute(
                "tags",
                Attribute::new(
                    AttributeType::map(AttributeType::String),
                    crate::schema::AttributeFlags::optional(),
                ),
            )
            .with_block(
                "connections",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_attribute("group_ids", Attribute::optional_string_list())
                        .with_attribute(
                            "request_message",
                            Attribute::optional_string()
                                .with_default(json!("Please approve my connection.")),
                        ),
                ),
            )
    }

    #[test]
    fn test_location_is_compared_in_canonical_form() {
        let prior = json!({"id": "x", "location": "westeurope"});
        let result = plan(&endpoint_schema(), &prior, &json!({"location": "West Europe"}));

        assert!(!result.requires_replace);
        assert!(!result.has_changes(), "{:?}", result.changes);
        assert_eq!(result.planned_state["location"], "westeurope");
        assert_eq!(result.planned_state["id"], "x");

        let result = plan(&endpoint_schema(), &prior, &json!({"location": "North Europe"}));
        assert!(result.requires_replace);
    }

    #[test]
    fn test_unset_collections_equal_empty_ones() {
        let prior = json!({
            "id": "x",
            "location": "westeurope",
            "tags": {},
            "connections": [],
        });
        let result = plan(
            &endpoint_schema(),
            &prior,
            &json!({"location": "westeurope", "tags": null}),
        );
        assert!(!result.has_changes(), "{:?}", result.changes);

        let result = plan(
            &endpoint_schema(),
            &prior,
            &json!({"location": "westeurope", "tags": {"env": "test"}}),
        );
        assert_eq!(
            result.changes,
            vec![AttributeChange::new("tags", Some(json!({})), Some(json!({"env": "test"})))]
        );
    }

    #[test]
    fn test_nested_items_get_defaults_before_comparison() {
        let prior = json!({
            "id": "x",
            "location": "westeurope",
            "connections": [
                {"name": "c", "group_ids": [], "request_message": "Please approve my connection."}
            ],
        });
        let proposed = json!({
            "location": "westeurope",
            "connections": [{"name": "c"}],
        });
        let result = plan(&endpoint_schema(), &prior, &proposed);

        assert!(!result.has_changes(), "{:?}", result.changes);
        assert_eq!(
            result.planned_state["connections"][0]["request_message"],
            "Please approve my connection."
        );
    }
}
