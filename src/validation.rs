//! Validation of declared configuration against a [`Schema`].
//!
//! Runs before any remote call, so malformed IDs and empty names are reported
//! to the user as diagnostics instead of surfacing as ARM 400s.
//!
//! # Example
//!
//! ```
//! use azurerm_provider::schema::{Attribute, Schema, StringValidation};
//! use azurerm_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute(
//!         "subnet_id",
//!         Attribute::optional_string().with_validation(StringValidation::ResourceId),
//!     );
//!
//! assert!(validate(&schema, &json!({"name": "pe"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "pe", "subnet_id": "subnet"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("subnet_id".to_string()));
//! ```

use crate::azure::is_resource_id;
use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema,
    StringValidation,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per problem found; an empty list means the value is
/// valid. Computed-only attributes and blocks are skipped.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Like [`validate`], but as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.iter().any(Diagnostic::is_error) {
        Err(diagnostics)
    } else {
        Ok(())
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    let mut conflicts = BTreeSet::new();
    for (name, attr) in &block.attributes {
        if !is_set(obj.get(name)) {
            continue;
        }
        for other in attr.conflicts_with.iter().filter(|o| is_set(obj.get(*o))) {
            // Each pair once, whichever side declares it.
            conflicts.insert(if name.as_str() < other.as_str() {
                (name.as_str(), other.as_str())
            } else {
                (other.as_str(), name.as_str())
            });
        }
    }
    for (first, second) in conflicts {
        diagnostics.push(
            Diagnostic::error(format!(
                "Conflicting attributes '{}' and '{}'",
                join_path(path, first),
                join_path(path, second)
            ))
            .with_detail("Only one of these attributes may be set")
            .with_attribute(join_path(path, first)),
        );
    }

    for (name, nested) in &block.blocks {
        if nested.computed {
            continue;
        }
        let block_path = join_path(path, name);
        validate_nested_block(nested, obj.get(name), &block_path, diagnostics);
    }
}

fn is_set(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before {
                if let Some(check) = attr.validation {
                    validate_strings(check, v, path, diagnostics);
                }
            }
        },
    }
}

/// Apply a string check to a string value, or to each element of a list/set.
fn validate_strings(
    check: StringValidation,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        Value::String(s) => {
            if let Some(diagnostic) = check_string(check, s, path) {
                diagnostics.push(diagnostic);
            }
        },
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                validate_strings(check, item, &format!("{}.{}", path, i), diagnostics);
            }
        },
        _ => {},
    }
}

fn check_string(check: StringValidation, value: &str, path: &str) -> Option<Diagnostic> {
    match check {
        StringValidation::NotEmpty if value.trim().is_empty() => Some(
            Diagnostic::error(format!("Attribute '{}' must not be empty", path))
                .with_attribute(path),
        ),
        StringValidation::ResourceId if !is_resource_id(value) => Some(
            Diagnostic::error(format!("Attribute '{}' is not a valid Azure resource ID", path))
                .with_detail(format!(
                    "Expected /subscriptions/{{id}}/resourceGroups/{{name}}/providers/..., got {:?}",
                    value
                ))
                .with_attribute(path),
        ),
        _ => None,
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                let expected = if matches!(attr_type, AttributeType::Set(_)) {
                    "set"
                } else {
                    "list"
                };
                diagnostics.push(type_error(path, expected, value));
            }
        },
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        },
        AttributeType::Object(attrs) => {
            if let Some(obj) = value.as_object() {
                validate_object_type(attrs, obj, path, diagnostics);
            } else {
                diagnostics.push(type_error(path, "object", value));
            }
        },
        AttributeType::Dynamic => {},
    }
}

fn validate_object_type(
    attrs: &HashMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr_type) in attrs {
        if let Some(value) = obj.get(name) {
            validate_attribute_type(attr_type, value, &join_path(path, name), diagnostics);
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (nested.nesting_mode, value) {
        (_, None | Some(Value::Null)) => {
            // Absent blocks are fine; min_items only binds a block that is written.
            if nested.nesting_mode == BlockNestingMode::Single && nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{}'", path))
                        .with_detail("At least one block is required")
                        .with_attribute(path),
                );
            }
        },
        (BlockNestingMode::Single, Some(v)) => {
            validate_block(&nested.block, v, path, diagnostics);
        },
        (BlockNestingMode::List | BlockNestingMode::Set, Some(Value::Array(arr))) => {
            check_item_count(nested, arr.len(), path, diagnostics);
            for (i, item) in arr.iter().enumerate() {
                validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
            }
        },
        (BlockNestingMode::Map, Some(Value::Object(obj))) => {
            check_item_count(nested, obj.len(), path, diagnostics);
            for (key, item) in obj {
                validate_block(&nested.block, item, &format!("{}.{}", path, key), diagnostics);
            }
        },
        (mode, Some(v)) => {
            let expected = if mode == BlockNestingMode::Map { "map" } else { "list" };
            diagnostics.push(
                Diagnostic::error(format!("Expected {} for block '{}'", expected, path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        },
    }
}

fn check_item_count(
    nested: &NestedBlock,
    len: usize,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let len = len as u32;
    if len < nested.min_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    // max_items of 0 means unlimited
    if nested.max_items > 0 && len > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, len
            ))
            .with_attribute(path),
        );
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.as_i64().is_some()
                || n
                    .as_f64()
                    .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeFlags, Block, NestedBlock, Schema};
    use serde_json::json;

    const SUBNET_ID: &str = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/default";

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "test"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        assert_eq!(validate(&schema, &json!({"name": null})).len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_int64() {
        let schema = Schema::v0().with_attribute("scale_unit", Attribute::optional_int64());

        assert!(validate(&schema, &json!({"scale_unit": 1})).is_empty());
        assert!(validate(&schema, &json!({"scale_unit": 2.0})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert_eq!(validate(&schema, &json!({"scale_unit": 1.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"scale_unit": "1"})).len(), 1);
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_not_empty() {
        let schema = Schema::v0().with_attribute(
            "name",
            Attribute::required_string().with_validation(StringValidation::NotEmpty),
        );

        assert!(validate(&schema, &json!({"name": "gw"})).is_empty());

        let diagnostics = validate(&schema, &json!({"name": "  "}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("must not be empty"));
    }

    #[test]
    fn test_validate_resource_id() {
        let schema = Schema::v0()
            .with_attribute(
                "subnet_id",
                Attribute::optional_string().with_validation(StringValidation::ResourceId),
            )
            .with_attribute(
                "ids",
                Attribute::optional_string_list().with_validation(StringValidation::ResourceId),
            );

        assert!(validate(&schema, &json!({"subnet_id": SUBNET_ID, "ids": [SUBNET_ID]})).is_empty());

        let diagnostics = validate(&schema, &json!({"subnet_id": "default"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("not a valid Azure resource ID"));

        let diagnostics = validate(&schema, &json!({"ids": [SUBNET_ID, "nope"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("ids.1".to_string()));
    }

    #[test]
    fn test_type_error_suppresses_string_check() {
        let schema = Schema::v0().with_attribute(
            "subnet_id",
            Attribute::optional_string().with_validation(StringValidation::ResourceId),
        );
        let diagnostics = validate(&schema, &json!({"subnet_id": 7}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_conflicts_with() {
        let schema = Schema::v0()
            .with_attribute("a", Attribute::optional_string().conflicts_with("b"))
            .with_attribute("b", Attribute::optional_string().conflicts_with("a"));

        assert!(validate(&schema, &json!({"a": "x"})).is_empty());
        assert!(validate(&schema, &json!({"a": "x", "b": null})).is_empty());

        let diagnostics = validate(&schema, &json!({"a": "x", "b": "y"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Conflicting"));
    }

    #[test]
    fn test_validate_set_and_map() {
        let schema = Schema::v0()
            .with_attribute("prefixes", Attribute::optional_string_set())
            .with_attribute(
                "tags",
                Attribute::new(AttributeType::map(AttributeType::String), AttributeFlags::optional()),
            );

        assert!(validate(&schema, &json!({"prefixes": ["10.0.0.0/16"], "tags": {"env": "test"}})).is_empty());

        let diagnostics = validate(&schema, &json!({"prefixes": "10.0.0.0/16"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].detail.as_deref().unwrap().contains("Expected set"));

        let diagnostics = validate(&schema, &json!({"tags": {"env": 1}}));
        assert_eq!(diagnostics[0].attribute, Some("tags.env".to_string()));
    }

    #[test]
    fn test_validate_nested_block_list() {
        let schema = Schema::v0().with_block(
            "private_link_service_connections",
            NestedBlock::list(
                Block::new()
                    .with_attribute("name", Attribute::required_string())
                    .with_attribute("group_ids", Attribute::optional_string_list()),
            )
            .with_min_items(1)
            .with_max_items(2),
        );

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"private_link_service_connections": [{"name": "c"}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"private_link_service_connections": []}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(
            &schema,
            &json!({"private_link_service_connections": [{"name": "a"}, {"name": "b"}, {"name": "c"}]}),
        );
        assert!(diagnostics[0].summary.contains("at most 2"));

        let diagnostics = validate(&schema, &json!({"private_link_service_connections": [{}]}));
        assert_eq!(
            diagnostics[0].attribute,
            Some("private_link_service_connections.0.name".to_string())
        );

        let diagnostics = validate(&schema, &json!({"private_link_service_connections": {"name": "c"}}));
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_computed_block_skipped() {
        let schema = Schema::v0().with_block(
            "vpn_client_connection_health",
            NestedBlock::computed_list(Block::new().with_attribute("count", Attribute::required_string()))
                .with_min_items(1),
        );
        assert!(validate(&schema, &json!({"vpn_client_connection_health": [{}]})).is_empty());
    }

    #[test]
    fn test_validate_single_block_and_object_type() {
        let mut object_attrs = HashMap::new();
        object_attrs.insert("port".to_string(), AttributeType::Int64);

        let schema = Schema::v0()
            .with_block(
                "features",
                NestedBlock::single(Block::new().with_attribute(
                    "strict",
                    Attribute::new(AttributeType::Bool, AttributeFlags::optional()),
                ))
                .with_min_items(1),
            )
            .with_attribute(
                "endpoint",
                Attribute::new(AttributeType::Object(object_attrs), AttributeFlags::optional()),
            );

        assert!(validate(&schema, &json!({"features": {"strict": true}})).is_empty());
        assert!(validate(&schema, &json!({}))[0].summary.contains("Missing required block"));

        let diagnostics = validate(&schema, &json!({"features": {}, "endpoint": {"port": "x"}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("endpoint.port".to_string()));
    }

    #[test]
    fn test_validate_helpers_and_root() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(is_valid(&schema, &json!({"name": "test"})));
        assert!(!is_valid(&schema, &json!({})));
        assert!(validate_result(&schema, &json!({"name": "test"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
        assert!(diagnostics[0].attribute.is_none());
    }
}
