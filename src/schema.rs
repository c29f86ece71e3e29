//! Schema types for describing resources and data sources.
//!
//! A schema is the contract with the host's diff engine: it lists every
//! attribute, whether the user sets it (required/optional) or the provider
//! fills it in (computed), and which changes force replacement.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A 64-bit floating point number.
    Float64,
    /// A boolean value.
    Bool,
    /// A list of values of a single type.
    List(Box<AttributeType>),
    /// A set of unique values of a single type.
    Set(Box<AttributeType>),
    /// A map from string keys to values of a single type.
    Map(Box<AttributeType>),
    /// An object with a fixed set of attributes.
    Object(HashMap<String, AttributeType>),
    /// A dynamic type that can hold any value.
    Dynamic,
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create a set type.
    pub fn set(element_type: AttributeType) -> Self {
        Self::Set(Box::new(element_type))
    }

    /// Create a map type.
    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }

    /// Create an object type.
    pub fn object(attributes: HashMap<String, AttributeType>) -> Self {
        Self::Object(attributes)
    }
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider (read-only).
    pub computed: bool,
    /// The attribute is sensitive and should be hidden in logs/UI.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Flags for a computed attribute.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Flags for an attribute the user may set and the provider defaults.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    /// Mark the attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Extra checks applied to string values (and string list elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringValidation {
    /// The string must not be empty.
    NotEmpty,
    /// The string must parse as an ARM resource ID.
    ResourceId,
}

/// Canonical form a string attribute is compared and stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateNormalization {
    /// Azure location: lower case, no spaces.
    Location,
}

impl StateNormalization {
    /// Canonical form of `value`.
    pub fn apply(self, value: &str) -> String {
        match self {
            Self::Location => crate::azure::normalize_location(value),
        }
    }
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Flags describing how the attribute can be used.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description of the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// If set, changing this attribute forces resource replacement.
    #[serde(default)]
    pub force_new: bool,
    /// Default value for the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Sibling attributes that may not be set together with this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts_with: Vec<String>,
    /// String check applied on validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<StringValidation>,
    /// Canonicalization applied before values are diffed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalization: Option<StateNormalization>,
}

impl Attribute {
    /// Create a new attribute with the given type and flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
            conflicts_with: Vec::new(),
            validation: None,
            normalization: None,
        }
    }

    /// A required string attribute.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// An optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// A computed string attribute.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// An optional int64 attribute.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// A computed int64 attribute.
    pub fn computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::computed())
    }

    /// A computed bool attribute.
    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::computed())
    }

    /// An optional set of strings.
    pub fn optional_string_set() -> Self {
        Self::new(
            AttributeType::set(AttributeType::String),
            AttributeFlags::optional(),
        )
    }

    /// An optional list of strings.
    pub fn optional_string_list() -> Self {
        Self::new(
            AttributeType::list(AttributeType::String),
            AttributeFlags::optional(),
        )
    }

    /// A computed list of strings.
    pub fn computed_string_list() -> Self {
        Self::new(
            AttributeType::list(AttributeType::String),
            AttributeFlags::computed(),
        )
    }

    /// Set the description for this attribute.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this attribute as forcing resource replacement when changed.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Set a default value for this attribute.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Forbid setting this attribute together with `other`.
    pub fn conflicts_with(mut self, other: impl Into<String>) -> Self {
        self.conflicts_with.push(other.into());
        self
    }

    /// Apply a string check to this attribute.
    pub fn with_validation(mut self, validation: StringValidation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Compare and plan this attribute in its canonical form.
    pub fn with_normalization(mut self, normalization: StateNormalization) -> Self {
        self.normalization = Some(normalization);
        self
    }

    /// Mark this attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Whether only the provider sets this attribute.
    pub fn is_computed_only(&self) -> bool {
        self.flags.computed && !self.flags.optional && !self.flags.required
    }
}

/// The nesting mode for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// A single nested block (at most one).
    #[default]
    Single,
    /// A list of nested blocks (zero or more, ordered).
    List,
    /// A set of nested blocks (zero or more, unordered, unique).
    Set,
    /// A map of nested blocks keyed by string.
    Map,
}

/// A group of attributes and nested blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// The attributes within this block.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Attribute>,
    /// Nested blocks within this block.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub blocks: HashMap<String, NestedBlock>,
    /// Human-readable description of the block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// Create a new empty block.
    pub fn new() -> Self {
        Self {
            attributes: HashMap::new(),
            blocks: HashMap::new(),
            description: None,
        }
    }

    /// Add an attribute to this block.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block to this block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Set the description for this block.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

/// A nested block with its nesting mode and item-count constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// The block definition.
    #[serde(flatten)]
    pub block: Block,
    /// How the block is nested.
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    /// Minimum number of blocks when the block is present.
    #[serde(default)]
    pub min_items: u32,
    /// Maximum number of blocks allowed (0 = unlimited).
    #[serde(default)]
    pub max_items: u32,
    /// Whether only the provider sets this block.
    #[serde(default)]
    pub computed: bool,
}

impl NestedBlock {
    /// A single nested block (0 or 1 allowed).
    pub fn single(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::Single,
            min_items: 0,
            max_items: 1,
            computed: false,
        }
    }

    /// A list of nested blocks.
    pub fn list(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::List,
            min_items: 0,
            max_items: 0,
            computed: false,
        }
    }

    /// A list of nested blocks filled in by the provider.
    pub fn computed_list(block: Block) -> Self {
        Self {
            computed: true,
            ..Self::list(block)
        }
    }

    /// Set the minimum number of blocks required.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Set the maximum number of blocks allowed.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }
}

/// Schema for a resource or data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The version of this schema.
    #[serde(default)]
    pub version: u64,
    /// The root block containing all attributes and nested blocks.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// Create a new schema with the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block to the schema.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }

    /// Set the description of the schema.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Schemas for the provider block, every resource, and every data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Schema for provider configuration.
    #[serde(default)]
    pub provider: Schema,
    /// Schemas for each resource type.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
    /// Schemas for each data source type.
    #[serde(default)]
    pub data_sources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// Create a new empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Add a data source schema.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation.
    Warning,
}

/// A diagnostic message reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_flags() {
        let required = AttributeFlags::required();
        assert!(required.required);
        assert!(!required.optional);
        assert!(!required.computed);

        let optional_computed = AttributeFlags::optional_computed();
        assert!(optional_computed.optional);
        assert!(optional_computed.computed);

        assert!(AttributeFlags::required().sensitive().sensitive);
    }

    #[test]
    fn test_attribute_builders() {
        let attr = Attribute::required_string()
            .with_description("The ID of the Virtual Hub")
            .with_force_new()
            .with_validation(StringValidation::ResourceId)
            .conflicts_with("other");

        assert_eq!(attr.attr_type, AttributeType::String);
        assert!(attr.flags.required);
        assert!(attr.force_new);
        assert_eq!(attr.validation, Some(StringValidation::ResourceId));
        assert_eq!(attr.conflicts_with, vec!["other".to_string()]);
        assert!(!attr.is_computed_only());
        assert!(Attribute::computed_string().is_computed_only());
        assert!(!Attribute::new(AttributeType::String, AttributeFlags::optional_computed())
            .is_computed_only());
    }

    #[test]
    fn test_schema_builder() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("id", Attribute::computed_string())
            .with_block(
                "private_link_service_connections",
                NestedBlock::list(Block::new().with_attribute("name", Attribute::required_string()))
                    .with_min_items(1),
            );

        assert_eq!(schema.version, 0);
        assert!(schema.block.attributes.contains_key("name"));
        let block = &schema.block.blocks["private_link_service_connections"];
        assert_eq!(block.nesting_mode, BlockNestingMode::List);
        assert_eq!(block.min_items, 1);
        assert!(!block.computed);
        assert!(NestedBlock::computed_list(Block::new()).computed);
    }

    #[test]
    fn test_attribute_serializes_validation() {
        let attr = Attribute::required_string().with_validation(StringValidation::NotEmpty);
        let json = serde_json::to_value(&attr).unwrap();
        assert_eq!(json["validation"], "not_empty");
        assert_eq!(json["required"], true);
        assert!(json.get("conflicts_with").is_none());
    }

    #[test]
    fn test_diagnostic() {
        let err = Diagnostic::error("Invalid configuration")
            .with_detail("The value must not be empty")
            .with_attribute("name");

        assert!(err.is_error());
        assert_eq!(err.detail, Some("The value must not be empty".to_string()));
        assert_eq!(err.attribute, Some("name".to_string()));
        assert!(!Diagnostic::warning("w").is_error());
    }
}
