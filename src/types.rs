//! Plain-Rust counterparts of the protocol messages handlers return.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change to a single top-level attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The attribute name.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<Value>,
    /// The value after the change (None if deleting).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// A change for a newly set attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// A change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// A change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

fn encode_optional(value: Option<Value>) -> Vec<u8> {
    // A Value always serializes.
    value
        .map(|v| serde_json::to_vec(&v).unwrap_or_default())
        .unwrap_or_default()
}

fn decode_optional(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(bytes).ok()
    }
}

impl From<crate::generated::AttributeChange> for AttributeChange {
    fn from(proto: crate::generated::AttributeChange) -> Self {
        Self {
            before: decode_optional(&proto.before),
            after: decode_optional(&proto.after),
            path: proto.path,
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: encode_optional(change.before),
            after: encode_optional(change.after),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The state the host should expect after apply.
    pub planned_state: Value,
    /// Attribute-level changes.
    pub changes: Vec<AttributeChange>,
    /// Whether applying requires destroying and recreating the resource.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// A plan with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether the plan changes anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// A resource brought under management by ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The host resource type, e.g. `azurerm_private_endpoint`.
    pub resource_type: String,
    /// The state read from the remote API.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider plans destroy operations.
    pub plan_destroy: bool,
}

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix written to stdout on start.
pub const HANDSHAKE_PREFIX: &str = "IAC_PROVIDER";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("scale_unit", json!(1));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!(1)));

        let removed = AttributeChange::removed("tags", json!({"env": "test"}));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("scale_unit", json!(1), json!(2));
        assert_eq!(modified.before, Some(json!(1)));
        assert_eq!(modified.after, Some(json!(2)));
    }

    #[test]
    fn test_attribute_change_proto_conversion() {
        let change = AttributeChange::added("custom_route_address_prefixes", json!(["101.168.0.6/32"]));

        let proto: crate::generated::AttributeChange = change.clone().into();
        assert_eq!(proto.path, "custom_route_address_prefixes");
        assert!(proto.before.is_empty());

        let back: AttributeChange = proto.into();
        assert_eq!(back, change);
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": "x"}));
        assert!(!no_change.has_changes());
        assert!(!no_change.requires_replace);

        let replace = PlanResult::with_changes(
            json!({"location": "westus"}),
            vec![AttributeChange::modified("location", json!("eastus"), json!("westus"))],
            true,
        );
        assert!(replace.has_changes());
        assert!(replace.requires_replace);
    }

    #[test]
    fn test_imported_resource_and_handshake() {
        let imported = ImportedResource::new("azurerm_private_endpoint", json!({"id": "pe"}));
        assert_eq!(imported.resource_type, "azurerm_private_endpoint");
        assert_eq!(imported.state["id"], "pe");
        assert_eq!(HANDSHAKE_PREFIX, "IAC_PROVIDER");
        assert_eq!(PROTOCOL_VERSION, 1);
    }
}
