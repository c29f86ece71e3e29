//! Resource and data source handlers, one module per resource family.
//!
//! Each handler takes the [`Clients`](crate::client::Clients) bundle and an
//! [`OperationContext`](crate::context::OperationContext) explicitly; there
//! is no global client state. Declared configuration is decoded once into a
//! typed struct by [`decode`] and only typed fields are touched afterwards.

pub mod app_insights;
pub mod automation;
pub mod lifecycle;
pub mod network;
pub mod resources;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::azure::ResourceId;
use crate::error::ProviderError;

/// Decode declared configuration (or stored state) into a typed struct.
pub fn decode<T: DeserializeOwned>(type_name: &str, value: Value) -> Result<T, ProviderError> {
    serde_json::from_value(value)
        .map_err(|e| ProviderError::Validation(format!("invalid {} configuration: {}", type_name, e)))
}

/// Encode a result record for the host.
pub fn encode<T: serde::Serialize>(state: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(state)?)
}

/// Treat an explicit JSON `null` like an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The stored identifier of a managed resource.
#[derive(Debug, Deserialize)]
pub struct StoredId {
    #[serde(default)]
    pub id: Option<String>,
}

impl StoredId {
    /// Resource group and name of a stored ID whose last type segment is
    /// `resource_type`.
    pub fn parse(state: Value, resource_type: &str) -> Result<(String, String), ProviderError> {
        let stored: StoredId = decode(resource_type, state)?;
        let id = stored
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::InvalidResourceId("state has no id".to_string()))?;
        resource_coordinates(&id, resource_type)
    }
}

/// Resource group and name of `id`, whose last type segment must be
/// `resource_type`.
pub fn resource_coordinates(id: &str, resource_type: &str) -> Result<(String, String), ProviderError> {
    let parsed = ResourceId::parse(id)?;
    if parsed.resource_type.as_deref() != Some(resource_type) {
        return Err(ProviderError::InvalidResourceId(format!(
            "{:?}: expected an ID of type {:?}, got {:?}",
            id,
            resource_type,
            parsed.resource_type.as_deref().unwrap_or_default()
        )));
    }
    let name = parsed.name(resource_type)?.to_string();
    Ok((parsed.resource_group, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default, deserialize_with = "null_as_default")]
        prefixes: Vec<String>,
    }

    #[test]
    fn test_decode_treats_null_as_empty() {
        let sample: Sample = decode("sample", json!({"name": "a", "prefixes": null})).unwrap();
        assert!(sample.prefixes.is_empty());
        let sample: Sample = decode("sample", json!({"name": "a"})).unwrap();
        assert!(sample.prefixes.is_empty());
        assert_eq!(sample.name, "a");
    }

    #[test]
    fn test_decode_error_is_validation() {
        let err = decode::<Sample>("sample", json!({"prefixes": []})).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[test]
    fn test_stored_id() {
        let (rg, name) = StoredId::parse(
            json!({"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/privateEndpoints/pe"}),
            "privateEndpoints",
        )
        .unwrap();
        assert_eq!((rg.as_str(), name.as_str()), ("rg", "pe"));

        assert!(StoredId::parse(json!({}), "privateEndpoints").is_err());
        assert!(StoredId::parse(
            json!({"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/p2sVpnGateways/gw"}),
            "privateEndpoints",
        )
        .is_err());
    }

    #[test]
    fn test_resource_coordinates_require_last_type_segment() {
        let endpoint = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/privateEndpoints/pe";
        assert_eq!(
            resource_coordinates(endpoint, "privateEndpoints").unwrap(),
            ("rg".to_string(), "pe".to_string())
        );

        let child = format!("{}/privateDnsZoneGroups/zg", endpoint);
        let err = resource_coordinates(&child, "privateEndpoints").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResourceId(ref m) if m.contains("privateDnsZoneGroups")));

        let group = "/subscriptions/s/resourceGroups/rg";
        assert!(resource_coordinates(group, "privateEndpoints").is_err());
    }
}
