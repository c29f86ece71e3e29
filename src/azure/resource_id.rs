//! Parsing of ARM resource identifiers.

use std::collections::HashMap;

use crate::error::ProviderError;

/// A parsed `/subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}` path.
///
/// Segments after the provider namespace are stored as a type → name map,
/// so nested types (`virtualWans/wan/p2sVpnServerConfigurations/cfg`) can be
/// looked up by their type segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: String,
    pub path: HashMap<String, String>,
    /// The last type segment, e.g. `privateEndpoints`.
    pub resource_type: Option<String>,
}

impl ResourceId {
    /// Parse an ARM resource ID.
    ///
    /// # Examples
    ///
    /// ```
    /// use azurerm_provider::azure::ResourceId;
    ///
    /// let id = ResourceId::parse(
    ///     "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.Network/privateEndpoints/pe",
    /// ).unwrap();
    /// assert_eq!(id.resource_group, "rg");
    /// assert_eq!(id.name("privateEndpoints").unwrap(), "pe");
    /// ```
    pub fn parse(id: &str) -> Result<Self, ProviderError> {
        let invalid = |reason: &str| ProviderError::InvalidResourceId(format!("{:?}: {}", id, reason));

        let trimmed = id.trim_matches('/');
        if trimmed.is_empty() {
            return Err(invalid("cannot parse an empty ID"));
        }

        let components: Vec<&str> = trimmed.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(invalid("the number of path segments is not divisible by 2"));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = HashMap::new();
        let mut resource_type = None;

        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(invalid("key/value cannot be empty strings"));
            }
            if subscription_id.is_none() {
                if !key.eq_ignore_ascii_case("subscriptions") {
                    return Err(invalid("no subscription ID found"));
                }
                subscription_id = Some(value.to_string());
                continue;
            }
            if resource_group.is_none() && key.eq_ignore_ascii_case("resourceGroups") {
                resource_group = Some(value.to_string());
                continue;
            }
            if provider.is_none() && key.eq_ignore_ascii_case("providers") {
                provider = Some(value.to_string());
                continue;
            }
            path.insert(key.to_string(), value.to_string());
            resource_type = Some(key.to_string());
        }

        Ok(Self {
            subscription_id: subscription_id.unwrap_or_default(),
            resource_group: resource_group.ok_or_else(|| invalid("no resource group name found"))?,
            provider: provider.unwrap_or_default(),
            path,
            resource_type,
        })
    }

    /// The name stored under `key`, e.g. `name("p2sVpnGateways")`.
    pub fn name(&self, key: &str) -> Result<&str, ProviderError> {
        self.path.get(key).map(String::as_str).ok_or_else(|| {
            ProviderError::InvalidResourceId(format!(
                "expected a {:?} segment in the ID of resource group {:?}",
                key, self.resource_group
            ))
        })
    }

    /// Build the ID of a resource directly under a provider namespace.
    pub fn format(
        subscription_id: &str,
        resource_group: &str,
        provider: &str,
        resource_type: &str,
        name: &str,
    ) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            subscription_id, resource_group, provider, resource_type, name
        )
    }
}

/// Whether `value` parses as a resource-group-scoped ARM ID.
pub fn is_resource_id(value: &str) -> bool {
    ResourceId::parse(value).is_ok()
}
