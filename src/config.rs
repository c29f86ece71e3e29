//! Provider configuration.
//!
//! The host sends the provider block as JSON in `Configure`. Unset values
//! fall back to the usual `ARM_*` environment variables:
//!
//! - `ARM_SUBSCRIPTION_ID` - subscription to manage (required)
//! - `ARM_TENANT_ID` - tenant of the subscription
//! - `ARM_ACCESS_TOKEN` - bearer token for Resource Manager (required)
//! - `ARM_ENDPOINT` - Resource Manager URL (default: `https://management.azure.com`)
//! - `ARM_PROVIDER_STRICT` - `true` to refuse creating objects that already exist

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::client::{ApiError, ArmClient, DEFAULT_ENDPOINT};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, Diagnostic, NestedBlock, Schema};

/// Default wait for create, update and delete.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
/// Default wait for reads.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Default interval between long-running-operation polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// The provider block as declared by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub access_token: Option<String>,
    pub resource_manager_endpoint: Option<String>,
    pub features: Option<FeaturesConfig>,
    pub timeouts: Option<TimeoutsConfig>,
    pub poll_interval_seconds: Option<u64>,
}

/// `features { ... }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub require_resources_to_be_imported: Option<bool>,
}

/// `timeouts { ... }`, in minutes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub create_minutes: Option<u64>,
    pub read_minutes: Option<u64>,
    pub update_minutes: Option<u64>,
    pub delete_minutes: Option<u64>,
}

/// Behaviour switches shared by every resource handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    /// Fail a create when an object with the same name already exists.
    pub require_resources_to_be_imported: bool,
}

/// How long each kind of operation may take, including LRO waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_WRITE_TIMEOUT,
            read: DEFAULT_READ_TIMEOUT,
            update: DEFAULT_WRITE_TIMEOUT,
            delete: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Fully resolved provider settings.
#[derive(Clone)]
pub struct Settings {
    pub subscription_id: String,
    pub tenant_id: Option<String>,
    pub access_token: String,
    pub endpoint: String,
    pub features: Features,
    pub timeouts: Timeouts,
    pub poll_interval: Duration,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("access_token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("features", &self.features)
            .field("timeouts", &self.timeouts)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl Settings {
    /// Settings for tests and embedding, with default timeouts and features.
    pub fn new(subscription_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            tenant_id: None,
            access_token: access_token.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            features: Features::default(),
            timeouts: Timeouts::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Enable or disable the already-exists pre-check.
    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// Override operation timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// An ARM client for these settings.
    pub fn arm_client(&self) -> Result<ArmClient, ApiError> {
        Ok(ArmClient::new(&self.endpoint, &self.subscription_id, &self.access_token)?
            .with_poll_interval(self.poll_interval))
    }
}

impl ProviderConfig {
    /// Decode the provider block. Null means an empty block.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
            .map_err(|e| ProviderError::Configuration(format!("invalid provider configuration: {}", e)))
    }

    /// Resolve against the process environment.
    pub fn resolve(self) -> Result<Settings, Vec<Diagnostic>> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    ///
    /// Returns error diagnostics when the subscription or the token is
    /// missing, or a timeout is zero.
    pub fn resolve_with(self, env: impl Fn(&str) -> Option<String>) -> Result<Settings, Vec<Diagnostic>> {
        let pick = |declared: Option<String>, key: &str| {
            declared
                .filter(|v| !v.trim().is_empty())
                .or_else(|| env(key).filter(|v| !v.trim().is_empty()))
        };

        let mut diagnostics = Vec::new();

        let subscription_id = pick(self.subscription_id, "ARM_SUBSCRIPTION_ID");
        if subscription_id.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing subscription_id")
                    .with_detail("Set subscription_id in the provider block or ARM_SUBSCRIPTION_ID")
                    .with_attribute("subscription_id"),
            );
        }

        let access_token = pick(self.access_token, "ARM_ACCESS_TOKEN");
        if access_token.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing access_token")
                    .with_detail("Set access_token in the provider block or ARM_ACCESS_TOKEN")
                    .with_attribute("access_token"),
            );
        }

        let tenant_id = pick(self.tenant_id, "ARM_TENANT_ID");
        let endpoint = pick(self.resource_manager_endpoint, "ARM_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let strict_env = env("ARM_PROVIDER_STRICT")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);
        let features = Features {
            require_resources_to_be_imported: self
                .features
                .and_then(|f| f.require_resources_to_be_imported)
                .unwrap_or(strict_env),
        };

        let declared = self.timeouts.unwrap_or_default();
        let mut minutes = |value: Option<u64>, name: &str, default: Duration| match value {
            Some(0) => {
                diagnostics.push(
                    Diagnostic::error(format!("timeouts.{} must be greater than zero", name))
                        .with_attribute(format!("timeouts.{}", name)),
                );
                default
            },
            Some(m) => Duration::from_secs(m * 60),
            None => default,
        };
        let timeouts = Timeouts {
            create: minutes(declared.create_minutes, "create_minutes", DEFAULT_WRITE_TIMEOUT),
            read: minutes(declared.read_minutes, "read_minutes", DEFAULT_READ_TIMEOUT),
            update: minutes(declared.update_minutes, "update_minutes", DEFAULT_WRITE_TIMEOUT),
            delete: minutes(declared.delete_minutes, "delete_minutes", DEFAULT_WRITE_TIMEOUT),
        };

        let poll_interval = self
            .poll_interval_seconds
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        match (subscription_id, access_token) {
            (Some(subscription_id), Some(access_token)) if diagnostics.is_empty() => Ok(Settings {
                subscription_id,
                tenant_id,
                access_token,
                endpoint,
                features,
                timeouts,
                poll_interval,
            }),
            _ => Err(diagnostics),
        }
    }
}

/// Schema of the provider block.
pub fn provider_config_schema() -> Schema {
    let minutes = || Attribute::optional_int64();
    Schema::v0()
        .with_description("Azure Resource Manager provider")
        .with_attribute(
            "subscription_id",
            Attribute::optional_string().with_description("Subscription to manage. Defaults to ARM_SUBSCRIPTION_ID."),
        )
        .with_attribute(
            "tenant_id",
            Attribute::optional_string().with_description("Tenant of the subscription. Defaults to ARM_TENANT_ID."),
        )
        .with_attribute(
            "access_token",
            Attribute::optional_string()
                .sensitive()
                .with_description("Bearer token for Resource Manager. Defaults to ARM_ACCESS_TOKEN."),
        )
        .with_attribute(
            "resource_manager_endpoint",
            Attribute::optional_string().with_default(Value::String(DEFAULT_ENDPOINT.to_string())),
        )
        .with_attribute("poll_interval_seconds", Attribute::optional_int64())
        .with_block(
            "features",
            NestedBlock::single(Block::new().with_attribute(
                "require_resources_to_be_imported",
                Attribute::new(AttributeType::Bool, AttributeFlags::optional()),
            )),
        )
        .with_block(
            "timeouts",
            NestedBlock::single(
                Block::new()
                    .with_attribute("create_minutes", minutes())
                    .with_attribute("read_minutes", minutes())
                    .with_attribute("update_minutes", minutes())
                    .with_attribute("delete_minutes", minutes()),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_declared_values_win_over_env() {
        let config = ProviderConfig::from_value(&json!({
            "subscription_id": "sub-declared",
            "access_token": "token",
        }))
        .unwrap();
        let settings = config
            .resolve_with(env_of(&[("ARM_SUBSCRIPTION_ID", "sub-env")]))
            .unwrap();

        assert_eq!(settings.subscription_id, "sub-declared");
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.timeouts, Timeouts::default());
        assert_eq!(settings.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(!settings.features.require_resources_to_be_imported);
    }

    #[test]
    fn test_env_fallbacks() {
        let settings = ProviderConfig::from_value(&Value::Null)
            .unwrap()
            .resolve_with(env_of(&[
                ("ARM_SUBSCRIPTION_ID", "sub"),
                ("ARM_ACCESS_TOKEN", "tok"),
                ("ARM_TENANT_ID", "tenant"),
                ("ARM_ENDPOINT", "http://localhost:8080"),
                ("ARM_PROVIDER_STRICT", "true"),
            ]))
            .unwrap();

        assert_eq!(settings.subscription_id, "sub");
        assert_eq!(settings.tenant_id.as_deref(), Some("tenant"));
        assert_eq!(settings.endpoint, "http://localhost:8080");
        assert!(settings.features.require_resources_to_be_imported);
    }

    #[test]
    fn test_missing_credentials_are_reported() {
        let diagnostics = ProviderConfig::default()
            .resolve_with(env_of(&[]))
            .unwrap_err();
        let attrs: Vec<_> = diagnostics.iter().filter_map(|d| d.attribute.as_deref()).collect();
        assert_eq!(attrs, vec!["subscription_id", "access_token"]);
    }

    #[test]
    fn test_timeouts_and_features_block() {
        let config = ProviderConfig::from_value(&json!({
            "subscription_id": "s",
            "access_token": "t",
            "features": {"require_resources_to_be_imported": false},
            "timeouts": {"create_minutes": 30, "read_minutes": 1},
            "poll_interval_seconds": 2,
        }))
        .unwrap();
        let settings = config
            .resolve_with(env_of(&[("ARM_PROVIDER_STRICT", "true")]))
            .unwrap();

        assert!(!settings.features.require_resources_to_be_imported);
        assert_eq!(settings.timeouts.create, Duration::from_secs(30 * 60));
        assert_eq!(settings.timeouts.read, Duration::from_secs(60));
        assert_eq!(settings.timeouts.delete, DEFAULT_WRITE_TIMEOUT);
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let diagnostics = ProviderConfig::from_value(&json!({
            "subscription_id": "s",
            "access_token": "t",
            "timeouts": {"delete_minutes": 0},
        }))
        .unwrap()
        .resolve_with(env_of(&[]))
        .unwrap_err();
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("timeouts.delete_minutes"));
    }

    #[test]
    fn test_malformed_config() {
        let err = ProviderConfig::from_value(&json!({"poll_interval_seconds": "soon"})).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_settings_debug_redacts_token() {
        let settings = Settings::new("sub", "secret-token");
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }
}
