//! [`AzureRmProvider`]: the [`ProviderService`] the binary serves.
//!
//! The provider owns the schema registry and dispatches each host call to the
//! handler of its type. Settings and the [`Clients`] bundle are written once
//! by `configure`; every operation then runs under its own
//! [`OperationContext`] whose token is a child of the provider's stop token.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::Clients;
use crate::config::{provider_config_schema, ProviderConfig, Settings};
use crate::context::OperationContext;
use crate::error::ProviderError;
use crate::plan;
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::services::automation::{self, VariableKind};
use crate::services::network::{p2s_vpn_gateway, private_endpoint};
use crate::services::{self, app_insights, decode, encode, resources, StoredId};
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Managed resource types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    P2sVpnGateway,
    PrivateEndpoint,
}

impl ResourceKind {
    fn from_type_name(type_name: &str) -> Result<Self, ProviderError> {
        match type_name {
            p2s_vpn_gateway::TYPE_NAME => Ok(Self::P2sVpnGateway),
            private_endpoint::TYPE_NAME => Ok(Self::PrivateEndpoint),
            other => Err(ProviderError::UnknownResource(format!(
                "Unknown resource type: {}",
                other
            ))),
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            Self::P2sVpnGateway => p2s_vpn_gateway::TYPE_NAME,
            Self::PrivateEndpoint => private_endpoint::TYPE_NAME,
        }
    }

    /// Path segment naming this type in resource IDs.
    fn arm_type(self) -> &'static str {
        match self {
            Self::P2sVpnGateway => p2s_vpn_gateway::arm_type(),
            Self::PrivateEndpoint => private_endpoint::arm_type(),
        }
    }
}

/// Everything `configure` produces.
#[derive(Debug, Clone)]
struct Configured {
    settings: Settings,
    clients: Clients,
}

/// Azure Resource Manager provider.
#[derive(Debug)]
pub struct AzureRmProvider {
    configured: RwLock<Option<Configured>>,
    stop: CancellationToken,
}

impl Default for AzureRmProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureRmProvider {
    /// An unconfigured provider; `configure` wires it to ARM.
    pub fn new() -> Self {
        Self {
            configured: RwLock::new(None),
            stop: CancellationToken::new(),
        }
    }

    /// A provider already configured with the given clients, skipping
    /// `configure`. Used to run handlers against an in-memory backend.
    pub fn with_clients(settings: Settings, clients: Clients) -> Self {
        Self {
            configured: RwLock::new(Some(Configured { settings, clients })),
            stop: CancellationToken::new(),
        }
    }

    async fn configured(&self) -> Result<Configured, ProviderError> {
        self.configured.read().await.clone().ok_or_else(|| {
            ProviderError::NotConfigured("configure must be called before any operation".to_string())
        })
    }

    fn context(&self, timeout: Duration) -> OperationContext {
        OperationContext::with_token(timeout, self.stop.child_token())
    }

    fn resource_schema(kind: ResourceKind) -> Schema {
        match kind {
            ResourceKind::P2sVpnGateway => p2s_vpn_gateway::resource_schema(),
            ResourceKind::PrivateEndpoint => private_endpoint::resource_schema(),
        }
    }

    fn data_source_schema(type_name: &str) -> Result<Schema, ProviderError> {
        let schema = match type_name {
            p2s_vpn_gateway::TYPE_NAME => p2s_vpn_gateway::data_source_schema(),
            private_endpoint::TYPE_NAME => private_endpoint::data_source_schema(),
            resources::RESOURCE_GROUP_TYPE_NAME => resources::resource_group_schema(),
            resources::SUBSCRIPTION_TYPE_NAME => resources::subscription_schema(),
            app_insights::TYPE_NAME => app_insights::data_source_schema(),
            other => match VariableKind::from_type_name(other) {
                Some(kind) => automation::data_source_schema(kind),
                None => {
                    return Err(ProviderError::UnknownResource(format!(
                        "Unknown data source type: {}",
                        other
                    )))
                },
            },
        };
        Ok(schema)
    }

    async fn create_or_update(
        &self,
        kind: ResourceKind,
        planned_state: Value,
        is_new: bool,
    ) -> Result<Value, ProviderError> {
        let Configured { settings, clients } = self.configured().await?;
        let timeout = if is_new {
            settings.timeouts.create
        } else {
            settings.timeouts.update
        };
        let ctx = self.context(timeout);
        let features = settings.features;

        match kind {
            ResourceKind::P2sVpnGateway => {
                let config = decode(kind.type_name(), planned_state)?;
                let state =
                    p2s_vpn_gateway::create_update(&clients, &ctx, features, &config, is_new).await?;
                encode(&state)
            },
            ResourceKind::PrivateEndpoint => {
                let config = decode(kind.type_name(), planned_state)?;
                let state =
                    private_endpoint::create_update(&clients, &ctx, features, &config, is_new).await?;
                encode(&state)
            },
        }
    }

    /// Read by coordinates; `Value::Null` when the object is gone.
    async fn read_by_coordinates(
        &self,
        kind: ResourceKind,
        resource_group: &str,
        name: &str,
    ) -> Result<Value, ProviderError> {
        let Configured { settings, clients } = self.configured().await?;
        let ctx = self.context(settings.timeouts.read);

        match kind {
            ResourceKind::P2sVpnGateway => {
                match p2s_vpn_gateway::read(&clients, &ctx, resource_group, name).await? {
                    Some(state) => encode(&state),
                    None => Ok(Value::Null),
                }
            },
            ResourceKind::PrivateEndpoint => {
                match private_endpoint::read(&clients, &ctx, resource_group, name).await? {
                    Some(state) => encode(&state),
                    None => Ok(Value::Null),
                }
            },
        }
    }
}

#[async_trait::async_trait]
impl ProviderService for AzureRmProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new()
            .with_provider_config(provider_config_schema())
            .with_resource(
                p2s_vpn_gateway::TYPE_NAME,
                p2s_vpn_gateway::resource_schema(),
            )
            .with_resource(
                private_endpoint::TYPE_NAME,
                private_endpoint::resource_schema(),
            )
            .with_data_source(
                p2s_vpn_gateway::TYPE_NAME,
                p2s_vpn_gateway::data_source_schema(),
            )
            .with_data_source(
                private_endpoint::TYPE_NAME,
                private_endpoint::data_source_schema(),
            )
            .with_data_source(
                resources::RESOURCE_GROUP_TYPE_NAME,
                resources::resource_group_schema(),
            )
            .with_data_source(
                resources::SUBSCRIPTION_TYPE_NAME,
                resources::subscription_schema(),
            )
            .with_data_source(app_insights::TYPE_NAME, app_insights::data_source_schema());
        for kind in VariableKind::ALL {
            schema = schema.with_data_source(kind.type_name(), automation::data_source_schema(kind));
        }
        schema
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validation::validate(&provider_config_schema(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let settings = match ProviderConfig::from_value(&config)?.resolve() {
            Ok(settings) => settings,
            Err(diagnostics) => {
                warn!(count = diagnostics.len(), "provider configuration rejected");
                return Ok(diagnostics);
            },
        };

        let client = match settings.arm_client() {
            Ok(client) => client,
            Err(e) => {
                return Ok(vec![Diagnostic::error("Unable to build the Resource Manager client")
                    .with_detail(e.to_string())])
            },
        };

        info!(
            subscription_id = %settings.subscription_id,
            endpoint = %settings.endpoint,
            strict = settings.features.require_resources_to_be_imported,
            "provider configured"
        );
        let clients = Clients::arm(client);
        *self.configured.write().await = Some(Configured { settings, clients });
        Ok(vec![])
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        info!("cancelling in-flight operations");
        self.stop.cancel();
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        Ok(validation::validate(&Self::resource_schema(kind), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        let prior = prior_state.unwrap_or(Value::Null);
        let result = plan::plan(&Self::resource_schema(kind), &prior, &proposed_state);
        debug!(
            resource_type,
            changes = result.changes.len(),
            requires_replace = result.requires_replace,
            "planned"
        );
        Ok(result)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        self.create_or_update(kind, planned_state, true).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        if current_state.is_null() {
            return Ok(Value::Null);
        }
        let (resource_group, name) = StoredId::parse(current_state, kind.arm_type())?;
        self.read_by_coordinates(kind, &resource_group, &name).await
    }

    async fn update(
        &self,
        resource_type: &str,
        _prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        self.create_or_update(kind, planned_state, false).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        let (resource_group, name) = StoredId::parse(current_state, kind.arm_type())?;
        let Configured { settings, clients } = self.configured().await?;
        let ctx = self.context(settings.timeouts.delete);

        match kind {
            ResourceKind::P2sVpnGateway => {
                p2s_vpn_gateway::delete(&clients, &ctx, &resource_group, &name).await
            },
            ResourceKind::PrivateEndpoint => {
                private_endpoint::delete(&clients, &ctx, &resource_group, &name).await
            },
        }
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        let (resource_group, name) = services::resource_coordinates(id, kind.arm_type())?;
        let state = self.read_by_coordinates(kind, &resource_group, &name).await?;
        if state.is_null() {
            return Err(ProviderError::NotFound(format!(
                "cannot import {:?}: it does not exist",
                id
            )));
        }
        info!(resource_type, id, "imported");
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = Self::data_source_schema(data_source_type)?;
        Ok(validation::validate(&schema, &config))
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        // Reject unknown types before requiring configuration.
        Self::data_source_schema(data_source_type)?;
        let Configured { settings, clients } = self.configured().await?;
        let ctx = self.context(settings.timeouts.read);

        match data_source_type {
            p2s_vpn_gateway::TYPE_NAME => {
                let lookup = decode(data_source_type, config)?;
                encode(&p2s_vpn_gateway::read_data_source(&clients, &ctx, &lookup).await?)
            },
            private_endpoint::TYPE_NAME => {
                let lookup = decode(data_source_type, config)?;
                encode(&private_endpoint::read_data_source(&clients, &ctx, &lookup).await?)
            },
            resources::RESOURCE_GROUP_TYPE_NAME => {
                let lookup = decode(data_source_type, config)?;
                encode(&resources::read_resource_group(&clients, &ctx, &lookup).await?)
            },
            resources::SUBSCRIPTION_TYPE_NAME => {
                let lookup = if config.is_null() {
                    resources::SubscriptionLookup::default()
                } else {
                    decode(data_source_type, config)?
                };
                encode(&resources::read_subscription(&clients, &ctx, &lookup).await?)
            },
            app_insights::TYPE_NAME => {
                let lookup = decode(data_source_type, config)?;
                encode(&app_insights::read_data_source(&clients, &ctx, &lookup).await?)
            },
            other => {
                let kind = VariableKind::from_type_name(other).ok_or_else(|| {
                    ProviderError::UnknownResource(format!("Unknown data source type: {}", other))
                })?;
                let lookup = decode(data_source_type, config)?;
                encode(&automation::read_data_source(&clients, &ctx, kind, &lookup).await?)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_registers_every_type() {
        let provider = AzureRmProvider::new();
        let metadata = provider.metadata();
        assert_eq!(
            metadata.resources,
            vec!["azurerm_p2s_vpn_gateway", "azurerm_private_endpoint"]
        );
        assert_eq!(metadata.data_sources.len(), 9);
        assert!(metadata
            .data_sources
            .contains(&"azurerm_automation_variable_datetime".to_string()));
    }

    #[test]
    fn test_resource_kind_round_trip() {
        for kind in [ResourceKind::P2sVpnGateway, ResourceKind::PrivateEndpoint] {
            assert_eq!(ResourceKind::from_type_name(kind.type_name()).unwrap(), kind);
        }
        assert!(matches!(
            ResourceKind::from_type_name("azurerm_virtual_network"),
            Err(ProviderError::UnknownResource(_))
        ));
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let provider = AzureRmProvider::new();
        let err = provider
            .read_data_source("azurerm_resource_group", json!({"name": "rg"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));

        let err = provider
            .read_data_source("azurerm_storage_account", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_read_of_null_state_is_null() {
        let provider = AzureRmProvider::new();
        let state = provider.read("azurerm_private_endpoint", Value::Null).await.unwrap();
        assert!(state.is_null());
    }

    #[tokio::test]
    async fn test_configure_reports_missing_credentials() {
        let provider = AzureRmProvider::new();
        let diagnostics = provider
            .configure(json!({"subscription_id": "00000000-0000-0000-0000-000000000000"}))
            .await
            .unwrap();
        // Only fails when the token is not in the environment either.
        if std::env::var("ARM_ACCESS_TOKEN").is_err() {
            assert!(diagnostics.iter().any(Diagnostic::is_error));
            assert!(provider.configured().await.is_err());
        }
    }

    #[tokio::test]
    async fn test_configure_with_token() {
        let provider = AzureRmProvider::new();
        let diagnostics = provider
            .configure(json!({
                "subscription_id": "00000000-0000-0000-0000-000000000000",
                "access_token": "token",
                "features": {"require_resources_to_be_imported": true}
            }))
            .await
            .unwrap();
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let configured = provider.configured().await.unwrap();
        assert!(configured.settings.features.require_resources_to_be_imported);
        assert_eq!(
            configured.clients.subscription_id,
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test]
    async fn test_validate_resource_config() {
        let provider = AzureRmProvider::new();
        let diagnostics = provider
            .validate_resource_config(
                "azurerm_p2s_vpn_gateway",
                json!({
                    "name": "",
                    "resource_group_name": "rg",
                    "location": "westeurope",
                    "virtual_hub_id": "hub",
                }),
            )
            .await
            .unwrap();
        let summaries: Vec<_> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert!(summaries.iter().any(|s| s.contains("'name' must not be empty")), "{:?}", summaries);
        assert!(summaries.iter().any(|s| s.contains("p2s_vpn_server_configuration_id")));
        assert!(summaries.iter().any(|s| s.contains("virtual_hub_id")));
    }

    #[tokio::test]
    async fn test_plan_marks_location_change_as_replace() {
        let provider = AzureRmProvider::new();
        let prior = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/privateEndpoints/pe",
            "name": "pe",
            "resource_group_name": "rg",
            "location": "westeurope",
        });
        let mut proposed = prior.clone();
        proposed["location"] = json!("northeurope");
        let plan = provider
            .plan("azurerm_private_endpoint", Some(prior), proposed, Value::Null)
            .await
            .unwrap();
        assert!(plan.requires_replace);
    }
}
