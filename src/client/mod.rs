//! Typed clients for the Azure Resource Manager API.
//!
//! Handlers never talk HTTP directly. They receive a [`Clients`] bundle whose
//! members implement the API traits below; [`Clients::arm`] wires them to the
//! real REST API and [`crate::testing::FakeArm`] to an in-memory backend.
//!
//! Mutating calls return a [`LongRunningOperation`] that must be awaited to a
//! terminal state before the caller re-reads the resource.

mod arm;
mod error;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use arm::{ArmClient, ArmResourceClient, DEFAULT_ENDPOINT};
pub use error::{ApiError, ErrorBody};

use models::{
    ApplicationInsightsComponent, AutomationVariable, P2sVpnGateway, PrivateEndpoint,
    ResourceGroup, Subscription,
};

/// A resource type living under
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`.
pub trait ArmResource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Provider namespace, e.g. `Microsoft.Network`.
    const PROVIDER_NAMESPACE: &'static str;
    /// Resource type path segment, e.g. `privateEndpoints`.
    const RESOURCE_TYPE: &'static str;
    /// API version used for every call on this type.
    const API_VERSION: &'static str;

    /// The fully-qualified resource ID reported by the API.
    fn id(&self) -> Option<&str>;
}

/// Handle on an asynchronous remote mutation.
#[async_trait]
pub trait LongRunningOperation: Send {
    /// Block until the operation reaches a terminal state.
    ///
    /// Returns [`ApiError::OperationFailed`] when the operation ends in
    /// anything other than success.
    async fn wait(self: Box<Self>) -> Result<(), ApiError>;
}

/// An operation that finished synchronously.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletedOperation;

#[async_trait]
impl LongRunningOperation for CompletedOperation {
    async fn wait(self: Box<Self>) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Get/CreateOrUpdate/Delete keyed by (resource group, name).
#[async_trait]
pub trait ResourceApi<T: ArmResource>: Send + Sync {
    /// Fetch one object.
    async fn get(&self, resource_group: &str, name: &str) -> Result<T, ApiError>;

    /// Create or replace one object.
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        resource: &T,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError>;

    /// Delete one object.
    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError>;
}

/// Read access to resource groups.
#[async_trait]
pub trait ResourceGroupsApi: Send + Sync {
    async fn get(&self, name: &str) -> Result<ResourceGroup, ApiError>;
}

/// Read access to subscriptions.
#[async_trait]
pub trait SubscriptionsApi: Send + Sync {
    async fn get(&self, subscription_id: &str) -> Result<Subscription, ApiError>;
}

/// Read access to Automation account variables.
#[async_trait]
pub trait AutomationVariablesApi: Send + Sync {
    async fn get(
        &self,
        resource_group: &str,
        account: &str,
        name: &str,
    ) -> Result<AutomationVariable, ApiError>;
}

/// Everything a handler may call, injected per operation.
#[derive(Clone)]
pub struct Clients {
    /// Subscription the clients are scoped to.
    pub subscription_id: String,
    pub p2s_vpn_gateways: Arc<dyn ResourceApi<P2sVpnGateway>>,
    pub private_endpoints: Arc<dyn ResourceApi<PrivateEndpoint>>,
    pub application_insights: Arc<dyn ResourceApi<ApplicationInsightsComponent>>,
    pub resource_groups: Arc<dyn ResourceGroupsApi>,
    pub subscriptions: Arc<dyn SubscriptionsApi>,
    pub automation_variables: Arc<dyn AutomationVariablesApi>,
}

impl Clients {
    /// Bundle backed by the ARM REST API.
    pub fn arm(client: ArmClient) -> Self {
        let client = Arc::new(client);
        Self {
            subscription_id: client.subscription_id().to_string(),
            p2s_vpn_gateways: Arc::new(ArmResourceClient::<P2sVpnGateway>::new(client.clone())),
            private_endpoints: Arc::new(ArmResourceClient::<PrivateEndpoint>::new(client.clone())),
            application_insights: Arc::new(
                ArmResourceClient::<ApplicationInsightsComponent>::new(client.clone()),
            ),
            resource_groups: client.clone(),
            subscriptions: client.clone(),
            automation_variables: client,
        }
    }
}

impl std::fmt::Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients")
            .field("subscription_id", &self.subscription_id)
            .finish_non_exhaustive()
    }
}
