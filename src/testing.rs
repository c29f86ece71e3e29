//! Test harness for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] without a gRPC server.
//! [`FakeArm`] is an in-memory Resource Manager: it implements every client
//! trait, assigns IDs, normalizes locations and completes (or stalls)
//! long-running operations, so handlers can be exercised end to end.
//!
//! # Example
//!
//! ```
//! use azurerm_provider::testing::{FakeArm, ProviderTester};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let arm = FakeArm::new();
//! arm.seed_resource_group("demo", "West Europe");
//!
//! let tester = ProviderTester::new(arm.provider());
//! let group = tester
//!     .read_data_source("azurerm_resource_group", json!({"name": "demo"}))
//!     .await
//!     .unwrap();
//! assert_eq!(group["location"], "westeurope");
//! # });
//! ```

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::azure::{normalize_location, ResourceId};
use crate::client::models::{AutomationVariable, ResourceGroup, Subscription};
use crate::client::{
    ApiError, ArmResource, AutomationVariablesApi, Clients, CompletedOperation, LongRunningOperation,
    ResourceApi, ResourceGroupsApi, SubscriptionsApi,
};
use crate::config::Settings;
use crate::error::ProviderError;
use crate::provider::AzureRmProvider;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A test harness for provider implementations.
///
/// Wraps a `ProviderService` and exposes its operations, plus helpers that
/// chain them the way the host does.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Read data from a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan → update → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read(resource_type, updated_state).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Keep only error diagnostics; `Ok` if there are none.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan creates without replacement.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

// =========================================================================
// In-memory Resource Manager
// =========================================================================

/// Subscription every [`FakeArm`] object lives in.
pub const FAKE_SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Objects keyed by (resource type, resource group, name), lower-cased the
/// way ARM compares them.
type ObjectKey = (String, String, String);

#[derive(Default)]
struct FakeState {
    objects: BTreeMap<ObjectKey, Value>,
    resource_groups: BTreeMap<String, ResourceGroup>,
    subscriptions: BTreeMap<String, Subscription>,
    automation_variables: BTreeMap<ObjectKey, AutomationVariable>,
    writes: usize,
    stall_operations: bool,
}

fn key(resource_type: &str, resource_group: &str, name: &str) -> ObjectKey {
    (
        resource_type.to_string(),
        resource_group.to_lowercase(),
        name.to_lowercase(),
    )
}

/// In-memory stand-in for the Resource Manager API.
///
/// Clones share state, so a test can keep a handle while the provider owns
/// the [`Clients`] built from it.
#[derive(Clone, Default)]
pub struct FakeArm {
    state: Arc<Mutex<FakeState>>,
}

impl std::fmt::Debug for FakeArm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FakeArm")
            .field("objects", &state.objects.len())
            .field("writes", &state.writes)
            .finish_non_exhaustive()
    }
}

impl FakeArm {
    pub fn new() -> Self {
        let arm = Self::default();
        arm.seed_subscription(Subscription {
            id: Some(format!("/subscriptions/{}", FAKE_SUBSCRIPTION_ID)),
            subscription_id: Some(FAKE_SUBSCRIPTION_ID.to_string()),
            display_name: Some("Fake Subscription".to_string()),
            state: Some("Enabled".to_string()),
            ..Default::default()
        });
        arm
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A client bundle backed by this fake.
    pub fn clients(&self) -> Clients {
        Clients {
            subscription_id: FAKE_SUBSCRIPTION_ID.to_string(),
            p2s_vpn_gateways: Arc::new(FakeResourceClient::new(self.clone())),
            private_endpoints: Arc::new(FakeResourceClient::new(self.clone())),
            application_insights: Arc::new(FakeResourceClient::new(self.clone())),
            resource_groups: Arc::new(self.clone()),
            subscriptions: Arc::new(self.clone()),
            automation_variables: Arc::new(self.clone()),
        }
    }

    /// A configured provider backed by this fake, with default settings.
    pub fn provider(&self) -> AzureRmProvider {
        self.provider_with(Settings::new(FAKE_SUBSCRIPTION_ID, "fake-token"))
    }

    /// A configured provider backed by this fake.
    pub fn provider_with(&self, settings: Settings) -> AzureRmProvider {
        AzureRmProvider::with_clients(settings, self.clients())
    }

    /// Store `resource` as if it had been created outside the provider.
    ///
    /// # Panics
    ///
    /// Panics if `resource` cannot be encoded as JSON.
    pub fn seed<T: ArmResource>(&self, resource_group: &str, name: &str, resource: &T) {
        let Ok(body) = serde_json::to_value(resource) else {
            panic!("{} cannot be encoded", T::RESOURCE_TYPE);
        };
        let stored = Self::materialize::<T>(resource_group, name, body);
        self.lock()
            .objects
            .insert(key(T::RESOURCE_TYPE, resource_group, name), stored);
    }

    /// Remove an object without going through the provider.
    pub fn remove<T: ArmResource>(&self, resource_group: &str, name: &str) {
        self.lock()
            .objects
            .remove(&key(T::RESOURCE_TYPE, resource_group, name));
    }

    /// Whether an object exists.
    pub fn contains<T: ArmResource>(&self, resource_group: &str, name: &str) -> bool {
        self.lock()
            .objects
            .contains_key(&key(T::RESOURCE_TYPE, resource_group, name))
    }

    pub fn seed_resource_group(&self, name: &str, location: &str) {
        let group = ResourceGroup {
            id: Some(format!(
                "/subscriptions/{}/resourceGroups/{}",
                FAKE_SUBSCRIPTION_ID, name
            )),
            name: Some(name.to_string()),
            location: Some(location.to_string()),
            tags: None,
        };
        self.lock()
            .resource_groups
            .insert(name.to_lowercase(), group);
    }

    pub fn seed_subscription(&self, subscription: Subscription) {
        let id = subscription.subscription_id.clone().unwrap_or_default();
        self.lock().subscriptions.insert(id, subscription);
    }

    pub fn seed_automation_variable(
        &self,
        resource_group: &str,
        account: &str,
        name: &str,
        mut variable: AutomationVariable,
    ) {
        variable.id.get_or_insert_with(|| {
            format!(
                "{}/variables/{}",
                ResourceId::format(
                    FAKE_SUBSCRIPTION_ID,
                    resource_group,
                    "Microsoft.Automation",
                    "automationAccounts",
                    account
                ),
                name
            )
        });
        variable.name.get_or_insert_with(|| name.to_string());
        self.lock()
            .automation_variables
            .insert(key(account, resource_group, name), variable);
    }

    /// Number of create/update/delete calls that reached the fake.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// While set, long-running operations never finish.
    pub fn stall_operations(&self, stall: bool) {
        self.lock().stall_operations = stall;
    }

    /// What ARM stores for a submitted body: ID assigned, location
    /// normalized, provisioning finished.
    fn materialize<T: ArmResource>(resource_group: &str, name: &str, mut body: Value) -> Value {
        let id = ResourceId::format(
            FAKE_SUBSCRIPTION_ID,
            resource_group,
            T::PROVIDER_NAMESPACE,
            T::RESOURCE_TYPE,
            name,
        );
        if let Value::Object(object) = &mut body {
            object.insert("id".to_string(), json!(id));
            object.insert("name".to_string(), json!(name));
            if let Some(location) = object.get("location").and_then(Value::as_str) {
                let location = normalize_location(location);
                object.insert("location".to_string(), json!(location));
            }
            let properties = object
                .entry("properties")
                .or_insert_with(|| json!({}));
            if let Value::Object(properties) = properties {
                properties.insert("provisioningState".to_string(), json!("Succeeded"));
                if T::RESOURCE_TYPE == "privateEndpoints" {
                    properties.insert(
                        "networkInterfaces".to_string(),
                        json!([{ "id": ResourceId::format(
                            FAKE_SUBSCRIPTION_ID,
                            resource_group,
                            "Microsoft.Network",
                            "networkInterfaces",
                            &format!("{}.nic", name),
                        ) }]),
                    );
                }
            }
        }
        body
    }

    fn operation(&self) -> Box<dyn LongRunningOperation> {
        if self.lock().stall_operations {
            Box::new(StalledOperation)
        } else {
            Box::new(CompletedOperation)
        }
    }
}

/// An operation that never reaches a terminal state.
struct StalledOperation;

#[async_trait]
impl LongRunningOperation for StalledOperation {
    async fn wait(self: Box<Self>) -> Result<(), ApiError> {
        std::future::pending().await
    }
}

/// [`ResourceApi`] over a [`FakeArm`] for one resource type.
struct FakeResourceClient<T> {
    arm: FakeArm,
    _resource: PhantomData<fn() -> T>,
}

impl<T> FakeResourceClient<T> {
    fn new(arm: FakeArm) -> Self {
        Self {
            arm,
            _resource: PhantomData,
        }
    }
}

#[async_trait]
impl<T: ArmResource> ResourceApi<T> for FakeResourceClient<T> {
    async fn get(&self, resource_group: &str, name: &str) -> Result<T, ApiError> {
        let stored = self
            .arm
            .lock()
            .objects
            .get(&key(T::RESOURCE_TYPE, resource_group, name))
            .cloned();
        match stored {
            Some(body) => Ok(serde_json::from_value(body)?),
            None => Err(ApiError::not_found(format!(
                "The Resource '{}/{}/{}' under resource group '{}' was not found.",
                T::PROVIDER_NAMESPACE,
                T::RESOURCE_TYPE,
                name,
                resource_group
            ))),
        }
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        resource: &T,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError> {
        let body = serde_json::to_value(resource)?;
        let stored = FakeArm::materialize::<T>(resource_group, name, body);
        {
            let mut state = self.arm.lock();
            state.writes += 1;
            state
                .objects
                .insert(key(T::RESOURCE_TYPE, resource_group, name), stored);
        }
        Ok(self.arm.operation())
    }

    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError> {
        let removed = {
            let mut state = self.arm.lock();
            state.writes += 1;
            state
                .objects
                .remove(&key(T::RESOURCE_TYPE, resource_group, name))
        };
        match removed {
            Some(_) => Ok(self.arm.operation()),
            None => Err(ApiError::not_found(format!("{} was not found", name))),
        }
    }
}

#[async_trait]
impl ResourceGroupsApi for FakeArm {
    async fn get(&self, name: &str) -> Result<ResourceGroup, ApiError> {
        self.lock()
            .resource_groups
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Resource group '{}' could not be found.", name)))
    }
}

#[async_trait]
impl SubscriptionsApi for FakeArm {
    async fn get(&self, subscription_id: &str) -> Result<Subscription, ApiError> {
        self.lock()
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| {
                ApiError::not_found(format!("The subscription '{}' could not be found.", subscription_id))
            })
    }
}

#[async_trait]
impl AutomationVariablesApi for FakeArm {
    async fn get(
        &self,
        resource_group: &str,
        account: &str,
        name: &str,
    ) -> Result<AutomationVariable, ApiError> {
        self.lock()
            .automation_variables
            .get(&key(account, resource_group, name))
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Variable '{}' not found.", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::{P2sVpnGateway, PrivateEndpoint};

    #[tokio::test]
    async fn test_fake_assigns_id_and_normalizes_location() {
        let arm = FakeArm::new();
        let clients = arm.clients();
        let gateway = P2sVpnGateway {
            location: Some("West Europe".to_string()),
            ..Default::default()
        };

        let op = clients
            .p2s_vpn_gateways
            .create_or_update("rg", "gw", &gateway)
            .await
            .unwrap();
        op.wait().await.unwrap();

        let read = clients.p2s_vpn_gateways.get("RG", "gw").await.unwrap();
        assert_eq!(
            read.id.as_deref(),
            Some("/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/p2sVpnGateways/gw")
        );
        assert_eq!(read.location.as_deref(), Some("westeurope"));
        assert_eq!(
            read.properties.unwrap().provisioning_state.as_deref(),
            Some("Succeeded")
        );
        assert_eq!(arm.writes(), 1);
    }

    #[tokio::test]
    async fn test_fake_missing_objects_are_404() {
        let arm = FakeArm::new();
        let clients = arm.clients();
        let err = clients.private_endpoints.get("rg", "pe").await.unwrap_err();
        assert!(err.is_not_found());
        let err = clients.private_endpoints.delete("rg", "pe").await.err().unwrap();
        assert!(err.is_not_found());
        assert!(!arm.contains::<PrivateEndpoint>("rg", "pe"));
    }

    #[tokio::test]
    async fn test_fake_stalled_operation_does_not_finish() {
        let arm = FakeArm::new();
        arm.stall_operations(true);
        let op = arm
            .clients()
            .private_endpoints
            .create_or_update("rg", "pe", &PrivateEndpoint::default())
            .await
            .unwrap();
        let waited = tokio::time::timeout(std::time::Duration::from_millis(20), op.wait()).await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Invalid configuration value")];
        assert_error_contains(&diagnostics, "Invalid");
        assert_error_contains(&diagnostics, "configuration");
    }

    #[test]
    #[should_panic(expected = "Expected an error containing")]
    fn test_assert_error_contains_ignores_warnings() {
        let diagnostics = vec![Diagnostic::warning("Invalid but harmless")];
        assert_error_contains(&diagnostics, "Invalid");
    }

    #[test]
    fn test_check_diagnostics_keeps_errors_only() {
        assert!(check_diagnostics(vec![Diagnostic::warning("just a warning")]).is_ok());
        match check_diagnostics(vec![Diagnostic::error("bad"), Diagnostic::warning("meh")]) {
            Err(TestError::Diagnostics(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("field1"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("field1"));
        assert!(display.contains("More info"));
    }
}
