//! reqwest-backed implementation of the API traits.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use super::error::{ApiError, ErrorBody};
use super::models::{AutomationVariable, ResourceGroup, Subscription};
use super::{
    ArmResource, AutomationVariablesApi, CompletedOperation, LongRunningOperation, ResourceApi,
    ResourceGroupsApi, SubscriptionsApi,
};

/// Public-cloud Resource Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
const RESOURCE_GROUPS_API_VERSION: &str = "2019-05-01";
const SUBSCRIPTIONS_API_VERSION: &str = "2019-06-01";
const AUTOMATION_API_VERSION: &str = "2015-10-31";

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };
    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Authenticated HTTP access to one subscription.
#[derive(Clone)]
pub struct ArmClient {
    http: Client,
    endpoint: String,
    subscription_id: String,
    token: String,
    poll_interval: Duration,
}

impl ArmClient {
    /// Create a client for `subscription_id` that authenticates with a
    /// bearer `token`.
    pub fn new(
        endpoint: impl Into<String>,
        subscription_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("azurerm-provider/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            subscription_id: subscription_id.into(),
            token: token.into(),
            poll_interval: Duration::from_secs(10),
        })
    }

    /// Interval between polls when the API sends no `Retry-After`.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The subscription this client is scoped to.
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// The Resource Manager base URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        api_version: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ApiError> {
        debug!(%method, url, "ARM request");
        let mut request = self.http.request(method, url).bearer_auth(&self.token);
        if let Some(version) = api_version {
            request = request.query(&[("api-version", version)]);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn into_error(response: Response) -> ApiError {
        let status = response.status();
        match response.text().await {
            Ok(body) => {
                if status != StatusCode::NOT_FOUND {
                    error!(status = status.as_u16(), body = %sanitize_for_log(&body), "ARM request failed");
                }
                ApiError::from_response(status.as_u16(), &body)
            }
            Err(err) => err.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .send(Method::GET, &self.url(path), Some(api_version), None)
            .await?;
        if !response.status().is_success() {
            return Err(Self::into_error(response).await);
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn put_json<B: Serialize>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError> {
        let body = serde_json::to_value(body)?;
        let response = self
            .send(Method::PUT, &self.url(path), Some(api_version), Some(&body))
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::into_error(response).await);
        }

        let headers = response.headers().clone();
        if let Some(target) = self.header_target(&headers, status) {
            return Ok(self.poller(target, &headers));
        }

        let text = response.text().await?;
        let state = ProvisioningEnvelope::parse(&text);
        match state.as_deref() {
            None => Ok(Box::new(CompletedOperation)),
            Some(state) if is_terminal(state) => check_terminal(state, None),
            Some(_) => {
                let url = format!("{}?api-version={}", self.url(path), api_version);
                Ok(self.poller(PollTarget::ProvisioningState(url), &headers))
            }
        }
    }

    async fn delete_path(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError> {
        let response = self
            .send(Method::DELETE, &self.url(path), Some(api_version), None)
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::into_error(response).await);
        }
        let headers = response.headers().clone();
        match self.header_target(&headers, status) {
            Some(target) => Ok(self.poller(target, &headers)),
            None => Ok(Box::new(CompletedOperation)),
        }
    }

    fn header_target(&self, headers: &HeaderMap, status: StatusCode) -> Option<PollTarget> {
        if let Some(url) = header_str(headers, AZURE_ASYNC_OPERATION) {
            return Some(PollTarget::AsyncOperation(url));
        }
        if status == StatusCode::ACCEPTED {
            if let Some(url) = header_str(headers, LOCATION.as_str()) {
                return Some(PollTarget::Location(url));
            }
        }
        None
    }

    fn poller(&self, target: PollTarget, headers: &HeaderMap) -> Box<dyn LongRunningOperation> {
        Box::new(ArmPoller {
            client: self.clone(),
            target,
            first_delay: retry_after(headers),
        })
    }

    fn resource_group_path(&self, resource_group: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, resource_group
        )
    }
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .field("subscription_id", &self.subscription_id)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn is_terminal(state: &str) -> bool {
    matches!(
        state.to_ascii_lowercase().as_str(),
        "succeeded" | "failed" | "canceled" | "cancelled"
    )
}

fn check_terminal(
    state: &str,
    error: Option<ErrorBody>,
) -> Result<Box<dyn LongRunningOperation>, ApiError> {
    if state.eq_ignore_ascii_case("succeeded") {
        Ok(Box::new(CompletedOperation))
    } else {
        Err(ApiError::OperationFailed {
            status: state.to_string(),
            message: error.and_then(|e| e.message).unwrap_or_default(),
        })
    }
}

#[derive(Deserialize)]
struct ProvisioningEnvelope {
    properties: Option<ProvisioningProperties>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisioningProperties {
    provisioning_state: Option<String>,
}

impl ProvisioningEnvelope {
    fn parse(body: &str) -> Option<String> {
        serde_json::from_str::<ProvisioningEnvelope>(body)
            .ok()
            .and_then(|e| e.properties)
            .and_then(|p| p.provisioning_state)
    }
}

/// Status document behind an `Azure-AsyncOperation` URL.
#[derive(Deserialize)]
struct OperationStatus {
    status: String,
    error: Option<ErrorBody>,
}

#[derive(Debug, Clone)]
enum PollTarget {
    AsyncOperation(String),
    Location(String),
    ProvisioningState(String),
}

struct ArmPoller {
    client: ArmClient,
    target: PollTarget,
    first_delay: Option<Duration>,
}

#[async_trait]
impl LongRunningOperation for ArmPoller {
    async fn wait(self: Box<Self>) -> Result<(), ApiError> {
        let mut delay = self.first_delay.unwrap_or(self.client.poll_interval);
        loop {
            tokio::time::sleep(delay).await;

            let url = match &self.target {
                PollTarget::AsyncOperation(url)
                | PollTarget::Location(url)
                | PollTarget::ProvisioningState(url) => url.as_str(),
            };
            let response = self.client.send(Method::GET, url, None, None).await?;
            let status = response.status();
            delay = retry_after(response.headers()).unwrap_or(self.client.poll_interval);

            match &self.target {
                PollTarget::Location(_) => {
                    if status == StatusCode::ACCEPTED {
                        trace!(url, "operation still running");
                        continue;
                    }
                    if status.is_success() {
                        return Ok(());
                    }
                    return Err(ArmClient::into_error(response).await);
                }
                PollTarget::AsyncOperation(_) => {
                    if !status.is_success() {
                        return Err(ArmClient::into_error(response).await);
                    }
                    let doc: OperationStatus = serde_json::from_str(&response.text().await?)?;
                    if is_terminal(&doc.status) {
                        return check_terminal(&doc.status, doc.error).map(|_| ());
                    }
                    trace!(url, status = %doc.status, "operation still running");
                }
                PollTarget::ProvisioningState(_) => {
                    if !status.is_success() {
                        return Err(ArmClient::into_error(response).await);
                    }
                    match ProvisioningEnvelope::parse(&response.text().await?) {
                        None => return Ok(()),
                        Some(state) if is_terminal(&state) => {
                            return check_terminal(&state, None).map(|_| ());
                        }
                        Some(state) => trace!(url, %state, "resource still provisioning"),
                    }
                }
            }
        }
    }
}

/// [`ResourceApi`] over ARM for one resource type.
pub struct ArmResourceClient<T> {
    client: Arc<ArmClient>,
    _resource: PhantomData<fn() -> T>,
}

impl<T: ArmResource> ArmResourceClient<T> {
    /// Share `client` for calls on `T`.
    pub fn new(client: Arc<ArmClient>) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    fn path(&self, resource_group: &str, name: &str) -> String {
        format!(
            "{}/providers/{}/{}/{}",
            self.client.resource_group_path(resource_group),
            T::PROVIDER_NAMESPACE,
            T::RESOURCE_TYPE,
            name
        )
    }
}

#[async_trait]
impl<T: ArmResource> ResourceApi<T> for ArmResourceClient<T> {
    async fn get(&self, resource_group: &str, name: &str) -> Result<T, ApiError> {
        self.client
            .get_json(&self.path(resource_group, name), T::API_VERSION)
            .await
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        resource: &T,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError> {
        self.client
            .put_json(&self.path(resource_group, name), T::API_VERSION, resource)
            .await
    }

    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError> {
        self.client
            .delete_path(&self.path(resource_group, name), T::API_VERSION)
            .await
    }
}

#[async_trait]
impl ResourceGroupsApi for ArmClient {
    async fn get(&self, name: &str) -> Result<ResourceGroup, ApiError> {
        self.get_json(&self.resource_group_path(name), RESOURCE_GROUPS_API_VERSION)
            .await
    }
}

#[async_trait]
impl SubscriptionsApi for ArmClient {
    async fn get(&self, subscription_id: &str) -> Result<Subscription, ApiError> {
        self.get_json(
            &format!("/subscriptions/{}", subscription_id),
            SUBSCRIPTIONS_API_VERSION,
        )
        .await
    }
}

#[async_trait]
impl AutomationVariablesApi for ArmClient {
    async fn get(
        &self,
        resource_group: &str,
        account: &str,
        name: &str,
    ) -> Result<AutomationVariable, ApiError> {
        let path = format!(
            "{}/providers/Microsoft.Automation/automationAccounts/{}/variables/{}",
            self.resource_group_path(resource_group),
            account,
            name
        );
        self.get_json(&path, AUTOMATION_API_VERSION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::PrivateEndpoint;

    #[test]
    fn test_sanitize_for_log_truncates() {
        let long = "x".repeat(500);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("truncated, 500 bytes total"));
        assert_eq!(sanitize_for_log("a\nb"), "ab");
    }

    #[test]
    fn test_resource_path() {
        let client = Arc::new(ArmClient::new("https://example.test/", "sub-1", "token").unwrap());
        let pe = ArmResourceClient::<PrivateEndpoint>::new(client);
        assert_eq!(
            pe.path("rg", "pe1"),
            "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Network/privateEndpoints/pe1"
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(is_terminal("Succeeded"));
        assert!(is_terminal("failed"));
        assert!(is_terminal("Canceled"));
        assert!(!is_terminal("Updating"));
        assert!(check_terminal("Succeeded", None).is_ok());
        let err = check_terminal(
            "Failed",
            Some(ErrorBody {
                code: Some("Conflict".to_string()),
                message: Some("hub busy".to_string()),
            }),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::OperationFailed { ref message, .. } if message == "hub busy"));
    }

    #[test]
    fn test_provisioning_envelope() {
        assert_eq!(
            ProvisioningEnvelope::parse(r#"{"properties":{"provisioningState":"Updating"}}"#)
                .as_deref(),
            Some("Updating")
        );
        assert_eq!(ProvisioningEnvelope::parse("{}"), None);
        assert_eq!(ProvisioningEnvelope::parse(""), None);
    }
}
