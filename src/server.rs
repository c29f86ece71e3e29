//! The host-facing side of the plugin.
//!
//! [`ProviderService`] is the trait the provider implements, in plain Rust
//! types. [`serve`] wraps it in the generated gRPC service, prints the
//! handshake line and runs until SIGTERM/SIGINT.
//!
//! # Shutdown
//!
//! On a shutdown signal the server:
//! 1. calls the provider's `stop()`, cancelling in-flight operation waits
//! 2. stops accepting new connections
//! 3. waits up to [`ServeOptions::shutdown_timeout`] for in-flight requests

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated as pb;
use crate::schema::{Block, BlockNestingMode, Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};

/// Operations the host drives, in plain Rust types.
///
/// States and configurations are JSON values shaped by the schema returned
/// from [`schema`](ProviderService::schema).
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Schemas for the provider block, resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Type names and capabilities, derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<String> = schema.resources.keys().cloned().collect();
        let mut data_sources: Vec<String> = schema.data_sources.keys().cloned().collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
            capabilities: Default::default(),
        }
    }

    /// Validate the provider configuration block.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure credentials and settings. Error diagnostics mean the
    /// provider stays unconfigured.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Cancel in-flight operations.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Validate a resource's declared configuration.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Plan a create (`prior_state` is `None`), update, or destroy
    /// (`proposed_state` is null).
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a resource and return its state.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Refresh a resource. `Value::Null` means the resource is gone.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    /// Update a resource in place and return its state.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Bring an existing remote object under management by ID.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }

    /// Validate a data source's declared configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Look up a remote object.
    async fn read_data_source(&self, data_source_type: &str, _config: Value) -> Result<Value, ProviderError> {
        Err(ProviderError::UnknownResource(format!(
            "Unknown data source type: {}",
            data_source_type
        )))
    }
}

/// Adapter from the generated gRPC trait onto a [`ProviderService`].
struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

/// JSON payload from the wire; an empty payload is null.
fn decode(bytes: &[u8]) -> Result<Value, ProviderError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

fn encode(value: &Value) -> Vec<u8> {
    // A Value always serializes.
    serde_json::to_vec(value).unwrap_or_default()
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<pb::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| pb::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => pb::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => pb::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

/// A handler failure as a single error diagnostic carrying its message.
fn error_to_diagnostics(err: &ProviderError) -> Vec<pb::Diagnostic> {
    let detail = std::error::Error::source(err)
        .map(ToString::to_string)
        .unwrap_or_default();
    vec![pb::Diagnostic {
        severity: pb::diagnostic::Severity::Error as i32,
        summary: err.to_string(),
        detail,
        attribute: String::new(),
    }]
}

/// Log and convert the outcome of a validate/configure call.
fn report_diagnostics(
    operation: &str,
    type_name: &str,
    result: Result<Vec<Diagnostic>, ProviderError>,
) -> Vec<pb::Diagnostic> {
    match result {
        Ok(diagnostics) => {
            if diagnostics.iter().any(Diagnostic::is_error) {
                warn!(operation, type_name, diagnostics = diagnostics.len(), "completed with errors");
            } else {
                debug!(operation, type_name, "completed successfully");
            }
            diagnostics_to_proto(diagnostics)
        },
        Err(e) => {
            error!(operation, type_name, error = %e, "failed");
            error_to_diagnostics(&e)
        },
    }
}

fn schema_to_proto(schema: &Schema) -> pb::Schema {
    pb::Schema {
        version: schema.version as i64,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &Block) -> pb::Block {
    let mut attributes: Vec<pb::Attribute> = block
        .attributes
        .iter()
        .map(|(name, attr)| pb::Attribute {
            name: name.clone(),
            r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
            required: attr.flags.required,
            optional: attr.flags.optional,
            computed: attr.flags.computed,
            sensitive: attr.flags.sensitive,
            description: attr.description.clone().unwrap_or_default(),
            force_new: attr.force_new,
            default_value: attr.default.as_ref().map(encode).unwrap_or_default(),
            conflicts_with: attr.conflicts_with.clone(),
        })
        .collect();
    attributes.sort_by(|a, b| a.name.cmp(&b.name));

    let mut block_types: Vec<pb::NestedBlock> = block
        .blocks
        .iter()
        .map(|(name, nested)| pb::NestedBlock {
            type_name: name.clone(),
            block: Some(block_to_proto(&nested.block)),
            nesting_mode: match nested.nesting_mode {
                BlockNestingMode::Single => pb::nested_block::NestingMode::Single as i32,
                BlockNestingMode::List => pb::nested_block::NestingMode::List as i32,
                BlockNestingMode::Set => pb::nested_block::NestingMode::Set as i32,
                BlockNestingMode::Map => pb::nested_block::NestingMode::Map as i32,
            },
            min_items: nested.min_items as i32,
            max_items: nested.max_items as i32,
        })
        .collect();
    block_types.sort_by(|a, b| a.type_name.cmp(&b.type_name));

    pb::Block {
        attributes,
        block_types,
        description: block.description.clone().unwrap_or_default(),
    }
}

#[tonic::async_trait]
impl<P: ProviderService> pb::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip(self, _request), name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: tonic::Request<pb::GetMetadataRequest>,
    ) -> Result<tonic::Response<pb::GetMetadataResponse>, tonic::Status> {
        let metadata = self.provider.metadata();
        debug!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata completed"
        );
        Ok(tonic::Response::new(pb::GetMetadataResponse {
            server_capabilities: Some(pb::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: tonic::Request<pb::GetSchemaRequest>,
    ) -> Result<tonic::Response<pb::GetSchemaResponse>, tonic::Status> {
        let schema = self.provider.schema();
        Ok(tonic::Response::new(pb::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<pb::ValidateProviderConfigRequest>,
    ) -> Result<tonic::Response<pb::ValidateProviderConfigResponse>, tonic::Status> {
        let config = request.into_inner().config;
        let result = async { self.provider.validate_provider_config(decode(&config)?).await }.await;
        Ok(tonic::Response::new(pb::ValidateProviderConfigResponse {
            diagnostics: report_diagnostics("ValidateProviderConfig", "provider", result),
        }))
    }

    #[instrument(skip(self, request), name = "grpc.configure")]
    async fn configure(
        &self,
        request: tonic::Request<pb::ConfigureRequest>,
    ) -> Result<tonic::Response<pb::ConfigureResponse>, tonic::Status> {
        let config = request.into_inner().config;
        let result = async { self.provider.configure(decode(&config)?).await }.await;
        Ok(tonic::Response::new(pb::ConfigureResponse {
            diagnostics: report_diagnostics("Configure", "provider", result),
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.stop")]
    async fn stop(
        &self,
        _request: tonic::Request<pb::StopRequest>,
    ) -> Result<tonic::Response<pb::StopResponse>, tonic::Status> {
        info!("Stop called");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            },
        };
        Ok(tonic::Response::new(pb::StopResponse { error }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<pb::ValidateResourceConfigRequest>,
    ) -> Result<tonic::Response<pb::ValidateResourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let result = async {
            self.provider
                .validate_resource_config(&req.resource_type, decode(&req.config)?)
                .await
        }
        .await;
        Ok(tonic::Response::new(pb::ValidateResourceConfigResponse {
            diagnostics: report_diagnostics("ValidateResourceConfig", &req.resource_type, result),
        }))
    }

    #[instrument(skip(self, request), name = "grpc.plan")]
    async fn plan(
        &self,
        request: tonic::Request<pb::PlanRequest>,
    ) -> Result<tonic::Response<pb::PlanResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(resource_type = %req.resource_type, is_create = req.prior_state.is_empty(), "Plan called");

        let result = async {
            let prior_state = Some(decode(&req.prior_state)?).filter(|v| !v.is_null());
            self.provider
                .plan(
                    &req.resource_type,
                    prior_state,
                    decode(&req.proposed_state)?,
                    decode(&req.config)?,
                )
                .await
        }
        .await;
        let response = match result {
            Ok(result) => {
                debug!(
                    resource_type = %req.resource_type,
                    changes = result.changes.len(),
                    requires_replace = result.requires_replace,
                    "Plan completed"
                );
                pb::PlanResponse {
                    planned_state: encode(&result.planned_state),
                    changes: result.changes.into_iter().map(Into::into).collect(),
                    requires_replace: result.requires_replace,
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Plan failed");
                pb::PlanResponse {
                    planned_state: vec![],
                    changes: vec![],
                    requires_replace: false,
                    diagnostics: error_to_diagnostics(&e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.create")]
    async fn create(
        &self,
        request: tonic::Request<pb::CreateRequest>,
    ) -> Result<tonic::Response<pb::CreateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Create called");
        let (state, diagnostics) = state_outcome(
            "Create",
            &req.resource_type,
            async { self.provider.create(&req.resource_type, decode(&req.planned_state)?).await },
        )
        .await;
        Ok(tonic::Response::new(pb::CreateResponse { state, diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.read")]
    async fn read(
        &self,
        request: tonic::Request<pb::ReadRequest>,
    ) -> Result<tonic::Response<pb::ReadResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(resource_type = %req.resource_type, "Read called");
        let (state, diagnostics) = state_outcome(
            "Read",
            &req.resource_type,
            async { self.provider.read(&req.resource_type, decode(&req.current_state)?).await },
        )
        .await;
        Ok(tonic::Response::new(pb::ReadResponse { state, diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.update")]
    async fn update(
        &self,
        request: tonic::Request<pb::UpdateRequest>,
    ) -> Result<tonic::Response<pb::UpdateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Update called");
        let (state, diagnostics) = state_outcome(
            "Update",
            &req.resource_type,
            async {
                self.provider
                    .update(
                        &req.resource_type,
                        decode(&req.prior_state)?,
                        decode(&req.planned_state)?,
                    )
                    .await
            },
        )
        .await;
        Ok(tonic::Response::new(pb::UpdateResponse { state, diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.delete")]
    async fn delete(
        &self,
        request: tonic::Request<pb::DeleteRequest>,
    ) -> Result<tonic::Response<pb::DeleteResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Delete called");
        let result = async {
            self.provider
                .delete(&req.resource_type, decode(&req.current_state)?)
                .await
        }
        .await;
        let diagnostics = match result {
            Ok(()) => {
                info!(resource_type = %req.resource_type, "Delete completed successfully");
                vec![]
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Delete failed");
                error_to_diagnostics(&e)
            },
        };
        Ok(tonic::Response::new(pb::DeleteResponse { diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.import_resource_state")]
    async fn import_resource_state(
        &self,
        request: tonic::Request<pb::ImportResourceStateRequest>,
    ) -> Result<tonic::Response<pb::ImportResourceStateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, id = %req.id, "ImportResourceState called");

        let response = match self.provider.import_resource(&req.resource_type, &req.id).await {
            Ok(imported) => pb::ImportResourceStateResponse {
                imported: imported
                    .into_iter()
                    .map(|r| pb::ImportedResource {
                        resource_type: r.resource_type,
                        state: encode(&r.state),
                    })
                    .collect(),
                diagnostics: vec![],
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, id = %req.id, error = %e, "ImportResourceState failed");
                pb::ImportResourceStateResponse {
                    imported: vec![],
                    diagnostics: error_to_diagnostics(&e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.validate_data_source_config")]
    async fn validate_data_source_config(
        &self,
        request: tonic::Request<pb::ValidateDataSourceConfigRequest>,
    ) -> Result<tonic::Response<pb::ValidateDataSourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let result = async {
            self.provider
                .validate_data_source_config(&req.data_source_type, decode(&req.config)?)
                .await
        }
        .await;
        Ok(tonic::Response::new(pb::ValidateDataSourceConfigResponse {
            diagnostics: report_diagnostics("ValidateDataSourceConfig", &req.data_source_type, result),
        }))
    }

    #[instrument(skip(self, request), name = "grpc.read_data_source")]
    async fn read_data_source(
        &self,
        request: tonic::Request<pb::ReadDataSourceRequest>,
    ) -> Result<tonic::Response<pb::ReadDataSourceResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(data_source_type = %req.data_source_type, "ReadDataSource called");
        let (state, diagnostics) = state_outcome(
            "ReadDataSource",
            &req.data_source_type,
            async {
                self.provider
                    .read_data_source(&req.data_source_type, decode(&req.config)?)
                    .await
            },
        )
        .await;
        Ok(tonic::Response::new(pb::ReadDataSourceResponse { state, diagnostics }))
    }
}

/// Run a state-returning handler and shape its result for the wire.
async fn state_outcome(
    operation: &str,
    type_name: &str,
    call: impl Future<Output = Result<Value, ProviderError>>,
) -> (Vec<u8>, Vec<pb::Diagnostic>) {
    match call.await {
        Ok(state) => {
            debug!(operation, type_name, cleared = state.is_null(), "completed successfully");
            (encode(&state), vec![])
        },
        Err(e) => {
            error!(operation, type_name, error = %e, "failed");
            (vec![], error_to_diagnostics(&e))
        },
    }
}

/// Options for running the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long to wait for in-flight requests after a shutdown signal.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Wait for SIGTERM or SIGINT (CTRL+C on Windows).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C handler");
        info!("Received CTRL+C, initiating graceful shutdown");
    }

    #[cfg(not(any(unix, windows)))]
    {
        std::future::pending::<()>().await;
    }
}

/// Serve a provider on an ephemeral localhost port.
///
/// Prints `IAC_PROVIDER|<version>|<address>` to stdout once listening and
/// runs until SIGTERM/SIGINT.
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// Serve a provider with custom options. See [`serve`].
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    serve_on_listener(provider, listener, wait_for_shutdown_signal(), options).await
}

/// Serve a provider on a specific address.
pub async fn serve_on<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

/// Serve a provider on a specific address with custom options.
pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    serve_on_listener(provider, listener, wait_for_shutdown_signal(), options).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_on_listener<P: ProviderService>(
    provider: P,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = listener.local_addr()?;
    println!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr);
    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let grpc_service = ProviderGrpcService {
        provider: Arc::clone(&provider),
    };

    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(
        Server::builder()
            .add_service(pb::provider_server::ProviderServer::new(grpc_service))
            .serve_with_incoming_shutdown(
                tokio_stream::wrappers::TcpListenerStream::new(listener),
                async {
                    let _ = drain_rx.await;
                },
            ),
    );

    tokio::select! {
        result = &mut server => {
            // The server exited on its own; nothing left to drain.
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!(error = %e, "Server error");
                    Err(e.into())
                },
                Err(e) => Err(e.into()),
            };
        }
        _ = shutdown => {}
    }

    debug!("Calling provider stop()");
    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }
    let _ = drain_tx.send(());

    match tokio::time::timeout(options.shutdown_timeout, server).await {
        Ok(Ok(Ok(()))) => info!("Server shutdown complete"),
        Ok(Ok(Err(e))) => {
            error!(error = %e, "Server error during shutdown");
            return Err(e.into());
        },
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => warn!(
            timeout = ?options.shutdown_timeout,
            "Shutdown timeout exceeded, forcing shutdown"
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, NestedBlock};

    #[test]
    fn test_block_to_proto_is_sorted_and_complete() {
        let block = Block::new()
            .with_attribute("name", Attribute::required_string().with_force_new())
            .with_attribute("a", Attribute::optional_string().conflicts_with("name"))
            .with_block(
                "connections",
                NestedBlock::list(Block::new()).with_min_items(1),
            );

        let proto = block_to_proto(&block);
        let names: Vec<_> = proto.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "name"]);
        assert_eq!(proto.attributes[0].conflicts_with, vec!["name".to_string()]);
        assert!(proto.attributes[1].force_new);
        assert_eq!(proto.block_types[0].min_items, 1);
        assert_eq!(
            proto.block_types[0].nesting_mode,
            pb::nested_block::NestingMode::List as i32
        );
    }

    #[test]
    fn test_error_to_diagnostics_carries_message() {
        let err = ProviderError::NotFound("Private Endpoint \"pe\" (Resource Group \"rg\") was not found".into());
        let diagnostics = error_to_diagnostics(&err);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, pb::diagnostic::Severity::Error as i32);
        assert!(diagnostics[0].summary.contains("Private Endpoint \"pe\""));
    }

    #[test]
    fn test_decode_empty_payload_is_null() {
        assert!(decode(b"").unwrap().is_null());
        assert_eq!(decode(b"{\"a\":1}").unwrap()["a"], 1);
    }

    #[test]
    fn test_decode_rejects_malformed_payload() {
        let err = decode(b"not json").unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_read_with_malformed_state_reports_error() {
        use pb::provider_server::Provider as _;

        let service = ProviderGrpcService {
            provider: Arc::new(crate::testing::FakeArm::new().provider()),
        };
        let response = service
            .read(tonic::Request::new(pb::ReadRequest {
                resource_type: "azurerm_private_endpoint".to_string(),
                current_state: b"{\"id\": ".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.state.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.starts_with("Serialization error"));
    }
}
