//! Azure Resource Manager provider plugin
//!
//! Manages point-to-site VPN gateways and private endpoints, and looks up
//! resource groups, subscriptions, Application Insights components and
//! Automation variables, on behalf of an infrastructure-as-code host.
//!
//! # Overview
//!
//! - **[`server`]**: the [`ProviderService`] trait, its gRPC adapter, and
//!   [`serve`] with the handshake and graceful shutdown
//! - **[`provider`]**: [`AzureRmProvider`], the schema registry and dispatch
//! - **[`services`]**: typed configuration, expand/flatten and CRUD handlers
//!   per resource family
//! - **[`client`]**: ARM models, the API traits and their REST implementation
//! - **[`context`]**: per-operation deadline and cancellation
//! - **[`schema`]**, **[`validation`]**, **[`plan`]**: schema description,
//!   declared-configuration checks and shallow plans
//!
//! # Handshake Protocol
//!
//! When the plugin starts via [`serve`], it prints one line to stdout:
//!
//! ```text
//! IAC_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `IAC_PROVIDER|<protocol_version>|<address>`. Logs go to stderr.
//!
//! # Configuration
//!
//! The provider block carries `subscription_id`, `access_token` and friends;
//! unset values fall back to `ARM_*` environment variables. See [`config`].

#![warn(clippy::all)]

pub mod azure;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod schema;
pub mod server;
pub mod services;
pub mod testing;
pub mod types;
pub mod validation;

/// Types generated from `proto/provider.proto`.
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::AzureRmProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_listener, serve_on_with_options, serve_with_options, ProviderService,
    ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};
