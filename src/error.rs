//! Error types for the provider.
//!
//! [`ProviderError`] is what every handler returns to the host. Failures of
//! the remote management API are carried as [`ApiError`] inside
//! [`ProviderError::Remote`], together with the resource coordinates the
//! handler was working on.

use thiserror::Error;

pub use crate::client::ApiError;

/// Errors surfaced by resource and data source handlers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested remote object does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A remote object with the same name already exists and must be
    /// imported before it can be managed.
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// The remote API failed; `context` names the operation and resource.
    #[error("{context}: {source}")]
    Remote {
        /// Operation and resource coordinates, e.g. `Error reading Private
        /// Endpoint "pe" (Resource Group "rg")`.
        context: String,
        /// The underlying API failure.
        #[source]
        source: ApiError,
    },

    /// A required section of a payload was unexpectedly absent, or provider
    /// settings are unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Declared configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A stored identifier could not be parsed as an ARM resource ID.
    #[error("Invalid resource ID: {0}")]
    InvalidResourceId(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// An operation was attempted before `configure`.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The operation did not finish before its deadline.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The host cancelled the operation.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Operation not supported for this type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Wrap an API failure with resource context.
    ///
    /// Timeouts and cancellations of a wait become [`DeadlineExceeded`] and
    /// [`Cancelled`] so the host can tell them apart from remote failures.
    ///
    /// [`DeadlineExceeded`]: ProviderError::DeadlineExceeded
    /// [`Cancelled`]: ProviderError::Cancelled
    ///
    /// # Examples
    ///
    /// ```
    /// use azurerm_provider::error::{ApiError, ProviderError};
    ///
    /// let err = ProviderError::remote("Error reading Subscription", ApiError::Timeout);
    /// assert!(matches!(err, ProviderError::DeadlineExceeded(_)));
    /// ```
    pub fn remote(context: impl Into<String>, source: ApiError) -> Self {
        let context = context.into();
        match source {
            ApiError::Timeout => Self::DeadlineExceeded(context),
            ApiError::Cancelled => Self::Cancelled(context),
            source => Self::Remote { context, source },
        }
    }

    /// Get the error message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::AlreadyExists(msg) => msg,
            Self::Remote { context, .. } => context,
            Self::Configuration(msg) => msg,
            Self::Validation(msg) => msg,
            Self::InvalidResourceId(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::NotConfigured(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::Cancelled(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
            Self::Unimplemented(msg) => msg,
        }
    }

    /// Whether this error means the remote object is absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Remote { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::AlreadyExists(msg) => tonic::Status::already_exists(msg),
            ProviderError::Remote { context, source } => {
                let msg = format!("{}: {}", context, source);
                match source.status_code() {
                    Some(401) => tonic::Status::unauthenticated(msg),
                    Some(403) => tonic::Status::permission_denied(msg),
                    Some(404) => tonic::Status::not_found(msg),
                    Some(409) => tonic::Status::already_exists(msg),
                    Some(429) => tonic::Status::resource_exhausted(msg),
                    Some(code) if code >= 500 => tonic::Status::unavailable(msg),
                    Some(_) => tonic::Status::failed_precondition(msg),
                    None => tonic::Status::unknown(msg),
                }
            }
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::InvalidResourceId(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::NotConfigured(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::DeadlineExceeded(msg) => tonic::Status::deadline_exceeded(msg),
            ProviderError::Cancelled(msg) => tonic::Status::cancelled(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            }
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            }
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound(
            "P2S VPN Gateway \"gw\" (Resource Group \"rg\") was not found".to_string(),
        );
        assert_eq!(
            format!("{}", err),
            "Resource not found: P2S VPN Gateway \"gw\" (Resource Group \"rg\") was not found"
        );

        let err = ProviderError::AlreadyExists("/subscriptions/123".to_string());
        assert_eq!(format!("{}", err), "Resource already exists: /subscriptions/123");
    }

    #[test]
    fn test_remote_display_includes_context_and_source() {
        let err = ProviderError::remote(
            "Error reading Private Endpoint \"pe\" (Resource Group \"rg\")",
            ApiError::status(500, "InternalServerError", "boom"),
        );
        let display = err.to_string();
        assert!(display.starts_with("Error reading Private Endpoint \"pe\""));
        assert!(display.contains("InternalServerError"));
        assert!(display.contains("boom"));
        assert_eq!(
            err.message(),
            "Error reading Private Endpoint \"pe\" (Resource Group \"rg\")"
        );
    }

    #[test]
    fn test_remote_maps_wait_failures() {
        let err = ProviderError::remote("waiting", ApiError::Timeout);
        assert!(matches!(err, ProviderError::DeadlineExceeded(ref m) if m == "waiting"));

        let err = ProviderError::remote("waiting", ApiError::Cancelled);
        assert!(matches!(err, ProviderError::Cancelled(_)));
    }

    #[test]
    fn test_is_not_found() {
        assert!(ProviderError::NotFound("x".to_string()).is_not_found());
        assert!(ProviderError::remote("ctx", ApiError::not_found("gone")).is_not_found());
        assert!(!ProviderError::remote("ctx", ApiError::status(409, "Conflict", "")).is_not_found());
        assert!(!ProviderError::Configuration("x".to_string()).is_not_found());
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::NotFound("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::AlreadyExists("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::AlreadyExists);

        let status: tonic::Status = ProviderError::Configuration("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::DeadlineExceeded("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::DeadlineExceeded);

        let status: tonic::Status = ProviderError::Cancelled("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Cancelled);
    }

    #[test]
    fn test_remote_to_status_follows_http_status() {
        let cases = [
            (401, tonic::Code::Unauthenticated),
            (403, tonic::Code::PermissionDenied),
            (404, tonic::Code::NotFound),
            (409, tonic::Code::AlreadyExists),
            (429, tonic::Code::ResourceExhausted),
            (503, tonic::Code::Unavailable),
            (400, tonic::Code::FailedPrecondition),
        ];
        for (http, code) in cases {
            let err = ProviderError::remote("ctx", ApiError::status(http, "Code", "msg"));
            let status: tonic::Status = err.into();
            assert_eq!(status.code(), code, "HTTP {}", http);
        }
    }
}
