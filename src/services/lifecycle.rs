//! The reconciliation cycle shared by every resource type.
//!
//! Create/Update: optional existence pre-check, submit, wait for the
//! long-running operation, re-fetch. Read: fetch, absent means gone.
//! Delete: submit, wait; absent means already deleted. Every remote call is
//! raced against the [`OperationContext`].

use std::fmt;
use std::future::Future;

use tracing::{debug, info};

use crate::client::{ApiError, ArmResource, ResourceApi};
use crate::config::Features;
use crate::context::OperationContext;
use crate::error::ProviderError;

/// The remote object an operation works on, for log and error context.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    /// Human-readable kind, e.g. `Private Endpoint`.
    pub kind: &'static str,
    pub resource_group: &'a str,
    pub name: &'a str,
}

impl<'a> Target<'a> {
    pub fn new(kind: &'static str, resource_group: &'a str, name: &'a str) -> Self {
        Self {
            kind,
            resource_group,
            name,
        }
    }
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} (Resource Group {:?})",
            self.kind, self.name, self.resource_group
        )
    }
}

/// Reject empty identifying fields before any remote call.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), ProviderError> {
    if value.trim().is_empty() {
        return Err(ProviderError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Fail with [`ProviderError::AlreadyExists`] if the target already exists.
pub async fn ensure_absent<T: ArmResource>(
    api: &dyn ResourceApi<T>,
    ctx: &OperationContext,
    target: Target<'_>,
    host_type: &str,
) -> Result<(), ProviderError> {
    match ctx.run(api.get(target.resource_group, target.name)).await {
        Ok(existing) => match existing.id() {
            Some(id) if !id.is_empty() => Err(ProviderError::AlreadyExists(format!(
                "a resource with the ID {:?} already exists - to be managed it needs to be imported as {:?}",
                id, host_type
            ))),
            _ => Ok(()),
        },
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(ProviderError::remote(
            format!("Error checking for presence of existing {}", target),
            e,
        )),
    }
}

/// Create or update the target and return the re-fetched object.
///
/// With `features.require_resources_to_be_imported` set, a new declaration
/// whose target already exists fails before anything is written.
pub async fn upsert<T: ArmResource>(
    api: &dyn ResourceApi<T>,
    ctx: &OperationContext,
    features: Features,
    target: Target<'_>,
    host_type: &str,
    payload: &T,
    is_new: bool,
) -> Result<T, ProviderError> {
    if features.require_resources_to_be_imported && is_new {
        debug!(%target, "checking for an existing object");
        ensure_absent(api, ctx, target, host_type).await?;
    }

    let operation = ctx
        .run(api.create_or_update(target.resource_group, target.name, payload))
        .await
        .map_err(|e| ProviderError::remote(format!("Error creating/updating {}", target), e))?;

    ctx.run(operation.wait())
        .await
        .map_err(|e| ProviderError::remote(format!("Error waiting for completion of {}", target), e))?;

    let read = ctx
        .run(api.get(target.resource_group, target.name))
        .await
        .map_err(|e| ProviderError::remote(format!("Error retrieving {}", target), e))?;

    if read.id().map_or(true, str::is_empty) {
        return Err(ProviderError::Configuration(format!("Cannot read {} ID", target)));
    }

    info!(%target, "created/updated");
    Ok(read)
}

/// Fetch the target; `None` when it no longer exists.
pub async fn refresh<T, F>(
    ctx: &OperationContext,
    target: Target<'_>,
    call: F,
) -> Result<Option<T>, ProviderError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match ctx.run(call).await {
        Ok(found) => Ok(Some(found)),
        Err(e) if e.is_not_found() => {
            info!(%target, "not found, removing from state");
            Ok(None)
        },
        Err(e) => Err(ProviderError::remote(
            format!("Error making Read request on {}", target),
            e,
        )),
    }
}

/// Fetch the target for a data source; absence is [`ProviderError::NotFound`].
pub async fn lookup<T, F>(ctx: &OperationContext, what: impl fmt::Display, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match ctx.run(call).await {
        Ok(found) => Ok(found),
        Err(e) if e.is_not_found() => Err(ProviderError::NotFound(format!("{} was not found", what))),
        Err(e) => Err(ProviderError::remote(format!("Error reading {}", what), e)),
    }
}

/// Delete the target and wait for the deletion to finish.
///
/// A 404 from the delete call itself means the target is already gone and
/// counts as success. Failures while waiting are always surfaced.
pub async fn destroy<T: ArmResource>(
    api: &dyn ResourceApi<T>,
    ctx: &OperationContext,
    target: Target<'_>,
) -> Result<(), ProviderError> {
    let operation = match ctx.run(api.delete(target.resource_group, target.name)).await {
        Ok(operation) => operation,
        Err(e) if e.is_not_found() => {
            info!(%target, "already deleted");
            return Ok(());
        },
        Err(e) => return Err(ProviderError::remote(format!("Error deleting {}", target), e)),
    };

    ctx.run(operation.wait())
        .await
        .map_err(|e| ProviderError::remote(format!("Error waiting for deletion of {}", target), e))?;

    info!(%target, "deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_target_display() {
        let target = Target::new("Private Endpoint", "rg1", "pe1");
        assert_eq!(
            target.to_string(),
            "Private Endpoint \"pe1\" (Resource Group \"rg1\")"
        );
    }

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("name", "gw").is_ok());
        assert!(matches!(
            require_non_empty("name", " "),
            Err(ProviderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_maps_not_found() {
        let ctx = OperationContext::new(Duration::from_secs(5));
        let err = lookup(&ctx, "Resource Group \"rg\"", async {
            Err::<(), _>(ApiError::not_found("gone"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(ref m) if m == "Resource Group \"rg\" was not found"));

        let err = lookup(&ctx, "Subscription \"s\"", async {
            Err::<(), _>(ApiError::status(500, "InternalError", "boom"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::Remote { .. }));
    }

    #[tokio::test]
    async fn test_refresh_clears_on_not_found() {
        let ctx = OperationContext::new(Duration::from_secs(5));
        let target = Target::new("P2S VPN Gateway", "rg", "gw");

        let found = refresh(&ctx, target, async { Ok::<_, ApiError>(1) }).await.unwrap();
        assert_eq!(found, Some(1));

        let gone = refresh(&ctx, target, async { Err::<i32, _>(ApiError::not_found("x")) })
            .await
            .unwrap();
        assert!(gone.is_none());

        let err = refresh(&ctx, target, async {
            Err::<i32, _>(ApiError::status(403, "AuthorizationFailed", "no"))
        })
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("Error making Read request on P2S VPN Gateway"));
    }
}
