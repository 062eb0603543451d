//! Turns an API credential into a [`ResolvedIdentity`].

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;
use workload_identity_sdk::{ApiKey, AuthorizationClient, ResolvedIdentity};

use super::error::DomainError;

/// Resolves callers against the authorization service.
///
/// Fails closed: an empty credential, an unreachable service, a rejected
/// credential, or a principal without a canonical id all yield an error and
/// never an identity.
pub struct IdentityResolver {
    client: Arc<dyn AuthorizationClient>,
    admin_operation: String,
}

impl IdentityResolver {
    pub fn new(client: Arc<dyn AuthorizationClient>, admin_operation: impl Into<String>) -> Self {
        Self {
            client,
            admin_operation: admin_operation.into(),
        }
    }

    /// # Errors
    ///
    /// - [`DomainError::AuthRejected`] for a missing or rejected credential
    /// - [`DomainError::AuthUnavailable`] if the service cannot be reached
    pub async fn resolve(&self, credential: &ApiKey) -> Result<ResolvedIdentity, DomainError> {
        if credential.is_empty() {
            return Err(DomainError::AuthRejected("no credential supplied".to_owned()));
        }

        let (principal, organizations) = tokio::try_join!(
            self.client.principal(credential),
            self.client.organizations(credential),
        )?;

        if principal.canonical_id.trim().is_empty() {
            return Err(DomainError::AuthRejected(
                "principal has no canonical id".to_owned(),
            ));
        }

        let is_admin = principal
            .allowed_operations
            .iter()
            .any(|op| *op == self.admin_operation);
        let orgs: BTreeSet<String> = organizations.into_iter().map(|o| o.name).collect();

        debug!(
            user_id = %principal.canonical_id,
            org_count = orgs.len(),
            is_admin,
            "resolved caller identity"
        );

        Ok(ResolvedIdentity {
            user_id: principal.canonical_id,
            orgs,
            is_admin,
        })
    }
}
