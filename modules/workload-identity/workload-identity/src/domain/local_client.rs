//! Local client adapter implementing the SDK API trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use workload_identity_sdk::{ApiKey, OperationOutcome, WorkloadIdentityClient, WorkloadIdentityError};

use super::coordinator::BindingCoordinator;
use super::error::DomainError;

/// Local client adapter implementing the SDK API trait.
///
/// Mutating operations fold every domain error into a failed outcome.
pub struct WorkloadIdentityLocalClient {
    coordinator: Arc<BindingCoordinator>,
}

impl WorkloadIdentityLocalClient {
    pub fn new(coordinator: Arc<BindingCoordinator>) -> Self {
        Self { coordinator }
    }
}

fn log_and_fold(operation: &str, e: DomainError) -> OperationOutcome {
    if e.is_auth() {
        tracing::warn!(operation, error = %e, "caller could not be authorized");
    } else {
        tracing::error!(operation, error = ?e, "workload-identity call failed");
    }
    e.into_outcome()
}

fn log_and_convert(operation: &str, e: DomainError) -> WorkloadIdentityError {
    if e.is_auth() {
        tracing::warn!(operation, error = %e, "caller could not be authorized");
    } else {
        tracing::error!(operation, error = ?e, "workload-identity call failed");
    }
    e.into()
}

#[async_trait]
impl WorkloadIdentityClient for WorkloadIdentityLocalClient {
    async fn apply(
        &self,
        credential: &ApiKey,
        run_id: &str,
        org: Option<&str>,
    ) -> OperationOutcome {
        self.coordinator
            .apply(credential, run_id, org)
            .await
            .unwrap_or_else(|e| log_and_fold("apply", e))
    }

    async fn remove(&self, credential: &ApiKey, run_id: &str) -> OperationOutcome {
        self.coordinator
            .remove(credential, run_id)
            .await
            .unwrap_or_else(|e| log_and_fold("remove", e))
    }

    async fn list_my_orgs(
        &self,
        credential: &ApiKey,
    ) -> Result<BTreeMap<String, Option<String>>, WorkloadIdentityError> {
        self.coordinator
            .list_my_orgs(credential)
            .await
            .map_err(|e| log_and_convert("list_my_orgs", e))
    }

    async fn map_org(&self, credential: &ApiKey, org: &str, cloud_sa: &str) -> OperationOutcome {
        self.coordinator
            .map_org(credential, org, cloud_sa)
            .await
            .unwrap_or_else(|e| log_and_fold("map_org", e))
    }

    async fn default_org(
        &self,
        credential: &ApiKey,
    ) -> Result<Option<String>, WorkloadIdentityError> {
        self.coordinator
            .default_org(credential)
            .await
            .map_err(|e| log_and_convert("default_org", e))
    }
}
