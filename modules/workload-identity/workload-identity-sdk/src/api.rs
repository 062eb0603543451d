//! Public API trait for the workload-identity module.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::WorkloadIdentityError;
use crate::models::OperationOutcome;
use crate::secret::ApiKey;

/// Public API trait for the workload-identity module.
///
/// Consumed by the HTTP front end, which translates the outcome status into
/// transport-level success or failure:
///
/// ```ignore
/// let outcome = client.apply(&api_key, "run-abc", Some("org1")).await;
/// if outcome.ok {
///     // 200 with outcome.message
/// }
/// ```
///
/// Mutating operations never fail: every failure, including unreachable
/// backends, comes back as an outcome with `ok == false` and a message.
#[async_trait]
pub trait WorkloadIdentityClient: Send + Sync {
    /// Bind the cloud service account of `org` to the caller's workload for
    /// `run_id`.
    ///
    /// When `org` is `None` the caller's stored default org is used; with no
    /// default either, the call is a successful no-op. Any binding the
    /// workload already had is revoked first.
    async fn apply(&self, credential: &ApiKey, run_id: &str, org: Option<&str>)
    -> OperationOutcome;

    /// Revoke whatever cloud service account is bound to the caller's
    /// workload for `run_id`.
    async fn remove(&self, credential: &ApiKey, run_id: &str) -> OperationOutcome;

    /// Organizations of the caller with their mapped cloud service account
    /// (`None` when the org is not mapped).
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` if the credential cannot be resolved
    /// - `ServiceUnavailable` if the mapping store cannot be read
    async fn list_my_orgs(
        &self,
        credential: &ApiKey,
    ) -> Result<BTreeMap<String, Option<String>>, WorkloadIdentityError>;

    /// Map `org` to `cloud_sa`. Administrators only.
    async fn map_org(&self, credential: &ApiKey, org: &str, cloud_sa: &str) -> OperationOutcome;

    /// The caller's stored default org, if the caller is still a member.
    ///
    /// # Errors
    ///
    /// Same as [`list_my_orgs`](Self::list_my_orgs).
    async fn default_org(&self, credential: &ApiKey)
    -> Result<Option<String>, WorkloadIdentityError>;
}
