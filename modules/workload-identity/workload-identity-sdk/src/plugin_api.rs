//! Capability traits consumed by the workload-identity module.
//!
//! The module never talks to the authorization service, the object store
//! or the cloud IAM API directly. Hosts construct one implementation of
//! each trait at process start and hand them to the module; the static
//! plugin provides in-memory implementations.

use async_trait::async_trait;

use crate::error::{AuthorizationError, IamPolicyError, ObjectStoreError};
use crate::models::{
    AnnotatedObject, ConfigRecord, IamPolicy, LabelSelector, Organization, PrincipalInfo,
    WorkloadObject,
};
use crate::secret::ApiKey;

/// Client of the external authorization service.
#[async_trait]
pub trait AuthorizationClient: Send + Sync {
    /// Resolve the principal behind `credential`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the service cannot be reached
    /// - `Rejected` if the service answers with a non-success status
    async fn principal(&self, credential: &ApiKey) -> Result<PrincipalInfo, AuthorizationError>;

    /// List the organizations the principal behind `credential` belongs to.
    ///
    /// # Errors
    ///
    /// Same as [`principal`](Self::principal).
    async fn organizations(
        &self,
        credential: &ApiKey,
    ) -> Result<Vec<Organization>, AuthorizationError>;
}

/// Client of the object store holding config records, workloads and
/// service-account principals.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Read a config record. Returns `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// `Unavailable` on transport failure.
    async fn get_config_record(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigRecord>, ObjectStoreError>;

    /// Write a config record with compare-and-swap semantics.
    ///
    /// With `resource_version: None` the record is created and the call
    /// fails with `Conflict` if it already exists. With `Some(v)` the
    /// record is replaced only if its current version is `v`.
    ///
    /// Returns the stored record carrying its new version.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the version precondition does not hold
    /// - `NotFound` if a version was given but the record is gone
    /// - `Unavailable` on transport failure
    async fn put_config_record(
        &self,
        namespace: &str,
        name: &str,
        record: ConfigRecord,
    ) -> Result<ConfigRecord, ObjectStoreError>;

    /// List workloads in `namespace` whose labels match `selector`.
    ///
    /// # Errors
    ///
    /// `Unavailable` on transport failure.
    async fn list_workloads(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<WorkloadObject>, ObjectStoreError>;

    /// Read a service-account principal. Returns `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// `Unavailable` on transport failure.
    async fn get_principal(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<AnnotatedObject>, ObjectStoreError>;

    /// Set (`Some`) or delete (`None`) a single annotation on a principal.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the principal does not exist
    /// - `Unavailable` on transport failure
    async fn patch_principal_annotation(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<(), ObjectStoreError>;
}

/// Client of the cloud IAM policy API.
#[async_trait]
pub trait IamPolicyClient: Send + Sync {
    /// Read the policy of `resource`, including its etag.
    ///
    /// # Errors
    ///
    /// `Unavailable` on transport failure.
    async fn get_policy(&self, resource: &str) -> Result<IamPolicy, IamPolicyError>;

    /// Replace the policy of `resource`.
    ///
    /// When `policy.etag` is set the write only succeeds if it still matches
    /// the stored policy. Returns the stored policy with its new etag.
    ///
    /// # Errors
    ///
    /// - `Conflict` on etag mismatch
    /// - `Unavailable` on transport failure
    async fn set_policy(&self, resource: &str, policy: IamPolicy)
    -> Result<IamPolicy, IamPolicyError>;
}
