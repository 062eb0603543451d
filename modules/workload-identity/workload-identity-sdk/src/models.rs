//! Public models for the workload-identity module.
//!
//! Identity, configuration-record, workload and IAM policy types shared by
//! the module, its consumers and capability implementations. IAM policy
//! types mirror the cloud policy document and carry serde derives so that
//! adapters can (de)serialize them directly.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Identity of a caller as seen by the authorization service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Canonical user id.
    pub user_id: String,
    /// Names of the organizations the user belongs to.
    pub orgs: BTreeSet<String>,
    /// Whether the user holds the administrative operation.
    pub is_admin: bool,
}

impl ResolvedIdentity {
    #[must_use]
    pub fn is_member_of(&self, org: &str) -> bool {
        self.orgs.contains(org)
    }
}

/// Principal returned by the authorization service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrincipalInfo {
    pub canonical_id: String,
    pub allowed_operations: Vec<String>,
}

/// Organization returned by the authorization service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub name: String,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A named key/value configuration record (configmap-equivalent).
///
/// `resource_version` is the optimistic-concurrency token. A record read
/// from the store always carries one; a record with `None` is new and may
/// only be created if the name is still free.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigRecord {
    pub data: BTreeMap<String, String>,
    pub resource_version: Option<String>,
}

impl ConfigRecord {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

/// Equality-based label selector. A workload matches when every entry is
/// present on it with the same value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }
}

/// A running compute job (pod-equivalent).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkloadObject {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    /// Name of the service-account principal attached to the workload.
    pub service_account: Option<String>,
}

/// A service-account-like object that carries annotations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnotatedObject {
    pub name: String,
    pub namespace: String,
    pub annotations: BTreeMap<String, String>,
    pub resource_version: Option<String>,
}

/// IAM policy document of a single cloud resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamPolicy {
    #[serde(default)]
    pub version: i32,
    /// Optimistic-concurrency token returned by the policy store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub bindings: Vec<IamBinding>,
}

/// A role grant inside an [`IamPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamBinding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<IamCondition>,
}

/// Condition attached to a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamCondition {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub expression: String,
}

/// Why an operation ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeReason {
    /// The cloud identity is now bound to the workload.
    Applied,
    /// No org was requested and the user has no stored default.
    NoOrg,
    /// The caller is not a member of the requested org.
    NotMember,
    /// The org has no cloud service account mapped.
    OrgNotMapped,
    /// No workload for the run is owned by the caller.
    WorkloadNotFound,
    /// The binding was revoked.
    Removed,
    /// The workload carries no binding.
    NothingToRemove,
    /// The org mapping was stored.
    Mapped,
    /// The request payload was incomplete.
    InvalidRequest,
    /// Credential rejection, unreachable authorization service, or missing
    /// admin privilege.
    NotAuthorized,
    /// A remote system could not be reached.
    Unavailable,
    /// Concurrent writers kept winning until retries ran out.
    Conflict,
}

impl OutcomeReason {
    /// Whether this reason represents a successful operation.
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(
            self,
            Self::Applied | Self::NoOrg | Self::Removed | Self::Mapped
        )
    }
}

/// Status plus message returned by every mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub ok: bool,
    pub reason: OutcomeReason,
    pub message: String,
}

impl OperationOutcome {
    pub fn new(reason: OutcomeReason, message: impl Into<String>) -> Self {
        Self {
            ok: reason.is_ok(),
            reason,
            message: message.into(),
        }
    }
}
