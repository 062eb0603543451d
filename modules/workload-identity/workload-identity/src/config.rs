//! Configuration for the workload-identity module.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Module configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadIdentityConfig {
    /// Namespace holding the org mapping and user default-org records.
    pub platform_namespace: String,

    /// Namespace where workloads and their principals live.
    pub compute_namespace: String,

    /// Name of the org -> cloud service account record.
    pub org_mapping_record: String,

    /// Name of the user id -> last used org record.
    pub user_org_record: String,

    /// Workload labels used to locate a run.
    pub labels: WorkloadLabels,

    /// Annotation advertising the bound cloud service account on a principal.
    pub annotation_key: String,

    /// Allowed operation that marks a principal as administrator.
    pub admin_operation: String,

    /// Cloud project and cluster the bindings are scoped to.
    pub gcp: GcpConfig,

    /// Retry policy for read-modify-write cycles.
    pub retry: RetryConfig,
}

impl Default for WorkloadIdentityConfig {
    fn default() -> Self {
        Self {
            platform_namespace: "domino-platform".to_owned(),
            compute_namespace: "domino-compute".to_owned(),
            org_mapping_record: "domino-org-gcp-svc-account-mapping".to_owned(),
            user_org_record: "domino-user-current-org-mapping".to_owned(),
            labels: WorkloadLabels::default(),
            annotation_key: "iam.gke.io/gcp-service-account".to_owned(),
            admin_operation: "ActAsProjectAdmin".to_owned(),
            gcp: GcpConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Label keys identifying a run's workload and the user who started it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadLabels {
    pub execution_id: String,
    pub starting_user_id: String,
}

impl Default for WorkloadLabels {
    fn default() -> Self {
        Self {
            execution_id: "dominodatalab.com/execution-id".to_owned(),
            starting_user_id: "dominodatalab.com/starting-user-id".to_owned(),
        }
    }
}

/// Cloud project, cluster and binding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GcpConfig {
    pub project_id: String,
    pub location: String,
    pub cluster_id: String,

    /// Role granted to workload principals.
    pub role: String,

    /// Title of the cluster-scoped condition. Defaults to
    /// `single-cluster-acl-<cluster_id>`.
    pub condition_title: Option<String>,

    pub condition_description: String,
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            location: String::new(),
            cluster_id: String::new(),
            role: "roles/iam.workloadIdentityUser".to_owned(),
            condition_title: None,
            condition_description: "single-cluster-acl".to_owned(),
        }
    }
}

impl GcpConfig {
    /// OIDC issuer of the cluster, as seen in workload tokens.
    #[must_use]
    pub fn provider_id(&self) -> String {
        format!(
            "https://container.googleapis.com/v1/projects/{}/locations/{}/clusters/{}",
            self.project_id, self.location, self.cluster_id
        )
    }

    /// Condition expression restricting a binding to this cluster.
    #[must_use]
    pub fn condition_expression(&self) -> String {
        format!(
            "request.auth.claims.google.providerId=='{}'",
            self.provider_id()
        )
    }

    #[must_use]
    pub fn condition_title(&self) -> String {
        self.condition_title
            .clone()
            .unwrap_or_else(|| format!("single-cluster-acl-{}", self.cluster_id))
    }

    /// IAM resource name of a cloud service account.
    #[must_use]
    pub fn service_account_resource(&self, cloud_sa: &str) -> String {
        format!("projects/{}/serviceAccounts/{cloud_sa}", self.project_id)
    }

    /// IAM member string of a workload principal.
    #[must_use]
    pub fn workload_member(&self, namespace: &str, principal: &str) -> String {
        format!(
            "serviceAccount:{}.svc.id.goog[{namespace}/{principal}]",
            self.project_id
        )
    }
}

/// Bounded retry around optimistic read-modify-write cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Exponential backoff: `min(initial * multiplier^attempt, max)` plus
/// optional 0-25% jitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffConfig {
    #[serde(with = "crate::humantime_serde")]
    pub initial: Duration,
    #[serde(with = "crate::humantime_serde")]
    pub max: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(50),
            max: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    /// Backoff for tests (1ms initial, 10ms max, no jitter).
    #[must_use]
    pub fn fast() -> Self {
        Self {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(10),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config field '{0}' must not be empty")]
    Empty(&'static str),

    #[error("retry.max_attempts must be at least 1")]
    NoAttempts,
}

impl WorkloadIdentityConfig {
    /// Check the values a deployment cannot work without.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("platform_namespace", &self.platform_namespace),
            ("compute_namespace", &self.compute_namespace),
            ("org_mapping_record", &self.org_mapping_record),
            ("user_org_record", &self.user_org_record),
            ("annotation_key", &self.annotation_key),
            ("gcp.project_id", &self.gcp.project_id),
            ("gcp.location", &self.gcp.location),
            ("gcp.cluster_id", &self.gcp.cluster_id),
            ("gcp.role", &self.gcp.role),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::Empty(*field));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(())
    }
}
