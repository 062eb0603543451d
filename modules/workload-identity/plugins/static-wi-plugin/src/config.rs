//! Configuration for the static workload-identity plugin.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use workload_identity_sdk::IamPolicy;

/// Seed data for the in-memory capability implementations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticWiPluginConfig {
    /// Users known to the authorization client, keyed by API key.
    pub users: Vec<UserConfig>,

    pub workloads: Vec<WorkloadConfig>,

    pub principals: Vec<PrincipalConfig>,

    /// Config records present at start-up.
    pub records: Vec<RecordConfig>,

    /// IAM policies present at start-up.
    pub policies: Vec<PolicyConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub api_key: String,
    pub user_id: String,
    #[serde(default)]
    pub orgs: Vec<String>,
    #[serde(default)]
    pub allowed_operations: Vec<String>,
}

/// `Debug` redacts `api_key` so a logged plugin config leaks no credential.
impl fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserConfig")
            .field("api_key", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("orgs", &self.orgs)
            .field("allowed_operations", &self.allowed_operations)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadConfig {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub service_account: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrincipalConfig {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordConfig {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub resource: String,
    pub policy: IamPolicy,
}
