use std::sync::Arc;

use workload_identity_sdk::{AnnotatedObject, WorkloadObject};

use crate::config::StaticWiPluginConfig;
use crate::domain::{InMemoryIamPolicyStore, InMemoryObjectStore, StaticAuthorizationClient};

/// The three capability implementations, seeded from one config.
#[derive(Clone)]
pub struct StaticWiPlugin {
    pub authorization: Arc<StaticAuthorizationClient>,
    pub objects: Arc<InMemoryObjectStore>,
    pub iam: Arc<InMemoryIamPolicyStore>,
}

impl StaticWiPlugin {
    #[must_use]
    pub fn from_config(config: StaticWiPluginConfig) -> Self {
        let objects = InMemoryObjectStore::new();
        for w in config.workloads {
            objects.insert_workload(WorkloadObject {
                name: w.name,
                namespace: w.namespace,
                labels: w.labels,
                service_account: w.service_account,
            });
        }
        for p in config.principals {
            objects.insert_principal(AnnotatedObject {
                name: p.name,
                namespace: p.namespace,
                annotations: p.annotations,
                resource_version: None,
            });
        }
        for r in config.records {
            objects.seed_record(&r.namespace, &r.name, r.data);
        }

        let iam = InMemoryIamPolicyStore::new();
        for p in config.policies {
            iam.seed_policy(p.resource, p.policy);
        }

        tracing::info!(
            users = config.users.len(),
            "static workload-identity plugin initialized"
        );

        Self {
            authorization: Arc::new(StaticAuthorizationClient::new(config.users)),
            objects: Arc::new(objects),
            iam: Arc::new(iam),
        }
    }
}
