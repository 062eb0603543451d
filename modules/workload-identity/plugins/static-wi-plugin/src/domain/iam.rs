//! In-memory IAM policy store with etag checks.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use workload_identity_sdk::{IamPolicy, IamPolicyClient, IamPolicyError};

#[derive(Default)]
struct State {
    policies: HashMap<String, IamPolicy>,
    next_etag: u64,
    writes: usize,
}

impl State {
    fn bump(&mut self) -> String {
        self.next_etag += 1;
        format!("etag-{}", self.next_etag)
    }
}

/// IAM policy store keeping policies in process memory.
///
/// A resource nobody has written yet reads as an empty policy with the etag
/// `etag-0`.
#[derive(Default)]
pub struct InMemoryIamPolicyStore {
    state: Mutex<State>,
}

const INITIAL_ETAG: &str = "etag-0";

impl InMemoryIamPolicyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a policy, ignoring etag checks.
    pub fn seed_policy(&self, resource: impl Into<String>, mut policy: IamPolicy) {
        let mut state = self.state.lock();
        policy.etag = Some(state.bump());
        state.policies.insert(resource.into(), policy);
    }

    /// Number of successful policy writes.
    pub fn policy_writes(&self) -> usize {
        self.state.lock().writes
    }
}

#[async_trait]
impl IamPolicyClient for InMemoryIamPolicyStore {
    async fn get_policy(&self, resource: &str) -> Result<IamPolicy, IamPolicyError> {
        Ok(self
            .state
            .lock()
            .policies
            .get(resource)
            .cloned()
            .unwrap_or_else(|| IamPolicy {
                version: 1,
                etag: Some(INITIAL_ETAG.to_owned()),
                bindings: Vec::new(),
            }))
    }

    async fn set_policy(
        &self,
        resource: &str,
        mut policy: IamPolicy,
    ) -> Result<IamPolicy, IamPolicyError> {
        let mut state = self.state.lock();
        let current = state
            .policies
            .get(resource)
            .and_then(|p| p.etag.clone())
            .unwrap_or_else(|| INITIAL_ETAG.to_owned());

        if policy.etag.as_ref().is_some_and(|etag| *etag != current) {
            tracing::debug!(resource, "IAM policy etag mismatch");
            return Err(IamPolicyError::Conflict {
                resource: resource.to_owned(),
            });
        }

        policy.etag = Some(state.bump());
        state.policies.insert(resource.to_owned(), policy.clone());
        state.writes += 1;
        Ok(policy)
    }
}
