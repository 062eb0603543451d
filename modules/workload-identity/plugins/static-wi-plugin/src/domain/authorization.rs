//! Authorization client backed by a fixed API key table.

use std::collections::HashMap;

use async_trait::async_trait;
use workload_identity_sdk::{
    ApiKey, AuthorizationClient, AuthorizationError, Organization, PrincipalInfo,
};

use crate::config::UserConfig;

/// Unauthorized status returned for unknown keys.
const UNAUTHORIZED: u16 = 401;

/// Answers principal and organization lookups from configured users.
/// Unknown API keys are rejected with status 401.
pub struct StaticAuthorizationClient {
    users: HashMap<String, UserConfig>,
}

impl StaticAuthorizationClient {
    #[must_use]
    pub fn new(users: impl IntoIterator<Item = UserConfig>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|u| (u.api_key.clone(), u))
                .collect(),
        }
    }

    fn lookup(&self, credential: &ApiKey) -> Result<&UserConfig, AuthorizationError> {
        self.users
            .get(credential.expose())
            .ok_or(AuthorizationError::Rejected {
                status: UNAUTHORIZED,
            })
    }
}

#[async_trait]
impl AuthorizationClient for StaticAuthorizationClient {
    async fn principal(&self, credential: &ApiKey) -> Result<PrincipalInfo, AuthorizationError> {
        let user = self.lookup(credential)?;
        Ok(PrincipalInfo {
            canonical_id: user.user_id.clone(),
            allowed_operations: user.allowed_operations.clone(),
        })
    }

    async fn organizations(
        &self,
        credential: &ApiKey,
    ) -> Result<Vec<Organization>, AuthorizationError> {
        let user = self.lookup(credential)?;
        Ok(user.orgs.iter().map(Organization::new).collect())
    }
}
