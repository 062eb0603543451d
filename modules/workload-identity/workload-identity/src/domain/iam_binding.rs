//! Conditional role bindings on cloud service account IAM policies.
//!
//! The manager owns exactly one binding per policy, identified by role and
//! condition title. Other bindings, including unconditional ones with the
//! same role, are never touched.

use std::sync::Arc;

use tracing::{debug, info};
use workload_identity_sdk::{
    IamBinding, IamCondition, IamPolicy, IamPolicyClient, IamPolicyError,
};

use super::error::DomainError;
use super::retry::RetryPolicy;

/// Conditional policies require version 3.
pub const CONDITIONAL_POLICY_VERSION: i32 = 3;

/// The binding this module manages inside each policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTarget {
    pub role: String,
    pub condition: IamCondition,
}

impl BindingTarget {
    fn is(&self, binding: &IamBinding) -> bool {
        binding.role == self.role
            && binding
                .condition
                .as_ref()
                .is_some_and(|c| c.title == self.condition.title)
    }
}

/// Make `member` part of the target binding, creating the binding or
/// rewriting a drifted condition as needed.
///
/// Returns whether the policy changed.
pub fn add_member_to_policy(policy: &mut IamPolicy, target: &BindingTarget, member: &str) -> bool {
    let changed = match policy.bindings.iter_mut().find(|b| target.is(b)) {
        Some(binding) => {
            let mut changed = false;
            if binding.condition.as_ref() != Some(&target.condition) {
                binding.condition = Some(target.condition.clone());
                changed = true;
            }
            if !binding.members.iter().any(|m| m == member) {
                binding.members.push(member.to_owned());
                changed = true;
            }
            changed
        }
        None => {
            policy.bindings.push(IamBinding {
                role: target.role.clone(),
                members: vec![member.to_owned()],
                condition: Some(target.condition.clone()),
            });
            true
        }
    };
    if changed && policy.version < CONDITIONAL_POLICY_VERSION {
        policy.version = CONDITIONAL_POLICY_VERSION;
    }
    changed
}

/// Drop `member` from the target binding. A binding left without members is
/// removed.
///
/// Returns whether the policy changed.
pub fn remove_member_from_policy(
    policy: &mut IamPolicy,
    target: &BindingTarget,
    member: &str,
) -> bool {
    let Some(index) = policy.bindings.iter().position(|b| target.is(b)) else {
        return false;
    };
    let binding = &mut policy.bindings[index];
    let before = binding.members.len();
    binding.members.retain(|m| m != member);
    if binding.members.len() == before {
        return false;
    }
    if binding.members.is_empty() {
        policy.bindings.remove(index);
    }
    true
}

/// Read-modify-write of cloud IAM policies under etag concurrency control.
pub struct IamBindingManager {
    client: Arc<dyn IamPolicyClient>,
    retry: RetryPolicy,
}

impl IamBindingManager {
    pub fn new(client: Arc<dyn IamPolicyClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Grant `member` the target role on `resource`. Idempotent; nothing is
    /// written when the member is already present with the right condition.
    ///
    /// # Errors
    ///
    /// [`DomainError::IamConflict`] or [`DomainError::IamUnavailable`] once
    /// the retry budget is spent.
    #[tracing::instrument(skip_all, fields(resource = %resource, member = %member))]
    pub async fn add_member(
        &self,
        resource: &str,
        target: &BindingTarget,
        member: &str,
    ) -> Result<(), DomainError> {
        self.retry
            .run("iam.add_member", || async move {
                let mut policy = self.get(resource).await?;
                if !add_member_to_policy(&mut policy, target, member) {
                    debug!("member already bound");
                    return Ok(());
                }
                self.set(resource, policy).await?;
                info!("member bound");
                Ok(())
            })
            .await
    }

    /// Revoke the target role from `member` on `resource`. Idempotent.
    ///
    /// # Errors
    ///
    /// Same as [`add_member`](Self::add_member).
    #[tracing::instrument(skip_all, fields(resource = %resource, member = %member))]
    pub async fn remove_member(
        &self,
        resource: &str,
        target: &BindingTarget,
        member: &str,
    ) -> Result<(), DomainError> {
        self.retry
            .run("iam.remove_member", || async move {
                let mut policy = self.get(resource).await?;
                if !remove_member_from_policy(&mut policy, target, member) {
                    debug!("member not bound");
                    return Ok(());
                }
                self.set(resource, policy).await?;
                info!("member unbound");
                Ok(())
            })
            .await
    }

    async fn get(&self, resource: &str) -> Result<IamPolicy, DomainError> {
        self.client
            .get_policy(resource)
            .await
            .map_err(iam_error)
    }

    async fn set(&self, resource: &str, policy: IamPolicy) -> Result<IamPolicy, DomainError> {
        self.client
            .set_policy(resource, policy)
            .await
            .map_err(iam_error)
    }
}

fn iam_error(e: IamPolicyError) -> DomainError {
    match e {
        IamPolicyError::Conflict { resource } => DomainError::IamConflict { resource },
        IamPolicyError::Unavailable(msg) => DomainError::IamUnavailable(msg),
    }
}
