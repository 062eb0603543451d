//! Orchestrates identity resolution, org mapping, workload lookup, IAM
//! bindings and principal annotations.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{Span, info, instrument, warn};
use workload_identity_sdk::{
    ApiKey, AuthorizationClient, IamCondition, IamPolicyClient, ObjectStoreClient,
    OperationOutcome, OutcomeReason,
};

use super::annotator::IdentityAnnotator;
use super::error::DomainError;
use super::iam_binding::{BindingTarget, IamBindingManager};
use super::identity::IdentityResolver;
use super::locator::WorkloadLocator;
use super::mapping_store::MappingStore;
use super::retry::RetryPolicy;
use crate::config::{GcpConfig, WorkloadIdentityConfig};

/// Capability clients the coordinator is built from.
#[derive(Clone)]
pub struct Capabilities {
    pub authorization: Arc<dyn AuthorizationClient>,
    pub objects: Arc<dyn ObjectStoreClient>,
    pub iam: Arc<dyn IamPolicyClient>,
}

/// Domain service behind [`WorkloadIdentityClient`](workload_identity_sdk::WorkloadIdentityClient).
///
/// Holds no per-request state; concurrent calls are safe as long as the
/// capability clients are.
pub struct BindingCoordinator {
    identity: IdentityResolver,
    mappings: MappingStore,
    locator: WorkloadLocator,
    iam: IamBindingManager,
    annotator: IdentityAnnotator,
    target: BindingTarget,
    gcp: GcpConfig,
    compute_namespace: String,
}

impl BindingCoordinator {
    pub fn new(config: &WorkloadIdentityConfig, capabilities: Capabilities) -> Self {
        let retry = RetryPolicy::new(&config.retry);
        let target = BindingTarget {
            role: config.gcp.role.clone(),
            condition: IamCondition {
                title: config.gcp.condition_title(),
                description: Some(config.gcp.condition_description.clone())
                    .filter(|d| !d.is_empty()),
                expression: config.gcp.condition_expression(),
            },
        };

        Self {
            identity: IdentityResolver::new(
                capabilities.authorization,
                config.admin_operation.clone(),
            ),
            mappings: MappingStore::new(
                capabilities.objects.clone(),
                config.platform_namespace.clone(),
                config.org_mapping_record.clone(),
                config.user_org_record.clone(),
                retry.clone(),
            ),
            locator: WorkloadLocator::new(capabilities.objects.clone(), config.labels.clone()),
            iam: IamBindingManager::new(capabilities.iam, retry),
            annotator: IdentityAnnotator::new(
                capabilities.objects,
                config.annotation_key.clone(),
            ),
            target,
            gcp: config.gcp.clone(),
            compute_namespace: config.compute_namespace.clone(),
        }
    }

    /// Bind the cloud service account of an org to the caller's workload.
    ///
    /// The org is `requested_org`, or the caller's stored default when none
    /// is given. A binding the workload held for another service account is
    /// unadvertised and revoked before the new one is granted, so the
    /// workload never holds two at once. A failure part way leaves the
    /// principal unannotated rather than pointing at a revoked account.
    ///
    /// # Errors
    ///
    /// Failures of remote systems. Expected refusals come back as outcomes.
    #[instrument(skip_all, fields(run_id = %run_id, org = ?requested_org, user_id = tracing::field::Empty))]
    pub async fn apply(
        &self,
        credential: &ApiKey,
        run_id: &str,
        requested_org: Option<&str>,
    ) -> Result<OperationOutcome, DomainError> {
        let identity = self.identity.resolve(credential).await?;
        Span::current().record("user_id", identity.user_id.as_str());

        let org = match requested_org.map(str::trim).filter(|o| !o.is_empty()) {
            Some(org) => org.to_owned(),
            None => match self.mappings.get_user_default_org(&identity.user_id).await? {
                Some(org) => org,
                None => {
                    return Ok(OperationOutcome::new(
                        OutcomeReason::NoOrg,
                        "no-op: no org requested and no default org stored",
                    ));
                }
            },
        };

        if !identity.is_member_of(&org) {
            return Ok(OperationOutcome::new(
                OutcomeReason::NotMember,
                format!("not a member of org {org}"),
            ));
        }

        let Some(cloud_sa) = self.mappings.get_org_sa(&org).await? else {
            return Ok(OperationOutcome::new(
                OutcomeReason::OrgNotMapped,
                format!("org not mapped: {org} has no cloud service account"),
            ));
        };

        let ns = self.compute_namespace.as_str();
        let Some(principal) = self
            .locator
            .find_principal_for_run(&identity.user_id, run_id, ns)
            .await?
        else {
            return Ok(OperationOutcome::new(
                OutcomeReason::WorkloadNotFound,
                format!("workload not found / not owned by caller (run {run_id})"),
            ));
        };

        let member = self.gcp.workload_member(ns, &principal);
        let previous = self.annotator.get_annotation(&principal, ns).await?;

        // The annotation must never name an account the member is not
        // granted on, so it is cleared before the old grant goes away.
        if let Some(prev) = previous.as_deref().filter(|p| *p != cloud_sa) {
            self.annotator.set_annotation(&principal, ns, None).await?;
            self.iam
                .remove_member(&self.gcp.service_account_resource(prev), &self.target, &member)
                .await?;
            info!(previous = %prev, "revoked previous cloud service account");
        }

        self.iam
            .add_member(
                &self.gcp.service_account_resource(&cloud_sa),
                &self.target,
                &member,
            )
            .await?;

        if previous.as_deref() != Some(cloud_sa.as_str()) {
            self.annotator
                .set_annotation(&principal, ns, Some(cloud_sa.as_str()))
                .await?;
        }

        if let Err(e) = self
            .mappings
            .set_user_default_org(&identity.user_id, &org)
            .await
        {
            warn!(error = %e, "failed to store default org; binding is in place");
        }

        info!(principal = %principal, cloud_sa = %cloud_sa, "cloud service account applied");
        Ok(OperationOutcome::new(
            OutcomeReason::Applied,
            format!("run {run_id} now uses cloud service account {cloud_sa} of org {org}"),
        ))
    }

    /// Revoke the cloud service account bound to the caller's workload.
    ///
    /// # Errors
    ///
    /// Failures of remote systems.
    #[instrument(skip_all, fields(run_id = %run_id, user_id = tracing::field::Empty))]
    pub async fn remove(
        &self,
        credential: &ApiKey,
        run_id: &str,
    ) -> Result<OperationOutcome, DomainError> {
        let identity = self.identity.resolve(credential).await?;
        Span::current().record("user_id", identity.user_id.as_str());

        let ns = self.compute_namespace.as_str();
        let Some(principal) = self
            .locator
            .find_principal_for_run(&identity.user_id, run_id, ns)
            .await?
        else {
            return Ok(OperationOutcome::new(
                OutcomeReason::WorkloadNotFound,
                format!("not found / not owner (run {run_id})"),
            ));
        };

        let Some(current) = self.annotator.get_annotation(&principal, ns).await? else {
            return Ok(OperationOutcome::new(
                OutcomeReason::NothingToRemove,
                format!("nothing to remove for run {run_id}"),
            ));
        };

        let member = self.gcp.workload_member(ns, &principal);
        self.iam
            .remove_member(
                &self.gcp.service_account_resource(&current),
                &self.target,
                &member,
            )
            .await?;
        self.annotator.set_annotation(&principal, ns, None).await?;

        info!(principal = %principal, cloud_sa = %current, "cloud service account removed");
        Ok(OperationOutcome::new(
            OutcomeReason::Removed,
            format!("cloud service account {current} removed from run {run_id}"),
        ))
    }

    /// The caller's orgs with their mapped cloud service account.
    ///
    /// # Errors
    ///
    /// Identity or mapping-store failures.
    #[instrument(skip_all)]
    pub async fn list_my_orgs(
        &self,
        credential: &ApiKey,
    ) -> Result<BTreeMap<String, Option<String>>, DomainError> {
        let identity = self.identity.resolve(credential).await?;
        let mapping = self.mappings.get_org_to_sa_map().await?;

        Ok(identity
            .orgs
            .into_iter()
            .map(|org| {
                let sa = mapping.get(&org).cloned();
                (org, sa)
            })
            .collect())
    }

    /// Map an org to a cloud service account. Administrators only.
    ///
    /// # Errors
    ///
    /// Identity or mapping-store failures.
    #[instrument(skip_all, fields(org = %org))]
    pub async fn map_org(
        &self,
        credential: &ApiKey,
        org: &str,
        cloud_sa: &str,
    ) -> Result<OperationOutcome, DomainError> {
        let identity = self.identity.resolve(credential).await?;
        if !identity.is_admin {
            warn!(user_id = %identity.user_id, "org mapping attempted without admin rights");
            return Ok(OperationOutcome::new(
                OutcomeReason::NotAuthorized,
                "not authorized: only administrators can map orgs",
            ));
        }

        let (org, cloud_sa) = (org.trim(), cloud_sa.trim());
        if org.is_empty() || cloud_sa.is_empty() {
            return Ok(OperationOutcome::new(
                OutcomeReason::InvalidRequest,
                "both org and cloud service account are required",
            ));
        }

        let (old, new) = self.mappings.upsert_org_mapping(org, cloud_sa).await?;
        Ok(OperationOutcome::new(
            OutcomeReason::Mapped,
            format!(
                "Org {org} mapping updated from {} to {new}",
                old.as_deref().unwrap_or("none")
            ),
        ))
    }

    /// The caller's stored default org, hidden once the caller has left it.
    ///
    /// # Errors
    ///
    /// Identity or mapping-store failures.
    #[instrument(skip_all)]
    pub async fn default_org(&self, credential: &ApiKey) -> Result<Option<String>, DomainError> {
        let identity = self.identity.resolve(credential).await?;
        let stored = self.mappings.get_user_default_org(&identity.user_id).await?;
        Ok(stored.filter(|org| identity.is_member_of(org)))
    }
}
