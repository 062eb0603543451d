//! Finds the service-account principal of a caller's run.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};
use workload_identity_sdk::{LabelSelector, ObjectStoreClient, ObjectStoreError};

use super::error::DomainError;
use crate::config::WorkloadLabels;

pub struct WorkloadLocator {
    store: Arc<dyn ObjectStoreClient>,
    labels: WorkloadLabels,
}

impl WorkloadLocator {
    pub fn new(store: Arc<dyn ObjectStoreClient>, labels: WorkloadLabels) -> Self {
        Self { store, labels }
    }

    /// Principal name of the workload labelled with both `run_id` and
    /// `owner_user_id`.
    ///
    /// Returns `None` when no workload matches, when the match has no
    /// principal, or when matches disagree on the principal. Ownership comes
    /// from the labels only, so a run started by someone else is never
    /// found.
    ///
    /// # Errors
    ///
    /// [`DomainError::LocatorUnavailable`] if workloads cannot be listed.
    pub async fn find_principal_for_run(
        &self,
        owner_user_id: &str,
        run_id: &str,
        namespace: &str,
    ) -> Result<Option<String>, DomainError> {
        if owner_user_id.is_empty() || run_id.is_empty() {
            return Ok(None);
        }

        let selector = LabelSelector::new()
            .with_label(&self.labels.execution_id, run_id)
            .with_label(&self.labels.starting_user_id, owner_user_id);

        let workloads = self
            .store
            .list_workloads(namespace, &selector)
            .await
            .map_err(|e| match e {
                ObjectStoreError::Unavailable(msg) => DomainError::LocatorUnavailable(msg),
                other => DomainError::LocatorUnavailable(other.to_string()),
            })?;

        // Selector support differs between stores; recheck locally.
        let principals: BTreeSet<String> = workloads
            .into_iter()
            .filter(|w| w.namespace == namespace && selector.matches(&w.labels))
            .filter_map(|w| w.service_account.filter(|sa| !sa.is_empty()))
            .collect();

        let mut iter = principals.into_iter();
        match (iter.next(), iter.next()) {
            (None, _) => {
                debug!(run_id, "no workload owned by caller");
                Ok(None)
            }
            (Some(principal), None) => Ok(Some(principal)),
            (Some(first), Some(second)) => {
                warn!(
                    run_id,
                    first = %first,
                    second = %second,
                    "workloads of one run use different principals, refusing to pick one"
                );
                Ok(None)
            }
        }
    }
}
