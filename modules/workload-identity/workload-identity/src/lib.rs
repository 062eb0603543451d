#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![allow(clippy::must_use_candidate)]

//! Workload Identity Module Implementation
//!
//! Lets platform users bind a cloud service account, chosen per
//! organization, to the compute workloads they start. A binding consists
//! of a cluster-scoped conditional IAM grant on the cloud service account
//! plus an annotation on the workload's service-account principal.
//!
//! ## Architecture
//!
//! ```text
//!            HTTP front end
//!                  │
//!                  ▼ dyn WorkloadIdentityClient
//! ┌──────────────────────────────────────┐
//! │        BindingCoordinator            │
//! │  IdentityResolver   MappingStore     │
//! │  WorkloadLocator    IamBindingManager│
//! │  IdentityAnnotator                   │
//! └──────────────────────────────────────┘
//!        │               │            │
//!        ▼               ▼            ▼
//!  AuthorizationClient  ObjectStore  IamPolicyClient
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let client = workload_identity::build_client(&config, capabilities)?;
//! let outcome = client.apply(&api_key, "run-abc", Some("org1")).await;
//! ```

use std::sync::Arc;

// === PUBLIC API (from SDK) ===
pub use workload_identity_sdk::{
    AnnotatedObject, ApiKey, AuthorizationClient, AuthorizationError, ConfigRecord, IamBinding,
    IamCondition, IamPolicy, IamPolicyClient, IamPolicyError, LabelSelector, ObjectStoreClient,
    ObjectStoreError, OperationOutcome, Organization, OutcomeReason, PrincipalInfo,
    ResolvedIdentity, WorkloadIdentityClient, WorkloadIdentityError, WorkloadObject,
};

pub mod config;
pub mod domain;
pub(crate) mod humantime_serde;


pub use config::{ConfigError, WorkloadIdentityConfig};
pub use domain::{BindingCoordinator, Capabilities, DomainError, WorkloadIdentityLocalClient};

/// Validate `config` and wire the coordinator behind the public client
/// trait.
///
/// # Errors
///
/// Returns [`ConfigError`] when a required setting is missing.
pub fn build_client(
    config: &WorkloadIdentityConfig,
    capabilities: Capabilities,
) -> Result<Arc<dyn WorkloadIdentityClient>, ConfigError> {
    config.validate()?;
    tracing::info!(
        project_id = %config.gcp.project_id,
        cluster_id = %config.gcp.cluster_id,
        compute_namespace = %config.compute_namespace,
        "workload-identity client initialized"
    );
    let coordinator = Arc::new(BindingCoordinator::new(config, capabilities));
    Ok(Arc::new(WorkloadIdentityLocalClient::new(coordinator)))
}
