#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Workload Identity SDK
//!
//! This crate provides the public API for the `workload-identity` module:
//!
//! - [`WorkloadIdentityClient`] - Public API trait for consumers
//! - [`AuthorizationClient`], [`ObjectStoreClient`], [`IamPolicyClient`] -
//!   Capability traits the module consumes
//! - [`IamPolicy`], [`ConfigRecord`], [`WorkloadObject`], ... - Models
//! - [`WorkloadIdentityError`] and per-capability error types
//! - [`ApiKey`] - Redacting, zeroizing credential wrapper
//!
//! ## Usage
//!
//! ```ignore
//! use workload_identity_sdk::{ApiKey, WorkloadIdentityClient};
//!
//! let key = ApiKey::new(header_value);
//! let outcome = client.apply(&key, run_id, Some("org1")).await;
//! let orgs = client.list_my_orgs(&key).await?;
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod plugin_api;
pub mod secret;

pub use api::WorkloadIdentityClient;
pub use error::{AuthorizationError, IamPolicyError, ObjectStoreError, WorkloadIdentityError};
pub use models::{
    AnnotatedObject, ConfigRecord, IamBinding, IamCondition, IamPolicy, LabelSelector,
    OperationOutcome, Organization, OutcomeReason, PrincipalInfo, ResolvedIdentity,
    WorkloadObject,
};
pub use plugin_api::{AuthorizationClient, IamPolicyClient, ObjectStoreClient};
pub use secret::ApiKey;
