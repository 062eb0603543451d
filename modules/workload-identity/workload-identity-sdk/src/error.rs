//! Error types for the workload-identity module and its capabilities.

use thiserror::Error;

/// Errors returned by the public query operations.
///
/// Mutating operations fold failures into an
/// [`OperationOutcome`](crate::OperationOutcome) instead.
#[derive(Debug, Clone, Error)]
pub enum WorkloadIdentityError {
    /// The credential was rejected or could not be verified.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// A remote system could not be reached.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised by an [`AuthorizationClient`](crate::AuthorizationClient).
#[derive(Debug, Clone, Error)]
pub enum AuthorizationError {
    /// The authorization service could not be reached.
    #[error("authorization service unavailable: {0}")]
    Unavailable(String),

    /// The authorization service answered with a non-success status.
    #[error("credential rejected with status {status}")]
    Rejected {
        /// Status code reported by the authorization service.
        status: u16,
    },
}

/// Errors raised by an [`ObjectStoreClient`](crate::ObjectStoreClient).
#[derive(Debug, Clone, Error)]
pub enum ObjectStoreError {
    /// The addressed object does not exist.
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// A compare-and-swap write lost against a concurrent writer.
    #[error("{kind} {namespace}/{name} was modified concurrently")]
    Conflict {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// The object store could not be reached.
    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by an [`IamPolicyClient`](crate::IamPolicyClient).
#[derive(Debug, Clone, Error)]
pub enum IamPolicyError {
    /// The policy changed since it was read (etag mismatch).
    #[error("IAM policy of {resource} was modified concurrently")]
    Conflict { resource: String },

    /// The policy store could not be reached.
    #[error("IAM policy store unavailable: {0}")]
    Unavailable(String),
}
