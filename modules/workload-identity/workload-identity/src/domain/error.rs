//! Domain errors for the workload-identity module.

use thiserror::Error;
use workload_identity_sdk::{
    AuthorizationError, OperationOutcome, OutcomeReason, WorkloadIdentityError,
};

/// Failures of the remote systems the coordinator talks to.
///
/// Expected negative results ("not a member", "nothing to remove", ...) are
/// not errors; they are returned as [`OperationOutcome`]s.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("authorization service unavailable: {0}")]
    AuthUnavailable(String),

    #[error("credential rejected: {0}")]
    AuthRejected(String),

    #[error("mapping store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("mapping record {name} was modified concurrently")]
    StoreConflict { name: String },

    #[error("workload lookup failed: {0}")]
    LocatorUnavailable(String),

    #[error("IAM policy store unavailable: {0}")]
    IamUnavailable(String),

    #[error("IAM policy of {resource} was modified concurrently")]
    IamConflict { resource: String },

    #[error("annotation update failed: {0}")]
    AnnotatorUnavailable(String),

    #[error("principal {namespace}/{name} not found")]
    AnnotationTargetNotFound { namespace: String, name: String },
}

impl DomainError {
    /// Whether a read-modify-write cycle that failed with this error should
    /// be attempted again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreConflict { .. }
                | Self::IamConflict { .. }
                | Self::StoreUnavailable(_)
                | Self::IamUnavailable(_)
        )
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthUnavailable(_) | Self::AuthRejected(_))
    }

    /// Fold the error into a failed outcome, keeping its message.
    #[must_use]
    pub fn into_outcome(self) -> OperationOutcome {
        let reason = match &self {
            Self::AuthUnavailable(_) | Self::AuthRejected(_) => OutcomeReason::NotAuthorized,
            Self::StoreUnavailable(_)
            | Self::LocatorUnavailable(_)
            | Self::IamUnavailable(_)
            | Self::AnnotatorUnavailable(_) => OutcomeReason::Unavailable,
            Self::StoreConflict { .. } | Self::IamConflict { .. } => OutcomeReason::Conflict,
            Self::AnnotationTargetNotFound { .. } => OutcomeReason::WorkloadNotFound,
        };
        let message = if self.is_auth() {
            format!("not authorized: {self}")
        } else {
            self.to_string()
        };
        OperationOutcome::new(reason, message)
    }
}

impl From<AuthorizationError> for DomainError {
    fn from(e: AuthorizationError) -> Self {
        match e {
            AuthorizationError::Unavailable(msg) => Self::AuthUnavailable(msg),
            AuthorizationError::Rejected { status } => {
                Self::AuthRejected(format!("authorization service answered {status}"))
            }
        }
    }
}

impl From<DomainError> for WorkloadIdentityError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::AuthUnavailable(_) | DomainError::AuthRejected(_) => {
                Self::NotAuthorized(e.to_string())
            }
            DomainError::StoreUnavailable(_)
            | DomainError::LocatorUnavailable(_)
            | DomainError::IamUnavailable(_)
            | DomainError::AnnotatorUnavailable(_) => Self::ServiceUnavailable(e.to_string()),
            DomainError::StoreConflict { .. }
            | DomainError::IamConflict { .. }
            | DomainError::AnnotationTargetNotFound { .. } => Self::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_fold_to_not_authorized() {
        let outcome = DomainError::from(AuthorizationError::Rejected { status: 401 }).into_outcome();
        assert!(!outcome.ok);
        assert_eq!(outcome.reason, OutcomeReason::NotAuthorized);
        assert!(outcome.message.starts_with("not authorized"));
        assert!(outcome.message.contains("401"));
    }

    #[test]
    fn transport_failures_keep_their_message() {
        let outcome = DomainError::IamUnavailable("connection reset".to_owned()).into_outcome();
        assert_eq!(outcome.reason, OutcomeReason::Unavailable);
        assert!(outcome.message.contains("connection reset"));
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        assert!(
            DomainError::IamConflict {
                resource: "r".to_owned()
            }
            .is_retryable()
        );
        assert!(DomainError::StoreUnavailable("x".to_owned()).is_retryable());
        assert!(!DomainError::AuthUnavailable("x".to_owned()).is_retryable());
        assert!(!DomainError::AnnotatorUnavailable("x".to_owned()).is_retryable());
    }

    #[test]
    fn sdk_error_mapping() {
        let e: WorkloadIdentityError = DomainError::AuthRejected("bad key".to_owned()).into();
        assert!(matches!(e, WorkloadIdentityError::NotAuthorized(_)));

        let e: WorkloadIdentityError = DomainError::StoreUnavailable("down".to_owned()).into();
        assert!(matches!(e, WorkloadIdentityError::ServiceUnavailable(_)));
    }
}
