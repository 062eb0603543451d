pub mod annotator;
pub mod coordinator;
pub mod error;
pub mod iam_binding;
pub mod identity;
pub mod local_client;
pub mod locator;
pub mod mapping_store;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{BindingCoordinator, Capabilities};
pub use error::DomainError;
pub use local_client::WorkloadIdentityLocalClient;
