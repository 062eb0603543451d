//! In-memory capability implementations.

pub mod authorization;
pub mod iam;
pub mod object_store;

pub use authorization::StaticAuthorizationClient;
pub use iam::InMemoryIamPolicyStore;
pub use object_store::InMemoryObjectStore;
