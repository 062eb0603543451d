#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static workload-identity plugin.
//!
//! In-memory implementations of the authorization, object store and IAM
//! policy capabilities for local development and tests.

pub mod config;
pub mod domain;
pub mod plugin;

pub use config::StaticWiPluginConfig;
pub use domain::{InMemoryIamPolicyStore, InMemoryObjectStore, StaticAuthorizationClient};
pub use plugin::StaticWiPlugin;
