//! Org -> cloud service account mapping and per-user default org, kept in
//! two config records of the platform namespace.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};
use workload_identity_sdk::{ConfigRecord, ObjectStoreClient, ObjectStoreError};

use super::error::DomainError;
use super::retry::RetryPolicy;

pub struct MappingStore {
    store: Arc<dyn ObjectStoreClient>,
    namespace: String,
    org_record: String,
    user_record: String,
    retry: RetryPolicy,
}

impl MappingStore {
    pub fn new(
        store: Arc<dyn ObjectStoreClient>,
        namespace: impl Into<String>,
        org_record: impl Into<String>,
        user_record: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            org_record: org_record.into(),
            user_record: user_record.into(),
            retry,
        }
    }

    /// Every mapped org. Orgs stored with an empty value count as unmapped
    /// and are left out.
    ///
    /// # Errors
    ///
    /// [`DomainError::StoreUnavailable`] if the record cannot be read.
    pub async fn get_org_to_sa_map(&self) -> Result<BTreeMap<String, String>, DomainError> {
        let record = self.read(&self.org_record).await?;
        Ok(record
            .map(|r| r.data)
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, sa)| !sa.is_empty())
            .collect())
    }

    /// # Errors
    ///
    /// [`DomainError::StoreUnavailable`] if the record cannot be read.
    pub async fn get_org_sa(&self, org: &str) -> Result<Option<String>, DomainError> {
        let record = self.read(&self.org_record).await?;
        Ok(record
            .and_then(|r| r.get(org).map(str::to_owned))
            .filter(|sa| !sa.is_empty()))
    }

    /// Store `org -> cloud_sa`, creating the record if needed.
    ///
    /// Returns the previous value (if any) and the new one.
    ///
    /// # Errors
    ///
    /// Store errors once the retry budget is spent.
    pub async fn upsert_org_mapping(
        &self,
        org: &str,
        cloud_sa: &str,
    ) -> Result<(Option<String>, String), DomainError> {
        let previous = self.upsert_key(&self.org_record, org, cloud_sa).await?;
        info!(org, cloud_sa, previous = ?previous, "org mapping stored");
        Ok((previous, cloud_sa.to_owned()))
    }

    /// # Errors
    ///
    /// [`DomainError::StoreUnavailable`] if the record cannot be read.
    pub async fn get_user_default_org(&self, user_id: &str) -> Result<Option<String>, DomainError> {
        let record = self.read(&self.user_record).await?;
        Ok(record
            .and_then(|r| r.get(user_id).map(str::to_owned))
            .filter(|org| !org.is_empty()))
    }

    /// # Errors
    ///
    /// Store errors once the retry budget is spent.
    pub async fn set_user_default_org(&self, user_id: &str, org: &str) -> Result<(), DomainError> {
        self.upsert_key(&self.user_record, user_id, org).await?;
        debug!(user_id, org, "default org stored");
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Option<ConfigRecord>, DomainError> {
        self.store
            .get_config_record(&self.namespace, name)
            .await
            .map_err(|e| store_error(name, e))
    }

    /// Set one key of a record under compare-and-swap, returning the value it
    /// replaced. A write is skipped when the key already holds `value`.
    async fn upsert_key(
        &self,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<String>, DomainError> {
        self.retry
            .run("mapping_store.upsert", || async move {
                let mut record = self.read(name).await?.unwrap_or_default();
                let previous = record.data.insert(key.to_owned(), value.to_owned());
                if previous.as_deref() == Some(value) {
                    return Ok(previous);
                }
                self.store
                    .put_config_record(&self.namespace, name, record)
                    .await
                    .map_err(|e| store_error(name, e))?;
                Ok(previous)
            })
            .await
    }
}

fn store_error(name: &str, e: ObjectStoreError) -> DomainError {
    match e {
        // A record deleted between read and write is retried like a lost race.
        ObjectStoreError::Conflict { .. } | ObjectStoreError::NotFound { .. } => {
            DomainError::StoreConflict {
                name: name.to_owned(),
            }
        }
        ObjectStoreError::Unavailable(msg) => DomainError::StoreUnavailable(msg),
    }
}
