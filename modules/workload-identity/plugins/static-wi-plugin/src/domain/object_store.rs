//! In-memory object store with per-object versions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use workload_identity_sdk::{
    AnnotatedObject, ConfigRecord, LabelSelector, ObjectStoreClient, ObjectStoreError,
    WorkloadObject,
};

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_owned(), name.to_owned())
}

#[derive(Default)]
struct State {
    records: BTreeMap<Key, ConfigRecord>,
    workloads: BTreeMap<Key, WorkloadObject>,
    principals: BTreeMap<Key, AnnotatedObject>,
    next_version: u64,
    record_writes: usize,
}

impl State {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// Object store that keeps everything in process memory.
///
/// Config record writes follow the compare-and-swap contract of
/// [`ObjectStoreClient::put_config_record`].
#[derive(Default)]
pub struct InMemoryObjectStore {
    state: Mutex<State>,
}

impl InMemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_workload(&self, workload: WorkloadObject) {
        let mut state = self.state.lock();
        state
            .workloads
            .insert(key(&workload.namespace, &workload.name), workload);
    }

    pub fn remove_workload(&self, namespace: &str, name: &str) {
        self.state.lock().workloads.remove(&key(namespace, name));
    }

    /// Insert or replace a principal, assigning it a fresh version.
    pub fn insert_principal(&self, mut principal: AnnotatedObject) {
        let mut state = self.state.lock();
        principal.resource_version = Some(state.bump());
        state
            .principals
            .insert(key(&principal.namespace, &principal.name), principal);
    }

    /// Insert or replace a config record, ignoring version checks.
    pub fn seed_record(&self, namespace: &str, name: &str, data: BTreeMap<String, String>) {
        let mut state = self.state.lock();
        let version = state.bump();
        state.records.insert(
            key(namespace, name),
            ConfigRecord {
                data,
                resource_version: Some(version),
            },
        );
    }

    /// Number of successful config record writes.
    pub fn record_writes(&self) -> usize {
        self.state.lock().record_writes
    }
}

#[async_trait]
impl ObjectStoreClient for InMemoryObjectStore {
    async fn get_config_record(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigRecord>, ObjectStoreError> {
        Ok(self.state.lock().records.get(&key(namespace, name)).cloned())
    }

    async fn put_config_record(
        &self,
        namespace: &str,
        name: &str,
        mut record: ConfigRecord,
    ) -> Result<ConfigRecord, ObjectStoreError> {
        let mut state = self.state.lock();
        let k = key(namespace, name);
        let current = state
            .records
            .get(&k)
            .and_then(|r| r.resource_version.clone());

        match (&record.resource_version, current) {
            (None, None) => {}
            (Some(expected), Some(actual)) if *expected == actual => {}
            (Some(_), None) => {
                return Err(ObjectStoreError::NotFound {
                    kind: "config record",
                    namespace: namespace.to_owned(),
                    name: name.to_owned(),
                });
            }
            _ => {
                tracing::debug!(namespace, name, "config record version mismatch");
                return Err(ObjectStoreError::Conflict {
                    kind: "config record",
                    namespace: namespace.to_owned(),
                    name: name.to_owned(),
                });
            }
        }

        record.resource_version = Some(state.bump());
        state.records.insert(k, record.clone());
        state.record_writes += 1;
        Ok(record)
    }

    async fn list_workloads(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<WorkloadObject>, ObjectStoreError> {
        Ok(self
            .state
            .lock()
            .workloads
            .values()
            .filter(|w| w.namespace == namespace && selector.matches(&w.labels))
            .cloned()
            .collect())
    }

    async fn get_principal(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<AnnotatedObject>, ObjectStoreError> {
        Ok(self.state.lock().principals.get(&key(namespace, name)).cloned())
    }

    async fn patch_principal_annotation(
        &self,
        namespace: &str,
        name: &str,
        annotation: &str,
        value: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let mut state = self.state.lock();
        let version = state.bump();
        let principal = state
            .principals
            .get_mut(&key(namespace, name))
            .ok_or_else(|| ObjectStoreError::NotFound {
                kind: "principal",
                namespace: namespace.to_owned(),
                name: name.to_owned(),
            })?;

        match value {
            Some(v) => {
                principal
                    .annotations
                    .insert(annotation.to_owned(), v.to_owned());
            }
            None => {
                principal.annotations.remove(annotation);
            }
        }
        principal.resource_version = Some(version);
        Ok(())
    }
}
