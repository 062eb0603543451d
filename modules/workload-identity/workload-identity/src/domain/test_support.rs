//! Fault-injecting wrappers around capability clients.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use workload_identity_sdk::{
    AnnotatedObject, ConfigRecord, IamPolicy, IamPolicyClient, IamPolicyError, LabelSelector,
    ObjectStoreClient, ObjectStoreError, WorkloadObject,
};

/// Object store that can fail or race record writes and workload listing.
pub struct FlakyObjectStore {
    inner: Arc<dyn ObjectStoreClient>,
    failing_writes: AtomicUsize,
    write_attempts: AtomicUsize,
    listing_fails: AtomicBool,
    interleaved: Mutex<Vec<(String, String, String, String)>>,
}

impl FlakyObjectStore {
    pub fn new(inner: Arc<dyn ObjectStoreClient>) -> Self {
        Self {
            inner,
            failing_writes: AtomicUsize::new(0),
            write_attempts: AtomicUsize::new(0),
            listing_fails: AtomicBool::new(false),
            interleaved: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `n` record writes with `Unavailable`.
    pub fn fail_record_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    pub fn fail_listing(&self) {
        self.listing_fails.store(true, Ordering::SeqCst);
    }

    /// Right before the next record write, let another writer set `key` in
    /// the same record so the pending write loses its version check.
    pub fn interleave_record_write(&self, namespace: &str, name: &str, key: &str, value: &str) {
        if let Ok(mut pending) = self.interleaved.lock() {
            pending.push((
                namespace.to_owned(),
                name.to_owned(),
                key.to_owned(),
                value.to_owned(),
            ));
        }
    }

    pub fn record_write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn take_interleaved(&self) -> Option<(String, String, String, String)> {
        self.interleaved.lock().ok().and_then(|mut p| p.pop())
    }
}

#[async_trait]
impl ObjectStoreClient for FlakyObjectStore {
    async fn get_config_record(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigRecord>, ObjectStoreError> {
        self.inner.get_config_record(namespace, name).await
    }

    async fn put_config_record(
        &self,
        namespace: &str,
        name: &str,
        record: ConfigRecord,
    ) -> Result<ConfigRecord, ObjectStoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failing_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_writes.store(remaining - 1, Ordering::SeqCst);
            return Err(ObjectStoreError::Unavailable("injected write failure".to_owned()));
        }

        if let Some((ns, rec, key, value)) = self.take_interleaved() {
            let mut current = self
                .inner
                .get_config_record(&ns, &rec)
                .await?
                .unwrap_or_default();
            current.data.insert(key, value);
            self.inner.put_config_record(&ns, &rec, current).await?;
        }

        self.inner.put_config_record(namespace, name, record).await
    }

    async fn list_workloads(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<WorkloadObject>, ObjectStoreError> {
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Unavailable("injected listing failure".to_owned()));
        }
        self.inner.list_workloads(namespace, selector).await
    }

    async fn get_principal(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<AnnotatedObject>, ObjectStoreError> {
        self.inner.get_principal(namespace, name).await
    }

    async fn patch_principal_annotation(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        self.inner
            .patch_principal_annotation(namespace, name, key, value)
            .await
    }
}

/// IAM client that can race or fail policy writes.
pub struct FlakyIam {
    inner: Arc<dyn IamPolicyClient>,
    interleaved_writes: AtomicUsize,
    failing_sets: AtomicUsize,
    set_attempts: AtomicUsize,
    sets_per_resource: Mutex<BTreeMap<String, usize>>,
    down_resources: Mutex<BTreeSet<String>>,
}

impl FlakyIam {
    pub fn new(inner: Arc<dyn IamPolicyClient>) -> Self {
        Self {
            inner,
            interleaved_writes: AtomicUsize::new(0),
            failing_sets: AtomicUsize::new(0),
            set_attempts: AtomicUsize::new(0),
            sets_per_resource: Mutex::new(BTreeMap::new()),
            down_resources: Mutex::new(BTreeSet::new()),
        }
    }

    /// Before each of the next `n` policy writes, rewrite the stored policy
    /// so the pending write's etag is stale.
    pub fn interleave_policy_writes(&self, n: usize) {
        self.interleaved_writes.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` policy writes with `Unavailable`.
    pub fn fail_sets(&self, n: usize) {
        self.failing_sets.store(n, Ordering::SeqCst);
    }

    /// Fail every policy write on `resource` with `Unavailable`.
    pub fn fail_sets_on(&self, resource: &str) {
        if let Ok(mut down) = self.down_resources.lock() {
            down.insert(resource.to_owned());
        }
    }

    pub fn restore_sets_on(&self, resource: &str) {
        if let Ok(mut down) = self.down_resources.lock() {
            down.remove(resource);
        }
    }

    pub fn set_attempts(&self) -> usize {
        self.set_attempts.load(Ordering::SeqCst)
    }

    pub fn set_attempts_for(&self, resource: &str) -> usize {
        self.sets_per_resource
            .lock()
            .map(|m| m.get(resource).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl IamPolicyClient for FlakyIam {
    async fn get_policy(&self, resource: &str) -> Result<IamPolicy, IamPolicyError> {
        self.inner.get_policy(resource).await
    }

    async fn set_policy(
        &self,
        resource: &str,
        policy: IamPolicy,
    ) -> Result<IamPolicy, IamPolicyError> {
        self.set_attempts.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut m) = self.sets_per_resource.lock() {
            *m.entry(resource.to_owned()).or_default() += 1;
        }

        let resource_down = self
            .down_resources
            .lock()
            .is_ok_and(|down| down.contains(resource));
        if resource_down {
            return Err(IamPolicyError::Unavailable(format!("{resource} is down")));
        }

        let failing = self.failing_sets.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_sets.store(failing - 1, Ordering::SeqCst);
            return Err(IamPolicyError::Unavailable("injected IAM failure".to_owned()));
        }

        let racing = self.interleaved_writes.load(Ordering::SeqCst);
        if racing > 0 {
            self.interleaved_writes.store(racing - 1, Ordering::SeqCst);
            let current = self.inner.get_policy(resource).await?;
            self.inner.set_policy(resource, current).await?;
        }

        self.inner.set_policy(resource, policy).await
    }
}
