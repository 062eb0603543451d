//! Reads and writes the cloud-identity annotation on workload principals.

use std::sync::Arc;

use tracing::debug;
use workload_identity_sdk::{ObjectStoreClient, ObjectStoreError};

use super::error::DomainError;

pub struct IdentityAnnotator {
    store: Arc<dyn ObjectStoreClient>,
    annotation_key: String,
}

impl IdentityAnnotator {
    pub fn new(store: Arc<dyn ObjectStoreClient>, annotation_key: impl Into<String>) -> Self {
        Self {
            store,
            annotation_key: annotation_key.into(),
        }
    }

    /// Cloud service account the principal currently advertises. An absent
    /// and an empty annotation both read as `None`.
    ///
    /// # Errors
    ///
    /// - [`DomainError::AnnotationTargetNotFound`] if the principal is gone
    /// - [`DomainError::AnnotatorUnavailable`] on store failure
    pub async fn get_annotation(
        &self,
        principal: &str,
        namespace: &str,
    ) -> Result<Option<String>, DomainError> {
        let object = self
            .store
            .get_principal(namespace, principal)
            .await
            .map_err(|e| annotator_error(namespace, principal, e))?
            .ok_or_else(|| DomainError::AnnotationTargetNotFound {
                namespace: namespace.to_owned(),
                name: principal.to_owned(),
            })?;

        Ok(object
            .annotations
            .get(&self.annotation_key)
            .filter(|v| !v.is_empty())
            .cloned())
    }

    /// Advertise `cloud_sa` on the principal, or clear the annotation when
    /// `cloud_sa` is `None` or empty.
    ///
    /// # Errors
    ///
    /// Same as [`get_annotation`](Self::get_annotation).
    pub async fn set_annotation(
        &self,
        principal: &str,
        namespace: &str,
        cloud_sa: Option<&str>,
    ) -> Result<(), DomainError> {
        let value = cloud_sa.filter(|v| !v.is_empty());
        self.store
            .patch_principal_annotation(namespace, principal, &self.annotation_key, value)
            .await
            .map_err(|e| annotator_error(namespace, principal, e))?;
        debug!(principal, namespace, cloud_sa = ?value, "principal annotation updated");
        Ok(())
    }
}

fn annotator_error(namespace: &str, principal: &str, e: ObjectStoreError) -> DomainError {
    match e {
        ObjectStoreError::NotFound { .. } => DomainError::AnnotationTargetNotFound {
            namespace: namespace.to_owned(),
            name: principal.to_owned(),
        },
        ObjectStoreError::Conflict { .. } => DomainError::AnnotatorUnavailable(e.to_string()),
        ObjectStoreError::Unavailable(msg) => DomainError::AnnotatorUnavailable(msg),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use static_wi_plugin::InMemoryObjectStore;
    use std::collections::BTreeMap;
    use workload_identity_sdk::AnnotatedObject;

    const KEY: &str = "iam.gke.io/gcp-service-account";
    const NS: &str = "compute";

    fn principal(name: &str, annotation: Option<&str>) -> AnnotatedObject {
        let mut annotations = BTreeMap::new();
        if let Some(v) = annotation {
            annotations.insert(KEY.to_owned(), v.to_owned());
        }
        AnnotatedObject {
            name: name.to_owned(),
            namespace: NS.to_owned(),
            annotations,
            resource_version: None,
        }
    }

    #[tokio::test]
    async fn absent_and_empty_read_alike() {
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.insert_principal(principal("a", None));
        objects.insert_principal(principal("b", Some("")));
        let annotator = IdentityAnnotator::new(objects, KEY);

        assert_eq!(annotator.get_annotation("a", NS).await.unwrap(), None);
        assert_eq!(annotator.get_annotation("b", NS).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_clear() {
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.insert_principal(principal("a", None));
        let annotator = IdentityAnnotator::new(objects.clone(), KEY);

        annotator
            .set_annotation("a", NS, Some("sa1@p.iam"))
            .await
            .unwrap();
        assert_eq!(
            annotator.get_annotation("a", NS).await.unwrap().as_deref(),
            Some("sa1@p.iam")
        );

        annotator.set_annotation("a", NS, Some("")).await.unwrap();
        assert_eq!(annotator.get_annotation("a", NS).await.unwrap(), None);
        let stored = objects.get_principal(NS, "a").await.unwrap().unwrap();
        assert!(!stored.annotations.contains_key(KEY));
    }

    #[tokio::test]
    async fn missing_principal_is_reported() {
        let annotator = IdentityAnnotator::new(Arc::new(InMemoryObjectStore::new()), KEY);

        let err = annotator.get_annotation("ghost", NS).await.unwrap_err();
        assert!(matches!(err, DomainError::AnnotationTargetNotFound { .. }));

        let err = annotator
            .set_annotation("ghost", NS, Some("sa"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AnnotationTargetNotFound { .. }));
    }
}
