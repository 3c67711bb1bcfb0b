//! Reload orchestration
//!
//! For one item name: enumerate namespaces, list ExternalSecrets in each,
//! match their specs against the item, and update every match. Listing
//! failures skip the affected namespace; an update failure stops the scan
//! and is returned to the caller. Nothing is retried.

use std::path::PathBuf;
use std::sync::Arc;

use kube::ResourceExt;
use tracing::{error, info, instrument, warn};

use crate::document::nested_map;
use crate::matcher::references_item;
use crate::namespaces::candidate_namespaces;
use crate::store::ResourceStore;
use crate::updater::{ExternalSecretUpdater, PostUpdateHook};
use crate::Error;

/// Counters describing one reload pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Namespaces whose ExternalSecrets were listed successfully
    pub namespaces_scanned: usize,
    /// ExternalSecrets inspected
    pub resources_scanned: usize,
    /// ExternalSecrets that referenced the item
    pub matched: usize,
    /// ExternalSecrets updated (including any post-update hook)
    pub updated: usize,
}

/// Finds and touches the ExternalSecrets that reference an item
pub struct Reloader {
    store: Arc<dyn ResourceStore>,
    updater: ExternalSecretUpdater,
    namespace_file: PathBuf,
}

impl Reloader {
    /// Create a reloader over `store`, running `hook` after each first update
    pub fn new(
        store: Arc<dyn ResourceStore>,
        hook: Arc<dyn PostUpdateHook>,
        namespace_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            updater: ExternalSecretUpdater::new(store.clone(), hook),
            store,
            namespace_file: namespace_file.into(),
        }
    }

    /// Touch every ExternalSecret referencing `item_name`.
    #[instrument(skip(self))]
    pub async fn reload(&self, item_name: &str) -> Result<ReloadSummary, Error> {
        let namespaces = candidate_namespaces(self.store.as_ref(), &self.namespace_file).await?;
        let mut summary = ReloadSummary::default();

        for namespace in &namespaces {
            info!(namespace = %namespace, "Checking namespace");

            let external_secrets = match self.store.list_external_secrets(namespace).await {
                Ok(list) => list,
                Err(e) => {
                    error!(
                        namespace = %namespace,
                        error = %e,
                        "Failed to list ExternalSecrets, skipping namespace"
                    );
                    continue;
                }
            };
            summary.namespaces_scanned += 1;

            for es in external_secrets {
                let name = es.name_any();
                summary.resources_scanned += 1;
                info!(external_secret = %name, namespace = %namespace, "Processing ExternalSecret");

                match nested_map(&es.data, &["spec"]) {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        warn!(external_secret = %name, namespace = %namespace, "ExternalSecret has no spec, skipping");
                        continue;
                    }
                    Err(e) => {
                        warn!(external_secret = %name, namespace = %namespace, error = %e, "Error retrieving spec, skipping");
                        continue;
                    }
                }

                if !references_item(&es.data, item_name, &name) {
                    info!(
                        external_secret = %name,
                        namespace = %namespace,
                        key = %item_name,
                        "Desired key not found in ExternalSecret"
                    );
                    continue;
                }

                summary.matched += 1;
                info!(external_secret = %name, namespace = %namespace, key = %item_name, "Desired key found in ExternalSecret");

                if let Err(e) = self.updater.update(namespace, es).await {
                    error!(
                        external_secret = %name,
                        namespace = %namespace,
                        error = %e,
                        "Failed to update ExternalSecret"
                    );
                    return Err(e);
                }
                summary.updated += 1;
            }
        }

        info!(
            namespaces = summary.namespaces_scanned,
            scanned = summary.resources_scanned,
            matched = summary.matched,
            updated = summary.updated,
            "Reload pass complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::api_error;
    use crate::store::fixtures::{external_secret, referencing};
    use crate::store::MockResourceStore;
    use crate::updater::{CacheBusterHook, NoopHook};
    use serde_json::json;

    fn reloader(store: MockResourceStore) -> Reloader {
        Reloader::new(Arc::new(store), Arc::new(NoopHook), "/nonexistent/namespace")
    }

    #[tokio::test]
    async fn updates_only_matching_resources() {
        let mut store = MockResourceStore::new();
        store
            .expect_list_namespaces()
            .returning(|| Ok(vec!["apps".to_string()]));
        store.expect_list_external_secrets().returning(|ns| {
            Ok(vec![
                referencing(ns, "db", "/db/pass"),
                referencing(ns, "api", "api/token"),
            ])
        });
        store
            .expect_replace_external_secret()
            .times(1)
            .withf(|_, obj| obj.metadata.name.as_deref() == Some("db"))
            .returning(|_, obj| Ok(obj.clone()));

        let summary = reloader(store).reload("db/pass").await.unwrap();
        assert_eq!(
            summary,
            ReloadSummary {
                namespaces_scanned: 1,
                resources_scanned: 2,
                matched: 1,
                updated: 1,
            }
        );
    }

    #[tokio::test]
    async fn list_failure_skips_namespace_only() {
        let mut store = MockResourceStore::new();
        store
            .expect_list_namespaces()
            .returning(|| Ok(vec!["locked".to_string(), "apps".to_string()]));
        store
            .expect_list_external_secrets()
            .withf(|ns| ns == "locked")
            .returning(|_| Err(api_error(403, "Forbidden")));
        store
            .expect_list_external_secrets()
            .withf(|ns| ns == "apps")
            .returning(|ns| Ok(vec![referencing(ns, "db", "db/pass")]));
        store
            .expect_replace_external_secret()
            .times(1)
            .returning(|_, obj| Ok(obj.clone()));

        let summary = reloader(store).reload("db/pass").await.unwrap();
        assert_eq!(summary.namespaces_scanned, 1);
        assert_eq!(summary.updated, 1);
    }

    #[tokio::test]
    async fn resource_without_spec_is_skipped() {
        let mut store = MockResourceStore::new();
        store
            .expect_list_namespaces()
            .returning(|| Ok(vec!["apps".to_string()]));
        store.expect_list_external_secrets().returning(|ns| {
            let mut broken = referencing(ns, "broken", "db/pass");
            broken.data = json!({"status": {}});
            let mut wrong = referencing(ns, "wrong", "db/pass");
            wrong.data = json!({"spec": "text"});
            Ok(vec![broken, wrong, referencing(ns, "db", "db/pass")])
        });
        store
            .expect_replace_external_secret()
            .times(1)
            .withf(|_, obj| obj.metadata.name.as_deref() == Some("db"))
            .returning(|_, obj| Ok(obj.clone()));

        let summary = reloader(store).reload("db/pass").await.unwrap();
        assert_eq!(summary.resources_scanned, 3);
        assert_eq!(summary.matched, 1);
    }

    #[tokio::test]
    async fn update_failure_aborts_scan() {
        let mut store = MockResourceStore::new();
        store
            .expect_list_namespaces()
            .returning(|| Ok(vec!["apps".to_string(), "other".to_string()]));
        store
            .expect_list_external_secrets()
            .times(1)
            .withf(|ns| ns == "apps")
            .returning(|ns| {
                Ok(vec![
                    referencing(ns, "first", "db/pass"),
                    referencing(ns, "second", "db/pass"),
                ])
            });
        store
            .expect_replace_external_secret()
            .times(1)
            .returning(|_, _| Err(api_error(409, "Conflict")));

        let err = reloader(store).reload("db/pass").await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn data_from_match_is_updated() {
        let mut store = MockResourceStore::new();
        store
            .expect_list_namespaces()
            .returning(|| Ok(vec!["apps".to_string()]));
        store.expect_list_external_secrets().returning(|ns| {
            Ok(vec![external_secret(
                ns,
                "bundle",
                json!({"dataFrom": [{"extract": {"key": "app/config"}}]}),
            )])
        });
        store
            .expect_replace_external_secret()
            .times(1)
            .returning(|_, obj| Ok(obj.clone()));

        let summary = reloader(store).reload("app/config").await.unwrap();
        assert_eq!(summary.updated, 1);
    }

    #[tokio::test]
    async fn namespace_fallback_searches_single_namespace() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"payments").unwrap();

        let mut store = MockResourceStore::new();
        store
            .expect_list_namespaces()
            .returning(|| Err(api_error(403, "Forbidden")));
        store
            .expect_list_external_secrets()
            .times(1)
            .withf(|ns| ns == "payments")
            .returning(|_| Ok(vec![]));

        let reloader = Reloader::new(Arc::new(store), Arc::new(NoopHook), file.path());
        let summary = reloader.reload("db/pass").await.unwrap();
        assert_eq!(summary.namespaces_scanned, 1);
        assert_eq!(summary.resources_scanned, 0);
    }

    #[tokio::test]
    async fn namespace_file_failure_aborts_before_listing() {
        let mut store = MockResourceStore::new();
        store
            .expect_list_namespaces()
            .returning(|| Err(api_error(403, "Forbidden")));
        store.expect_list_external_secrets().never();

        let err = reloader(store).reload("db/pass").await.unwrap_err();
        assert!(matches!(err, Error::NamespaceFile { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn cache_buster_updates_each_match_twice() {
        let mut store = MockResourceStore::new();
        store
            .expect_list_namespaces()
            .returning(|| Ok(vec!["apps".to_string()]));
        store
            .expect_list_external_secrets()
            .returning(|ns| Ok(vec![referencing(ns, "db", "db/pass")]));
        store
            .expect_get_external_secret()
            .times(1)
            .returning(|ns, name| Ok(referencing(ns, name, "db/pass")));
        store
            .expect_replace_external_secret()
            .times(2)
            .returning(|_, obj| Ok(obj.clone()));

        let reloader = Reloader::new(
            Arc::new(store),
            Arc::new(CacheBusterHook::new(None)),
            "/nonexistent/namespace",
        );
        let summary = reloader.reload("db/pass").await.unwrap();
        assert_eq!(summary.updated, 1);
    }
}
