//! ExternalSecret annotation updates
//!
//! A matched ExternalSecret is "touched" by merging two annotations into its
//! metadata and replacing it. Nothing else on the object changes; ESO notices
//! the new generation and re-syncs the secret from the provider.
//!
//! After the first write a [`PostUpdateHook`] runs. [`NoopHook`] does nothing;
//! [`CacheBusterHook`] waits, re-fetches the object and writes again, which
//! forces a second sync once provider-side caches have caught up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use kube::api::DynamicObject;
use kube::ResourceExt;
use tracing::{debug, error, info, warn};

use crate::eso::{ANNOTATION_UPDATED_AT, ANNOTATION_UPDATED_BY, UPDATED_BY_VALUE};
use crate::store::ResourceStore;
use crate::Error;

/// Wait before the cache-buster's second update when none is configured
pub const DEFAULT_CACHE_BUSTER_WAIT: Duration = Duration::from_secs(2);

/// Parse a cache-buster wait interval such as "2s", "500ms" or "1m30s".
///
/// Unset or empty text gives [`DEFAULT_CACHE_BUSTER_WAIT`]; so does
/// unparsable text, with a warning.
pub fn parse_wait_interval(raw: Option<&str>) -> Duration {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return DEFAULT_CACHE_BUSTER_WAIT;
    };
    match humantime::parse_duration(raw) {
        Ok(wait) => wait,
        Err(e) => {
            warn!(
                value = %raw,
                error = %e,
                default = ?DEFAULT_CACHE_BUSTER_WAIT,
                "Invalid CACHE_BUSTER_WAIT_INTERVAL, using default"
            );
            DEFAULT_CACHE_BUSTER_WAIT
        }
    }
}

/// Merge the reload annotations into `object`, creating the map if needed.
pub fn apply_reload_annotations(object: &mut DynamicObject, now: DateTime<Utc>) {
    let annotations = object.metadata.annotations.get_or_insert_with(Default::default);
    annotations.insert(
        ANNOTATION_UPDATED_BY.to_string(),
        UPDATED_BY_VALUE.to_string(),
    );
    annotations.insert(
        ANNOTATION_UPDATED_AT.to_string(),
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
}

/// Annotate `object` with the current time and write it back.
pub async fn touch_external_secret(
    store: &dyn ResourceStore,
    namespace: &str,
    mut object: DynamicObject,
) -> Result<(), Error> {
    let name = object.name_any();
    apply_reload_annotations(&mut object, Utc::now());

    info!(external_secret = %name, namespace = %namespace, "Updating ExternalSecret");
    if let Err(e) = store.replace_external_secret(namespace, &object).await {
        error!(
            external_secret = %name,
            namespace = %namespace,
            conflict = e.is_conflict(),
            error = %e,
            "Failed to update ExternalSecret"
        );
        return Err(e);
    }
    info!(external_secret = %name, namespace = %namespace, "Successfully updated ExternalSecret");
    Ok(())
}

/// Strategy run after the first successful update of a matched ExternalSecret
#[async_trait]
pub trait PostUpdateHook: Send + Sync {
    /// Called once the first update of `namespace/name` has succeeded
    async fn after_update(
        &self,
        store: &dyn ResourceStore,
        namespace: &str,
        name: &str,
    ) -> Result<(), Error>;
}

/// Hook used when the cache buster is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

#[async_trait]
impl PostUpdateHook for NoopHook {
    async fn after_update(
        &self,
        _store: &dyn ResourceStore,
        _namespace: &str,
        name: &str,
    ) -> Result<(), Error> {
        debug!(external_secret = %name, "Cache buster is disabled");
        Ok(())
    }
}

/// Waits, re-fetches the ExternalSecret and updates it a second time.
///
/// The re-fetch picks up the resourceVersion written by the first update
/// (and anything ESO wrote since), so the second write does not conflict.
/// The interval text is parsed on every call.
#[derive(Debug, Clone, Default)]
pub struct CacheBusterHook {
    interval: Option<String>,
}

impl CacheBusterHook {
    /// Create a hook from raw interval text (`None` uses the default)
    pub fn new(interval: Option<String>) -> Self {
        Self { interval }
    }

    /// Delay before the second update
    pub fn wait(&self) -> Duration {
        parse_wait_interval(self.interval.as_deref())
    }
}

#[async_trait]
impl PostUpdateHook for CacheBusterHook {
    async fn after_update(
        &self,
        store: &dyn ResourceStore,
        namespace: &str,
        name: &str,
    ) -> Result<(), Error> {
        let wait = self.wait();
        info!(
            external_secret = %name,
            wait = ?wait,
            "Cache buster enabled, waiting before second update"
        );
        tokio::time::sleep(wait).await;

        let latest = store
            .get_external_secret(namespace, name)
            .await
            .inspect_err(|e| {
                if e.is_not_found() {
                    warn!(
                        external_secret = %name,
                        namespace = %namespace,
                        "ExternalSecret was deleted before the second update"
                    );
                } else {
                    error!(
                        external_secret = %name,
                        namespace = %namespace,
                        error = %e,
                        "Failed to fetch latest ExternalSecret"
                    );
                }
            })?;

        info!(external_secret = %name, "Performing second update to bust cache");
        touch_external_secret(store, namespace, latest).await?;
        info!(external_secret = %name, "Successfully performed second update");
        Ok(())
    }
}

/// Applies the reload update to matched ExternalSecrets
pub struct ExternalSecretUpdater {
    store: Arc<dyn ResourceStore>,
    hook: Arc<dyn PostUpdateHook>,
}

impl ExternalSecretUpdater {
    /// Create an updater writing through `store` and running `hook` afterwards
    pub fn new(store: Arc<dyn ResourceStore>, hook: Arc<dyn PostUpdateHook>) -> Self {
        Self { store, hook }
    }

    /// Touch `object` once, then run the post-update hook.
    ///
    /// If the first update fails the hook is not run.
    pub async fn update(&self, namespace: &str, object: DynamicObject) -> Result<(), Error> {
        let name = object.name_any();
        touch_external_secret(self.store.as_ref(), namespace, object).await?;
        self.hook
            .after_update(self.store.as_ref(), namespace, &name)
            .await
    }
}
