//! Namespace enumeration
//!
//! The updater searches every namespace it can list. Deployments granted only
//! namespace-scoped RBAC cannot list namespaces, so they fall back to the
//! pod's own namespace as mounted by the service-account token projection.

use std::path::Path;

use tracing::{info, warn};

use crate::store::ResourceStore;
use crate::Error;

/// Default location of the pod namespace file
pub const DEFAULT_NAMESPACE_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Namespaces to search for ExternalSecrets.
///
/// Returns every namespace in the cluster when listing is permitted,
/// otherwise the single namespace read from `namespace_file`.
pub async fn candidate_namespaces(
    store: &dyn ResourceStore,
    namespace_file: &Path,
) -> Result<Vec<String>, Error> {
    match store.list_namespaces().await {
        Ok(namespaces) => {
            info!(count = namespaces.len(), "Listed cluster namespaces");
            Ok(namespaces)
        }
        Err(e) => {
            warn!(
                error = %e,
                forbidden = e.is_forbidden(),
                "Failed to list namespaces, falling back to the deployed namespace"
            );
            let namespace = read_pod_namespace(namespace_file).await?;
            Ok(vec![namespace])
        }
    }
}

/// Read the pod's namespace from the mounted service-account file
pub async fn read_pod_namespace(path: &Path) -> Result<String, Error> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::NamespaceFile {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(contents.trim().to_string())
}
