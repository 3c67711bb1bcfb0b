//! Shared Kubernetes utilities using kube-rs
//!
//! Client construction and `ApiResource` building for resources handled as
//! `DynamicObject`s.

use std::path::Path;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use tracing::{debug, info};

use crate::Error;

// =============================================================================
// HasApiResource Trait
// =============================================================================

/// Trait for types that have a known API group, version, and kind.
///
/// Implement this for CRD marker types to derive their `ApiResource` from
/// constants, so every API call uses the same group/version/plural.
///
/// # Example
/// ```ignore
/// impl HasApiResource for ExternalSecret {
///     const API_VERSION: &'static str = "external-secrets.io/v1beta1";
///     const KIND: &'static str = "ExternalSecret";
/// }
///
/// let ar = ExternalSecret::api_resource();
/// ```
pub trait HasApiResource {
    /// Full API version (e.g., "external-secrets.io/v1beta1", "v1")
    const API_VERSION: &'static str;
    /// Resource kind (e.g., "ExternalSecret")
    const KIND: &'static str;

    /// Build an ApiResource from the type's constants.
    fn api_resource() -> ApiResource {
        build_api_resource(Self::API_VERSION, Self::KIND)
    }
}

/// Build an ApiResource from an apiVersion string and kind.
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Split an apiVersion into (group, version).
///
/// ```ignore
/// let (group, version) = parse_api_version("v1");
/// assert_eq!(group, "");
/// assert_eq!(version, "v1");
/// ```
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Pluralize a Kubernetes resource kind using the simple English rules the
/// API server applies to CRDs without an explicit plural.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a kube client, preferring in-cluster credentials.
///
/// Falls back to a kubeconfig for local development: the explicit
/// `kubeconfig` path when given, otherwise the default loading rules
/// (`KUBECONFIG`, then `~/.kube/config`).
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    let mut config = match Config::incluster() {
        Ok(config) => {
            info!("Using in-cluster Kubernetes credentials");
            config
        }
        Err(e) => {
            debug!(error = %e, "In-cluster config unavailable, falling back to kubeconfig");
            load_kubeconfig(kubeconfig).await?
        }
    };
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

    Client::try_from(config).map_err(|e| Error::config(format!("failed to create client: {e}")))
}

async fn load_kubeconfig(path: Option<&Path>) -> Result<Config, Error> {
    let options = KubeConfigOptions::default();
    match path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| Error::config(format!("failed to read kubeconfig: {e}")))?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| Error::config(format!("failed to load kubeconfig: {e}")))
        }
        None => Config::from_kubeconfig(&options)
            .await
            .map_err(|e| Error::config(format!("failed to load kubeconfig: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_api_version_with_group() {
        assert_eq!(
            parse_api_version("external-secrets.io/v1beta1"),
            ("external-secrets.io".to_string(), "v1beta1".to_string())
        );
    }

    #[test]
    fn parse_api_version_core_group() {
        assert_eq!(parse_api_version("v1"), (String::new(), "v1".to_string()));
    }

    #[test]
    fn pluralize_follows_simple_rules() {
        assert_eq!(pluralize_kind("ExternalSecret"), "externalsecrets");
        assert_eq!(pluralize_kind("ClusterSecretStore"), "clustersecretstores");
        assert_eq!(pluralize_kind("Policy"), "policies");
        assert_eq!(pluralize_kind("Gateway"), "gateways");
        assert_eq!(pluralize_kind("Ingress"), "ingresses");
    }

    #[test]
    fn build_api_resource_fills_every_field() {
        let ar = build_api_resource("external-secrets.io/v1beta1", "ExternalSecret");
        assert_eq!(ar.group, "external-secrets.io");
        assert_eq!(ar.version, "v1beta1");
        assert_eq!(ar.api_version, "external-secrets.io/v1beta1");
        assert_eq!(ar.kind, "ExternalSecret");
        assert_eq!(ar.plural, "externalsecrets");
    }
}
