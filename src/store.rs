//! Cluster resource-store access
//!
//! [`ResourceStore`] is the seam between the reload logic and the Kubernetes
//! API. Production code uses [`KubeResourceStore`]; tests substitute the
//! generated `MockResourceStore`.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DynamicObject, ListParams, PostParams};
use kube::discovery::ApiResource;
use kube::{Client, ResourceExt};

#[cfg(test)]
use mockall::automock;

use crate::eso::ExternalSecret;
use crate::kube_utils::HasApiResource;
use crate::Error;

/// Trait abstracting the cluster operations the updater needs
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// List the names of every namespace in the cluster.
    ///
    /// Requires cluster-scoped `list` on namespaces; namespace-scoped
    /// deployments get a 403 here.
    async fn list_namespaces(&self) -> Result<Vec<String>, Error>;

    /// List all ExternalSecrets in `namespace`
    async fn list_external_secrets(&self, namespace: &str) -> Result<Vec<DynamicObject>, Error>;

    /// Fetch the current version of a single ExternalSecret
    async fn get_external_secret(&self, namespace: &str, name: &str)
        -> Result<DynamicObject, Error>;

    /// Replace an ExternalSecret with `object`.
    ///
    /// The write carries the object's `resourceVersion`; the API server
    /// rejects it with 409 Conflict if the stored object has moved on.
    async fn replace_external_secret(
        &self,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, Error>;
}

/// Real Kubernetes client implementation
pub struct KubeResourceStore {
    client: Client,
    api_resource: ApiResource,
}

impl KubeResourceStore {
    /// Create a new KubeResourceStore wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            api_resource: ExternalSecret::api_resource(),
        }
    }

    fn external_secrets(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.api_resource)
    }
}

#[async_trait]
impl ResourceStore for KubeResourceStore {
    async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = api.list(&ListParams::default()).await?;
        Ok(namespaces.items.iter().map(|ns| ns.name_any()).collect())
    }

    async fn list_external_secrets(&self, namespace: &str) -> Result<Vec<DynamicObject>, Error> {
        let list = self
            .external_secrets(namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn get_external_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, Error> {
        Ok(self.external_secrets(namespace).get(name).await?)
    }

    async fn replace_external_secret(
        &self,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject, Error> {
        let name = object
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| Error::internal("ExternalSecret has no metadata.name"))?;

        Ok(self
            .external_secrets(namespace)
            .replace(name, &PostParams::default(), object)
            .await?)
    }
}
