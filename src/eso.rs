//! External Secrets Operator (ESO) resource definitions
//!
//! ExternalSecrets are read and written as `DynamicObject`s so that fields
//! this service does not know about survive a read-modify-write untouched.

use crate::kube_utils::HasApiResource;

/// Marker type for the ESO ExternalSecret resource
///
/// Namespace-scoped; syncs a secret from an external provider into a
/// Kubernetes Secret. Touching its annotations makes ESO re-reconcile it.
pub struct ExternalSecret;

impl HasApiResource for ExternalSecret {
    const API_VERSION: &'static str = "external-secrets.io/v1beta1";
    const KIND: &'static str = "ExternalSecret";
}

/// Annotation recording who last touched the resource
pub const ANNOTATION_UPDATED_BY: &str = "updated-by";

/// Annotation recording when the resource was last touched
pub const ANNOTATION_UPDATED_AT: &str = "updated-at";

/// Value written to [`ANNOTATION_UPDATED_BY`]
pub const UPDATED_BY_VALUE: &str = "externalsecret-updater";
