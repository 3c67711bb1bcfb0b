//! Error types for the ExternalSecret updater
//!
//! Cluster-access failures keep the underlying kube-rs error so callers can
//! tell a permission problem from a conflict or a missing resource.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for updater operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Missing or invalid process configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// The pod namespace file could not be read
    #[error("failed to read namespace file {}: {source}", path.display())]
    NamespaceFile {
        /// Path of the mounted namespace file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Request body could not be decoded into events
    #[error("decode error: {0}")]
    Decode(String),

    /// Internal/operational error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a decode error with the given message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code of the API error, if this is one
    pub fn api_code(&self) -> Option<u16> {
        match self {
            Error::Kube(kube::Error::Api(ae)) => Some(ae.code),
            _ => None,
        }
    }

    /// The caller lacks RBAC permission for the request
    pub fn is_forbidden(&self) -> bool {
        self.api_code() == Some(403)
    }

    /// The requested resource (or its CRD) does not exist
    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(404)
    }

    /// A write was rejected because the object's resourceVersion is stale
    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }
}

#[cfg(test)]
pub(crate) fn api_error(code: u16, reason: &str) -> Error {
    Error::Kube(kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} ({})", reason.to_lowercase(), code),
        reason: reason.to_string(),
        code,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_classified() {
        let err = api_error(403, "Forbidden");
        assert!(err.is_forbidden());
        assert!(!err.is_conflict());
        assert!(err.to_string().contains("kubernetes error"));
    }

    #[test]
    fn conflict_is_classified() {
        let err = api_error(409, "Conflict");
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn non_api_errors_have_no_code() {
        assert_eq!(Error::config("missing").api_code(), None);
        assert!(!Error::decode("bad json").is_forbidden());
    }

    #[test]
    fn namespace_file_error_names_the_path() {
        let err = Error::NamespaceFile {
            path: PathBuf::from("/var/run/secrets/kubernetes.io/serviceaccount/namespace"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("serviceaccount/namespace"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn error_construction_accepts_str_and_string() {
        let err = Error::config(format!("{} must be set", "BASIC_AUTH_USER"));
        assert!(err.to_string().contains("BASIC_AUTH_USER"));

        match Error::decode("expected array") {
            Error::Decode(msg) => assert_eq!(msg, "expected array"),
            _ => panic!("Expected Decode variant"),
        }
    }
}
