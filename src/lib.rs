//! ExternalSecret updater - reloads ExternalSecrets on secret-manager events
//!
//! A secret manager POSTs change events to a webhook. For each event the
//! updater finds every `external-secrets.io` ExternalSecret whose data
//! references the changed item and touches its annotations, prompting the
//! External Secrets Operator to re-sync the Kubernetes Secret.
//!
//! # Modules
//!
//! - [`webhook`] - HTTP server, basic auth and event intake
//! - [`event`] - Event payload decoding
//! - [`reloader`] - Namespace scan and match/update orchestration
//! - [`matcher`] - Decides whether an ExternalSecret references an item
//! - [`updater`] - Annotation writes and the cache-buster second update
//! - [`namespaces`] - Namespace enumeration with pod-namespace fallback
//! - [`store`] - Cluster access behind a mockable trait
//! - [`document`] - Shape-checked lookups into untyped resource documents
//! - [`eso`] - ExternalSecret resource type and annotation keys
//! - [`kube_utils`] - API resource helpers and client construction
//! - [`config`] - Command line and environment configuration
//! - [`telemetry`] - Structured logging and OTLP export
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod config;
pub mod document;
pub mod error;
pub mod eso;
pub mod event;
pub mod kube_utils;
pub mod matcher;
pub mod namespaces;
pub mod reloader;
pub mod store;
pub mod telemetry;
pub mod updater;
pub mod webhook;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
