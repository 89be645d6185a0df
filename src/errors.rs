// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Error types for domain provisioning.
//!
//! Errors originating from the cluster API are carried through unchanged in
//! [`ProvisionError::Kube`], so callers can inspect the status code and reason the
//! API server returned. Only the conflict retry in [`crate::retry`] consumes errors
//! locally, and even then the last attempt's error is surfaced verbatim.
//!
//! Translating these errors into user-facing messages is left to the caller.

use thiserror::Error;

/// HTTP status the API server uses for conflicts and already-existing objects
const HTTP_CONFLICT: u16 = 409;

/// HTTP status for objects that do not exist
const HTTP_NOT_FOUND: u16 = 404;

/// Errors returned by the provisioning core.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Any error returned by the Kubernetes API (validation, admission, not found,
    /// or the final optimistic-lock conflict after retries).
    #[error(transparent)]
    Kube(#[from] kube::Error),

    /// The caller's cancellation token fired while the operation was in flight.
    #[error("operation '{operation}' was cancelled")]
    Cancelled {
        /// Human-readable name of the cancelled operation
        operation: String,
    },

    /// A resource coordinate that failed to parse was used to address the API.
    #[error("invalid resource coordinate '{raw}': resource is empty")]
    InvalidCoordinate {
        /// The raw coordinate string as given by the caller
        raw: String,
    },

    /// An object was submitted without `metadata.name`.
    #[error("{kind} must have a name")]
    MissingName {
        /// Kind of the object that had no name
        kind: String,
    },

    /// The kubeconfig named by `KUBECONFIG` could not be read or loaded.
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// In-cluster service account credentials are unavailable.
    #[error("failed to load in-cluster configuration: {0}")]
    InCluster(#[from] kube::config::InClusterError),

    /// The Kubernetes client could not be constructed from a valid configuration.
    #[error("failed to create kubernetes client: {0}")]
    ClientBuild(#[source] kube::Error),
}

impl ProvisionError {
    /// Returns `true` when the API server rejected a write because the stored
    /// `resourceVersion` changed since the object was read.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Kube(e) if is_conflict(e))
    }

    /// Returns `true` when the API server reported the target object missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Kube(kube::Error::Api(ae)) if ae.code == HTTP_NOT_FOUND)
    }

    /// Returns `true` when a create targeted an object that already exists.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::Kube(kube::Error::Api(ae))
                if ae.code == HTTP_CONFLICT && ae.reason == "AlreadyExists"
        )
    }

    /// Returns `true` when the error came from the caller's cancellation token.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Determine if a Kubernetes error is an optimistic-concurrency conflict.
///
/// `AlreadyExists` shares the 409 status code but is not retryable, so the
/// reason is checked as well.
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => api_err.code == HTTP_CONFLICT && api_err.reason == "Conflict",
        _ => false,
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
