// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Generic resource creation and update helpers for Kubernetes resources.
//!
//! The builders in this crate only describe desired state; persisting it goes
//! through the functions here. They operate on any [`ObjectApi`], the narrow seam
//! over a typed API handle. [`kube::Api`] implements it for real clusters and
//! tests substitute in-memory doubles.
//!
//! # Strategies
//!
//! - **Create**: submit the object; any API error (including `AlreadyExists`)
//!   is returned verbatim.
//! - **Replace spec with retry**: fetch the stored object, overwrite only the
//!   parts the caller owns, and replace it under optimistic concurrency, retrying
//!   the full cycle on conflicts. A missing object is an error, never a create.
//!
//! # Example
//!
//! ```rust,no_run
//! use kube::{Api, Client};
//! use tawny::certificate::CertificateBuilder;
//! use tawny::crd::Certificate;
//! use tawny::resources::create_object;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = Client::try_default().await?;
//! let api: Api<Certificate> = Api::namespaced(client, "tenant");
//! let cert = CertificateBuilder::new("app", "tenant")
//!     .domain("app.example.com")
//!     .build();
//!
//! create_object(&api, &cert, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::FIELD_MANAGER;
use crate::errors::ProvisionError;
use crate::retry::{cancellable, retry_on_conflict};
use async_trait::async_trait;
use kube::api::PostParams;
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The get/create/replace calls the provisioning core needs from a typed API.
#[async_trait]
pub trait ObjectApi<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// Fetch an object by name.
    async fn get(&self, name: &str) -> Result<K, kube::Error>;

    /// Create a new object.
    async fn create(&self, object: &K) -> Result<K, kube::Error>;

    /// Replace an existing object. The object's `resourceVersion` is the
    /// optimistic-concurrency precondition.
    async fn replace(&self, name: &str, object: &K) -> Result<K, kube::Error>;
}

#[async_trait]
impl<K> ObjectApi<K> for Api<K>
where
    K: Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
{
    async fn get(&self, name: &str) -> Result<K, kube::Error> {
        Api::get(self, name).await
    }

    async fn create(&self, object: &K) -> Result<K, kube::Error> {
        Api::create(self, &post_params(), object).await
    }

    async fn replace(&self, name: &str, object: &K) -> Result<K, kube::Error> {
        Api::replace(self, name, &post_params(), object).await
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..PostParams::default()
    }
}

/// Name of a built object, required before it can be submitted.
///
/// # Errors
///
/// Returns [`ProvisionError::MissingName`] when `metadata.name` is unset.
pub fn object_name<K>(object: &K) -> Result<&str, ProvisionError>
where
    K: Resource<DynamicType = ()>,
{
    object
        .meta()
        .name
        .as_deref()
        .ok_or_else(|| ProvisionError::MissingName {
            kind: K::kind(&()).to_string(),
        })
}

/// Create a resource, surfacing any API error unchanged.
///
/// # Errors
///
/// Returns an error if:
/// - The resource has no name in its metadata
/// - The API rejects the create (already exists, validation, admission)
/// - `cancel` fires before the call completes
pub async fn create_object<K, A>(
    api: &A,
    object: &K,
    cancel: &CancellationToken,
) -> Result<K, ProvisionError>
where
    K: Resource<DynamicType = ()> + Send + Sync + 'static,
    A: ObjectApi<K> + ?Sized,
{
    let name = object_name(object)?;
    let kind = K::kind(&());
    let namespace = object.meta().namespace.as_deref().unwrap_or_default();

    debug!(kind = %kind, namespace = %namespace, name = %name, "Creating resource");

    let created = cancellable(cancel, &format!("create {kind} {name}"), api.create(object)).await?;

    info!("Created {} {}/{}", kind, namespace, name);
    Ok(created)
}

/// Fetch `name`, apply `apply_desired` to it and replace it, retrying the whole
/// cycle on optimistic-lock conflicts.
///
/// `apply_desired` runs once per attempt on a freshly fetched object, so it must
/// set fields to their desired values rather than accumulate onto them.
///
/// # Errors
///
/// Returns an error if:
/// - The object does not exist (returned verbatim; nothing is created)
/// - The API rejects the replace for a reason other than a conflict
/// - Conflicts persist past the retry budget
/// - `cancel` fires
pub async fn replace_with_retry<K, A, F>(
    api: &A,
    name: &str,
    cancel: &CancellationToken,
    apply_desired: F,
) -> Result<K, ProvisionError>
where
    K: Resource<DynamicType = ()> + Send + Sync + 'static,
    A: ObjectApi<K> + ?Sized,
    F: Fn(&mut K) + Sync,
{
    let kind = K::kind(&());
    let operation_name = format!("update {kind} {name}");
    let apply_desired = &apply_desired;

    debug!(kind = %kind, name = %name, "Updating resource with conflict retry");

    let updated = retry_on_conflict(
        move || async move {
            let mut current = api.get(name).await?;
            apply_desired(&mut current);
            api.replace(name, &current).await
        },
        &operation_name,
        cancel,
    )
    .await?;

    info!("Updated {} {}", kind, name);
    Ok(updated)
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
