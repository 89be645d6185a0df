// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Cluster access for the provisioning core.
//!
//! [`ClusterClient`] wraps a single [`kube::Client`]. Typed handles for the core
//! and apps APIs and for the cert-manager and traefik CRDs are derived from it,
//! as are dynamic handles for resources addressed by coordinate. Every call takes
//! a [`CancellationToken`] and is aborted when it fires.
//!
//! # Credentials
//!
//! [`ClusterClient::from_env`] reads the kubeconfig named by `KUBECONFIG` when
//! it is set and non-empty, and otherwise falls back to the in-cluster service
//! account. Failing to load either is fatal for the caller.

use crate::certificate::{self, CertificateBuilder};
use crate::constants::{
    CERTIFICATES_GVR, INGRESS_ROUTES_GVR, KIND_CERTIFICATE, KIND_INGRESS_ROUTE, KUBECONFIG_ENV,
};
use crate::crd::{Certificate, ClusterIssuer, IngressRoute};
use crate::errors::ProvisionError;
use crate::gvr::ResourceCoordinate;
use crate::ingress::{self, IngressRouteBuilder};
use crate::issuer::{self, ClusterIssuerBuilder};
use crate::provision::{self, DomainRequest, ProvisionedDomain};
use crate::retry::cancellable;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{DynamicObject, ListParams, ObjectList};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Kubeconfig path selected by the value of `KUBECONFIG`. Unset and empty
/// values select in-cluster credentials.
#[must_use]
pub fn kubeconfig_path(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Load client configuration from `kubeconfig`, or from the in-cluster
/// service account when no path is given.
///
/// # Errors
///
/// Returns [`ProvisionError::Kubeconfig`] when the file cannot be read or is
/// invalid, and [`ProvisionError::InCluster`] when no service account is mounted.
pub async fn load_config(kubeconfig: Option<&Path>) -> Result<Config, ProvisionError> {
    match kubeconfig {
        Some(path) => {
            debug!(path = %path.display(), "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path)?;
            Ok(Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?)
        }
        None => {
            debug!("Loading in-cluster configuration");
            Ok(Config::incluster()?)
        }
    }
}

/// Handle on the cluster the provisioning core operates against.
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
}

impl ClusterClient {
    /// Build a client from `KUBECONFIG` or in-cluster credentials.
    ///
    /// # Errors
    ///
    /// Returns a credential error when no usable configuration is found, or
    /// [`ProvisionError::ClientBuild`] when the client cannot be constructed.
    pub async fn from_env() -> Result<Self, ProvisionError> {
        let path = kubeconfig_path(std::env::var_os(KUBECONFIG_ENV));
        let config = load_config(path.as_deref()).await?;
        let cluster_url = config.cluster_url.to_string();
        let client = Client::try_from(config).map_err(ProvisionError::ClientBuild)?;

        info!(
            cluster = %cluster_url,
            in_cluster = path.is_none(),
            "Kubernetes client created"
        );
        Ok(Self::new(client))
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn certificates(&self, namespace: &str) -> Api<Certificate> {
        Api::namespaced(self.client.clone(), namespace)
    }

    #[must_use]
    pub fn cluster_issuers(&self) -> Api<ClusterIssuer> {
        Api::all(self.client.clone())
    }

    #[must_use]
    pub fn ingress_routes(&self, namespace: &str) -> Api<IngressRoute> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Dynamic handle for the resource addressed by `coordinate`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::InvalidCoordinate`] when the coordinate has no
    /// resource.
    pub fn dynamic_api(
        &self,
        coordinate: &str,
        kind: &str,
        namespace: &str,
    ) -> Result<Api<DynamicObject>, ProvisionError> {
        let ar = ResourceCoordinate::resolve(coordinate).api_resource(kind)?;
        Ok(Api::namespaced_with(self.client.clone(), namespace, &ar))
    }

    // ------------------------------------------------------------------------
    // Dynamic listings
    // ------------------------------------------------------------------------

    /// Ingress routes in `namespace`; each one is a domain served to a tenant.
    ///
    /// # Errors
    ///
    /// Returns the API error verbatim or [`ProvisionError::Cancelled`].
    pub async fn list_domains(
        &self,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<ObjectList<DynamicObject>, ProvisionError> {
        let api = self.dynamic_api(INGRESS_ROUTES_GVR, KIND_INGRESS_ROUTE, namespace)?;
        cancellable(cancel, "list domains", api.list(&ListParams::default())).await
    }

    /// Certificates in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns the API error verbatim or [`ProvisionError::Cancelled`].
    pub async fn list_certificates(
        &self,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<ObjectList<DynamicObject>, ProvisionError> {
        let api = self.dynamic_api(CERTIFICATES_GVR, KIND_CERTIFICATE, namespace)?;
        cancellable(cancel, "list certificates", api.list(&ListParams::default())).await
    }

    // ------------------------------------------------------------------------
    // Typed passthroughs
    // ------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns the API error verbatim or [`ProvisionError::Cancelled`].
    pub async fn get_certificate(
        &self,
        name: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<Certificate, ProvisionError> {
        let api = self.certificates(namespace);
        cancellable(cancel, "get certificate", api.get(name)).await
    }

    /// # Errors
    ///
    /// Returns the API error verbatim or [`ProvisionError::Cancelled`].
    pub async fn list_deployments(
        &self,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<ObjectList<Deployment>, ProvisionError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        cancellable(cancel, "list deployments", api.list(&ListParams::default())).await
    }

    /// # Errors
    ///
    /// Returns the API error verbatim or [`ProvisionError::Cancelled`].
    pub async fn get_deployment(
        &self,
        name: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<Deployment, ProvisionError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        cancellable(cancel, "get deployment", api.get(name)).await
    }

    /// # Errors
    ///
    /// Returns the API error verbatim or [`ProvisionError::Cancelled`].
    pub async fn list_services(
        &self,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<ObjectList<Service>, ProvisionError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        cancellable(cancel, "list services", api.list(&ListParams::default())).await
    }

    /// # Errors
    ///
    /// Returns the API error verbatim or [`ProvisionError::Cancelled`].
    pub async fn get_service(
        &self,
        name: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<Service, ProvisionError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        cancellable(cancel, "get service", api.get(name)).await
    }

    /// # Errors
    ///
    /// Returns the API error verbatim or [`ProvisionError::Cancelled`].
    pub async fn list_pods(
        &self,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<ObjectList<Pod>, ProvisionError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        cancellable(cancel, "list pods", api.list(&ListParams::default())).await
    }

    // ------------------------------------------------------------------------
    // Provisioning writes
    // ------------------------------------------------------------------------

    /// # Errors
    ///
    /// See [`certificate::create_certificate`].
    pub async fn create_certificate(
        &self,
        builder: &CertificateBuilder,
        cancel: &CancellationToken,
    ) -> Result<Certificate, ProvisionError> {
        certificate::create_certificate(&self.certificates(builder.namespace()), builder, cancel)
            .await
    }

    /// # Errors
    ///
    /// See [`certificate::update_certificate`].
    pub async fn update_certificate(
        &self,
        builder: &CertificateBuilder,
        cancel: &CancellationToken,
    ) -> Result<Certificate, ProvisionError> {
        certificate::update_certificate(&self.certificates(builder.namespace()), builder, cancel)
            .await
    }

    /// # Errors
    ///
    /// See [`issuer::create_cluster_issuer`].
    pub async fn create_cluster_issuer(
        &self,
        builder: &ClusterIssuerBuilder,
        cancel: &CancellationToken,
    ) -> Result<ClusterIssuer, ProvisionError> {
        issuer::create_cluster_issuer(&self.cluster_issuers(), builder, cancel).await
    }

    /// # Errors
    ///
    /// See [`issuer::update_cluster_issuer`].
    pub async fn update_cluster_issuer(
        &self,
        name: &str,
        builder: &ClusterIssuerBuilder,
        cancel: &CancellationToken,
    ) -> Result<ClusterIssuer, ProvisionError> {
        issuer::update_cluster_issuer(&self.cluster_issuers(), name, builder, cancel).await
    }

    /// # Errors
    ///
    /// See [`ingress::create_ingress_route`].
    pub async fn create_ingress_route(
        &self,
        builder: &IngressRouteBuilder,
        cancel: &CancellationToken,
    ) -> Result<IngressRoute, ProvisionError> {
        ingress::create_ingress_route(&self.ingress_routes(builder.namespace()), builder, cancel)
            .await
    }

    /// # Errors
    ///
    /// See [`ingress::update_ingress_route`].
    pub async fn update_ingress_route(
        &self,
        builder: &IngressRouteBuilder,
        cancel: &CancellationToken,
    ) -> Result<IngressRoute, ProvisionError> {
        ingress::update_ingress_route(&self.ingress_routes(builder.namespace()), builder, cancel)
            .await
    }

    /// # Errors
    ///
    /// See [`provision::provision_domain`].
    pub async fn provision_domain(
        &self,
        request: &DomainRequest,
        cancel: &CancellationToken,
    ) -> Result<ProvisionedDomain, ProvisionError> {
        provision::provision_domain(
            &self.cluster_issuers(),
            &self.certificates(&request.namespace),
            &self.ingress_routes(&request.namespace),
            request,
            cancel,
        )
        .await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
