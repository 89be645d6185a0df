// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! End-to-end provisioning of a tenant domain.
//!
//! [`provision_domain`] turns a [`DomainRequest`] into the objects that make a
//! domain reachable:
//!
//! 1. **ClusterIssuer** - created when the TLS policy needs one and it is
//!    missing. An existing issuer is shared between tenants: the request's
//!    solver is appended to it unless a solver for the same selector is there.
//! 2. **Certificate** - requested for the domain, written into
//!    `<name>-cert-secret`.
//! 3. **IngressRoute** - routes the domain to the tenant service, terminating
//!    TLS with the certificate secret when there is one.
//!
//! Every step is idempotent: an object that already exists has its spec
//! replaced under conflict retry instead of failing the request.
//!
//! Routes are named after their entry point, so switching a domain from plain
//! HTTP to TLS writes a new `websecure` route. The old `web` route keeps
//! serving the host until it is deleted; provisioning only logs a warning.

use crate::certificate::{create_certificate, update_certificate, CertificateBuilder};
use crate::crd::{Certificate, ClusterIssuer, IngressRoute};
use crate::errors::ProvisionError;
use crate::ingress::{ingress_route_name, EntryPoint, HostRoute, IngressRouteBuilder};
use crate::issuer::{
    create_cluster_issuer, merge_acme_solvers, AcmeDns01, ClusterIssuerBuilder,
};
use crate::resources::{create_object, replace_with_retry, ObjectApi};
use crate::retry::cancellable;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How the issuer for a TLS-terminated domain proves domain ownership.
#[derive(Clone, Debug)]
pub enum IssuerStrategy {
    /// DNS-01 through Cloudflare, for every name under the configured zones
    Dns01(AcmeDns01),
    /// HTTP-01 served by traefik, for the requested domain only
    Http01 {
        /// ACME account email
        email: String,
    },
}

/// Whether and how a domain is served over TLS.
#[derive(Clone, Debug, Default)]
pub enum TlsPolicy {
    /// Plain HTTP on the `web` entry point
    #[default]
    None,
    /// HTTPS on the `websecure` entry point with an ACME-issued certificate
    Acme(IssuerStrategy),
}

/// A tenant's request to serve `domain` from one of its services.
#[derive(Clone, Debug, Default)]
pub struct DomainRequest {
    /// Tenant resource the objects are named after
    pub name: String,
    /// Tenant namespace the certificate and route live in
    pub namespace: String,
    pub domain: String,
    pub service_name: String,
    pub service_namespace: String,
    pub service_port: i32,
    pub tls: TlsPolicy,
    /// traefik middlewares applied to the route, in order
    pub middlewares: Vec<String>,
}

/// Objects as stored after provisioning.
#[derive(Clone, Debug)]
pub struct ProvisionedDomain {
    /// The issuer, when the TLS policy requires one
    pub issuer: Option<ClusterIssuer>,
    pub certificate: Option<Certificate>,
    pub ingress_route: IngressRoute,
}

impl DomainRequest {
    fn issuer_builder(strategy: &IssuerStrategy, domain: &str) -> ClusterIssuerBuilder {
        match strategy {
            IssuerStrategy::Dns01(params) => ClusterIssuerBuilder::new().acme_dns01(params.clone()),
            IssuerStrategy::Http01 { email } => {
                ClusterIssuerBuilder::new().acme_http01(email.clone(), domain)
            }
        }
    }

    fn certificate_builder(&self, issuer_name: &str) -> CertificateBuilder {
        CertificateBuilder::new(&self.name, &self.namespace)
            .domain(&self.domain)
            .issuer_name(issuer_name)
    }

    fn ingress_route_builder(&self, tls_secret: Option<&str>) -> IngressRouteBuilder {
        let route = self.middlewares.iter().fold(
            HostRoute::new(
                &self.domain,
                &self.service_name,
                &self.service_namespace,
                self.service_port,
            ),
            |route, middleware| route.middleware(middleware),
        );

        let builder = IngressRouteBuilder::new(&self.name, &self.namespace).route(route);
        match tls_secret {
            Some(secret) => builder
                .entry_point(EntryPoint::WebSecure.as_str())
                .tls(secret),
            None => builder.entry_point(EntryPoint::Web.as_str()),
        }
    }
}

/// Create the issuer, or fold the builder's solvers into the existing one.
async fn ensure_cluster_issuer<I>(
    issuers: &I,
    builder: &ClusterIssuerBuilder,
    cancel: &CancellationToken,
) -> Result<ClusterIssuer, ProvisionError>
where
    I: ObjectApi<ClusterIssuer> + ?Sized,
{
    let name = builder.issuer_name();
    let mut existing =
        match cancellable(cancel, &format!("get ClusterIssuer {name}"), issuers.get(name)).await {
            Ok(existing) => existing,
            Err(e) if e.is_not_found() => {
                return create_cluster_issuer(issuers, builder, cancel).await;
            }
            Err(e) => return Err(e),
        };

    let desired = builder.build().spec;
    if !merge_acme_solvers(&mut existing.spec, &desired) {
        debug!(issuer = %name, "ClusterIssuer already has the solver, reusing it");
        return Ok(existing);
    }

    info!(issuer = %name, "Adding solver to shared ClusterIssuer");
    replace_with_retry(issuers, name, cancel, |current: &mut ClusterIssuer| {
        merge_acme_solvers(&mut current.spec, &desired);
    })
    .await
}

/// Warn when a plain-HTTP route for the same tenant still exists next to the
/// TLS route being written.
async fn warn_on_plain_route<R>(
    routes: &R,
    request: &DomainRequest,
    cancel: &CancellationToken,
) -> Result<(), ProvisionError>
where
    R: ObjectApi<IngressRoute> + ?Sized,
{
    let web_name = ingress_route_name(&request.name, &request.namespace, EntryPoint::Web);
    let operation_name = format!("get IngressRoute {web_name}");
    match cancellable(cancel, &operation_name, routes.get(&web_name)).await {
        Ok(_) => {
            warn!(
                route = %web_name,
                domain = %request.domain,
                "Plain HTTP IngressRoute still serves this domain, delete it to stop HTTP traffic"
            );
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Provision everything `request` needs to be served.
///
/// # Errors
///
/// Returns the first error encountered. Objects written by earlier steps are
/// left in place; re-running the request converges them.
pub async fn provision_domain<I, C, R>(
    issuers: &I,
    certificates: &C,
    routes: &R,
    request: &DomainRequest,
    cancel: &CancellationToken,
) -> Result<ProvisionedDomain, ProvisionError>
where
    I: ObjectApi<ClusterIssuer> + ?Sized,
    C: ObjectApi<Certificate> + ?Sized,
    R: ObjectApi<IngressRoute> + ?Sized,
{
    info!(
        name = %request.name,
        namespace = %request.namespace,
        domain = %request.domain,
        "Provisioning domain"
    );

    let (issuer, certificate) = match &request.tls {
        TlsPolicy::None => (None, None),
        TlsPolicy::Acme(strategy) => {
            let issuer_builder = DomainRequest::issuer_builder(strategy, &request.domain);
            let issuer = ensure_cluster_issuer(issuers, &issuer_builder, cancel).await?;

            let cert_builder = request.certificate_builder(issuer_builder.issuer_name());
            let certificate = match create_certificate(certificates, &cert_builder, cancel).await {
                Err(e) if e.is_already_exists() => {
                    debug!(name = %request.name, "Certificate exists, updating it");
                    update_certificate(certificates, &cert_builder, cancel).await?
                }
                other => other?,
            };

            (Some(issuer), Some(certificate))
        }
    };

    let tls_secret = certificate.as_ref().map(|c| c.spec.secret_name.as_str());
    let route_builder = request.ingress_route_builder(tls_secret);
    let route = route_builder.build();
    let ingress_route = match create_object(routes, &route, cancel).await {
        Err(e) if e.is_already_exists() => {
            debug!(route = %route_builder.object_name(), "IngressRoute exists, updating it");
            let desired = route.spec.clone();
            let name = route_builder.object_name();
            replace_with_retry(routes, &name, cancel, |current: &mut IngressRoute| {
                current.spec = desired.clone();
            })
            .await?
        }
        other => other?,
    };

    if tls_secret.is_some() {
        warn_on_plain_route(routes, request, cancel).await?;
    }

    info!(
        name = %request.name,
        namespace = %request.namespace,
        route = %route_builder.object_name(),
        tls = tls_secret.is_some(),
        "Domain provisioned"
    );

    Ok(ProvisionedDomain {
        issuer,
        certificate,
        ingress_route,
    })
}

#[cfg(test)]
#[path = "provision_tests.rs"]
mod provision_tests;
