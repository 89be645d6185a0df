// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! traefik `IngressRoute` construction, naming and persistence.
//!
//! An ingress route maps tenant hosts to backend services. Its object name is
//! derived from the tenant resource it serves:
//!
//! ```text
//! <namespace>-<name>-<entry-point>-ingressroute
//! ```
//!
//! where the entry point is `websecure` once a TLS secret is configured and
//! `web` otherwise. The name is decided after every option has been applied, so
//! option order never changes it.
//!
//! # Example
//!
//! ```rust
//! use tawny::ingress::{HostRoute, IngressRouteBuilder};
//!
//! let route = IngressRouteBuilder::new("app", "tenant")
//!     .route(HostRoute::new("app.example.com", "app-svc", "tenant", 8080))
//!     .entry_point("websecure")
//!     .tls("app-cert-secret")
//!     .build();
//!
//! assert_eq!(
//!     route.metadata.name.as_deref(),
//!     Some("tenant-app-websecure-ingressroute")
//! );
//! ```

use crate::constants::{COMPONENT_INGRESS_ROUTE, CORE_NAMESPACE, INGRESS_ROUTE_SUFFIX};
use crate::crd::{IngressRoute, IngressRouteSpec, MiddlewareRef, Route, RouteService, Tls};
use crate::errors::ProvisionError;
use crate::labels::build_labels;
use crate::resources::{create_object, replace_with_retry, ObjectApi};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Route kind traefik expects for host rules
const ROUTE_KIND_RULE: &str = "Rule";

/// Backend kind for plain Kubernetes services
const SERVICE_KIND: &str = "Service";

/// traefik entry points tawny binds routes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryPoint {
    /// Plain HTTP
    Web,
    /// TLS-terminated HTTPS
    WebSecure,
}

impl EntryPoint {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::WebSecure => "websecure",
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid entry point: {0}")]
pub struct InvalidEntryPoint(pub String);

impl FromStr for EntryPoint {
    type Err = InvalidEntryPoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "websecure" => Ok(Self::WebSecure),
            other => Err(InvalidEntryPoint(other.to_string())),
        }
    }
}

/// Object name of the ingress route serving `name` in `namespace`.
#[must_use]
pub fn ingress_route_name(name: &str, namespace: &str, entry_point: EntryPoint) -> String {
    format!("{namespace}-{name}-{entry_point}-{INGRESS_ROUTE_SUFFIX}")
}

/// A host rule and the service it forwards to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostRoute {
    pub host: String,
    pub service_name: String,
    pub service_namespace: String,
    pub service_port: i32,
    /// Names of traefik middlewares applied to the route, in order
    pub middlewares: Vec<String>,
}

impl HostRoute {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        service_name: impl Into<String>,
        service_namespace: impl Into<String>,
        service_port: i32,
    ) -> Self {
        Self {
            host: host.into(),
            service_name: service_name.into(),
            service_namespace: service_namespace.into(),
            service_port,
            middlewares: Vec::new(),
        }
    }

    #[must_use]
    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middlewares.push(name.into());
        self
    }

    fn to_route(&self) -> Route {
        Route {
            match_: format!("Host(`{}`)", self.host),
            kind: ROUTE_KIND_RULE.to_string(),
            services: vec![RouteService {
                name: self.service_name.clone(),
                kind: Some(SERVICE_KIND.to_string()),
                namespace: Some(self.service_namespace.clone()),
                port: Some(IntOrString::Int(self.service_port)),
            }],
            middlewares: self
                .middlewares
                .iter()
                .map(|name| MiddlewareRef {
                    name: name.clone(),
                    namespace: None,
                })
                .collect(),
        }
    }
}

/// Desired state of an `IngressRoute`.
///
/// `route` and `entry_point` append; `tls` overwrites.
#[derive(Clone, Debug)]
pub struct IngressRouteBuilder {
    name: String,
    namespace: String,
    spec: IngressRouteSpec,
}

impl IngressRouteBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            spec: IngressRouteSpec::default(),
        }
    }

    #[must_use]
    pub fn route(mut self, route: HostRoute) -> Self {
        self.spec.routes.push(route.to_route());
        self
    }

    /// Terminate TLS with the key pair in `secret_name`.
    #[must_use]
    pub fn tls(mut self, secret_name: impl Into<String>) -> Self {
        self.spec.tls = Some(Tls {
            secret_name: secret_name.into(),
        });
        self
    }

    /// Bind the route to a traefik entry point. Unknown entry points are logged
    /// and skipped.
    #[must_use]
    pub fn entry_point(mut self, entry_point: &str) -> Self {
        match entry_point.parse::<EntryPoint>() {
            Ok(ep) => self.spec.entry_points.push(ep.as_str().to_string()),
            Err(e) => error!(
                name = %self.name,
                namespace = %self.namespace,
                "{e}, ignoring"
            ),
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Entry point the object name is derived from.
    #[must_use]
    pub fn naming_entry_point(&self) -> EntryPoint {
        match &self.spec.tls {
            Some(tls) if !tls.secret_name.is_empty() => EntryPoint::WebSecure,
            _ => EntryPoint::Web,
        }
    }

    /// Object name the built route will carry.
    #[must_use]
    pub fn object_name(&self) -> String {
        ingress_route_name(&self.name, &self.namespace, self.naming_entry_point())
    }

    #[must_use]
    pub fn build(&self) -> IngressRoute {
        IngressRoute {
            metadata: ObjectMeta {
                name: Some(self.object_name()),
                namespace: Some(self.namespace.clone()),
                labels: Some(build_labels(
                    &self.name,
                    COMPONENT_INGRESS_ROUTE,
                    self.namespace == CORE_NAMESPACE,
                )),
                ..ObjectMeta::default()
            },
            spec: self.spec.clone(),
        }
    }
}

/// Submit the ingress route described by `builder`.
///
/// # Errors
///
/// Any API error is returned verbatim, including `AlreadyExists`.
pub async fn create_ingress_route<A>(
    api: &A,
    builder: &IngressRouteBuilder,
    cancel: &CancellationToken,
) -> Result<IngressRoute, ProvisionError>
where
    A: ObjectApi<IngressRoute> + ?Sized,
{
    create_object(api, &builder.build(), cancel).await
}

/// Replace the spec of the TLS-terminated route serving the builder's name.
///
/// Updates always target the `websecure` object; plain `web` routes are only
/// ever created.
///
/// # Errors
///
/// Returns the API error verbatim when no `websecure` route exists, the last
/// conflict when the retry budget runs out, or [`ProvisionError::Cancelled`].
pub async fn update_ingress_route<A>(
    api: &A,
    builder: &IngressRouteBuilder,
    cancel: &CancellationToken,
) -> Result<IngressRoute, ProvisionError>
where
    A: ObjectApi<IngressRoute> + ?Sized,
{
    let name = ingress_route_name(builder.name(), builder.namespace(), EntryPoint::WebSecure);
    let desired = builder.spec.clone();
    replace_with_retry(api, &name, cancel, |current: &mut IngressRoute| {
        current.spec = desired.clone();
    })
    .await
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod ingress_tests;
