// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! cert-manager `Certificate` construction and persistence.
//!
//! A certificate is named after the tenant resource it secures and writes its
//! key pair into `<name>-cert-secret`. By default it is signed by the shared
//! `ClusterIssuer` [`DEFAULT_CLUSTER_ISSUER`].
//!
//! # Example
//!
//! ```rust
//! use tawny::certificate::CertificateBuilder;
//!
//! let cert = CertificateBuilder::new("app", "tenant")
//!     .domain("app.example.com")
//!     .domain("www.app.example.com")
//!     .build();
//!
//! assert_eq!(cert.spec.secret_name, "app-cert-secret");
//! assert_eq!(cert.spec.dns_names.len(), 2);
//! ```

use crate::constants::{
    CERT_SECRET_SUFFIX, COMPONENT_CERTIFICATE, CORE_NAMESPACE, DEFAULT_CLUSTER_ISSUER,
    KIND_CLUSTER_ISSUER,
};
use crate::crd::{Certificate, CertificateSpec, IssuerReference};
use crate::errors::ProvisionError;
use crate::labels::build_labels;
use crate::resources::{create_object, replace_with_retry, ObjectApi};
use kube::api::ObjectMeta;
use tokio_util::sync::CancellationToken;

/// Secret a certificate named `name` writes its key pair into.
#[must_use]
pub fn certificate_secret_name(name: &str) -> String {
    format!("{name}-{CERT_SECRET_SUFFIX}")
}

/// Desired state of a `Certificate`.
///
/// `domain` accumulates; `issuer_kind` and `issuer_name` overwrite earlier calls.
#[derive(Clone, Debug)]
pub struct CertificateBuilder {
    name: String,
    namespace: String,
    dns_names: Vec<String>,
    issuer_kind: String,
    issuer_name: String,
}

impl CertificateBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            dns_names: Vec::new(),
            issuer_kind: KIND_CLUSTER_ISSUER.to_string(),
            issuer_name: DEFAULT_CLUSTER_ISSUER.to_string(),
        }
    }

    /// Add a subject alternative name.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.dns_names.push(domain.into());
        self
    }

    #[must_use]
    pub fn issuer_kind(mut self, kind: impl Into<String>) -> Self {
        self.issuer_kind = kind.into();
        self
    }

    #[must_use]
    pub fn issuer_name(mut self, name: impl Into<String>) -> Self {
        self.issuer_name = name.into();
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

    fn spec(&self) -> CertificateSpec {
        CertificateSpec {
            secret_name: certificate_secret_name(&self.name),
            dns_names: self.dns_names.clone(),
            issuer_ref: IssuerReference {
                name: self.issuer_name.clone(),
                kind: Some(self.issuer_kind.clone()),
                group: None,
            },
        }
    }

    /// Produce the `Certificate`. Objects in the core namespace get core-tier labels.
    #[must_use]
    pub fn build(&self) -> Certificate {
        Certificate {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(build_labels(
                    &self.name,
                    COMPONENT_CERTIFICATE,
                    self.namespace == CORE_NAMESPACE,
                )),
                ..ObjectMeta::default()
            },
            spec: self.spec(),
        }
    }
}

/// Submit the certificate described by `builder`.
///
/// # Errors
///
/// Any API error is returned verbatim, including `AlreadyExists`.
pub async fn create_certificate<A>(
    api: &A,
    builder: &CertificateBuilder,
    cancel: &CancellationToken,
) -> Result<Certificate, ProvisionError>
where
    A: ObjectApi<Certificate> + ?Sized,
{
    create_object(api, &builder.build(), cancel).await
}

/// Replace the spec of an existing certificate with the one `builder` describes.
///
/// # Errors
///
/// Returns the API error verbatim when the certificate does not exist, the last
/// conflict when the retry budget runs out, or [`ProvisionError::Cancelled`].
pub async fn update_certificate<A>(
    api: &A,
    builder: &CertificateBuilder,
    cancel: &CancellationToken,
) -> Result<Certificate, ProvisionError>
where
    A: ObjectApi<Certificate> + ?Sized,
{
    let desired = builder.spec();
    replace_with_retry(api, builder.name(), cancel, |current: &mut Certificate| {
        current.spec = desired.clone();
    })
    .await
}

#[cfg(test)]
#[path = "certificate_tests.rs"]
mod certificate_tests;
