// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! cert-manager `ClusterIssuer` construction and persistence.
//!
//! An issuer describes how certificates are obtained: through ACME (DNS-01 via
//! Cloudflare, or HTTP-01 served by traefik) or self-signed. Options apply in
//! call order. The first ACME option initializes the ACME account; later ones
//! keep it and append their solver, so an issuer can hold several solvers.
//!
//! Issuers are cluster-scoped and always labelled as part of the core tier.
//!
//! # Example
//!
//! ```rust
//! use tawny::issuer::{AcmeDns01, ClusterIssuerBuilder};
//!
//! let issuer = ClusterIssuerBuilder::new()
//!     .acme_dns01(AcmeDns01 {
//!         email: "ops@example.com".into(),
//!         server: "https://acme-v02.api.letsencrypt.org/directory".into(),
//!         private_key_secret: "tawny-acme-account".into(),
//!         api_token_secret: "cloudflare".into(),
//!         api_token_key: "api-token".into(),
//!         dns_zones: vec!["example.com".into()],
//!     })
//!     .build();
//!
//! assert_eq!(issuer.spec.acme.unwrap().solvers.len(), 1);
//! ```

use crate::constants::{
    COMPONENT_CLUSTER_ISSUER, DEFAULT_CLUSTER_ISSUER, HTTP01_INGRESS_CLASS,
    HTTP01_PRIVATE_KEY_PREFIX, HTTP01_SERVICE_TYPE, LETS_ENCRYPT_STAGING,
};
use crate::crd::{
    AcmeChallengeSolver, AcmeChallengeSolverDns01, AcmeChallengeSolverHttp01,
    AcmeChallengeSolverHttp01Ingress, AcmeIssuer, AcmeIssuerDns01ProviderCloudflare,
    CertificateDnsNameSelector, ClusterIssuer, ClusterIssuerSpec, SecretKeySelector,
    SelfSignedIssuer,
};
use crate::errors::ProvisionError;
use crate::labels::build_labels;
use crate::resources::{create_object, replace_with_retry, ObjectApi};
use kube::api::ObjectMeta;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Parameters of an ACME DNS-01 solver backed by Cloudflare.
#[derive(Clone, Debug, Default)]
pub struct AcmeDns01 {
    /// ACME account email, also sent as the Cloudflare account email
    pub email: String,
    /// ACME directory URL
    pub server: String,
    /// Secret holding the ACME account private key
    pub private_key_secret: String,
    /// Secret holding the Cloudflare API token
    pub api_token_secret: String,
    /// Key of the token within `api_token_secret`
    pub api_token_key: String,
    /// Zones this solver answers for
    pub dns_zones: Vec<String>,
}

/// Account key selector used by HTTP-01 issuers: `domain-cert-<name>` for
/// both the secret and the key.
fn http01_private_key_ref(name: &str) -> SecretKeySelector {
    let label = format!("{HTTP01_PRIVATE_KEY_PREFIX}-{name}");
    SecretKeySelector {
        name: label.clone(),
        key: Some(label),
    }
}

/// Desired state of a `ClusterIssuer`.
///
/// Scalar options (`name`, `acme_server`, `self_signed`) overwrite; solver
/// options append. Conflicting strategies are not rejected here.
#[derive(Clone, Debug)]
pub struct ClusterIssuerBuilder {
    name: String,
    spec: ClusterIssuerSpec,
}

impl Default for ClusterIssuerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterIssuerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: DEFAULT_CLUSTER_ISSUER.to_string(),
            spec: ClusterIssuerSpec::default(),
        }
    }

    /// Append a Cloudflare DNS-01 solver for `dns_zones`.
    #[must_use]
    pub fn acme_dns01(mut self, params: AcmeDns01) -> Self {
        let acme = self.spec.acme.get_or_insert_with(|| AcmeIssuer {
            email: params.email.clone(),
            server: params.server.clone(),
            private_key_secret_ref: SecretKeySelector {
                name: params.private_key_secret.clone(),
                key: None,
            },
            solvers: Vec::new(),
        });

        acme.solvers.push(AcmeChallengeSolver {
            selector: Some(CertificateDnsNameSelector {
                dns_zones: params.dns_zones,
                ..CertificateDnsNameSelector::default()
            }),
            dns01: Some(AcmeChallengeSolverDns01 {
                cloudflare: Some(AcmeIssuerDns01ProviderCloudflare {
                    email: Some(params.email),
                    api_token_secret_ref: Some(SecretKeySelector {
                        name: params.api_token_secret,
                        key: Some(params.api_token_key),
                    }),
                }),
            }),
            http01: None,
        });
        self
    }

    /// Append an HTTP-01 solver for the single host `name`, served through the
    /// traefik ingress class. A new ACME account targets Let's Encrypt staging;
    /// use [`Self::acme_server`] to switch.
    #[must_use]
    pub fn acme_http01(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        let email = email.into();
        let name = name.into();

        let acme = self.spec.acme.get_or_insert_with(|| AcmeIssuer {
            email,
            server: LETS_ENCRYPT_STAGING.to_string(),
            private_key_secret_ref: http01_private_key_ref(&name),
            solvers: Vec::new(),
        });

        acme.solvers.push(AcmeChallengeSolver {
            selector: Some(CertificateDnsNameSelector {
                dns_names: vec![name],
                ..CertificateDnsNameSelector::default()
            }),
            dns01: None,
            http01: Some(AcmeChallengeSolverHttp01 {
                ingress: Some(AcmeChallengeSolverHttp01Ingress {
                    service_type: Some(HTTP01_SERVICE_TYPE.to_string()),
                    ingress_class_name: Some(HTTP01_INGRESS_CLASS.to_string()),
                }),
            }),
        });
        self
    }

    /// Point an existing ACME account at another directory. No-op without one.
    #[must_use]
    pub fn acme_server(mut self, server: impl Into<String>) -> Self {
        match self.spec.acme.as_mut() {
            Some(acme) => acme.server = server.into(),
            None => debug!("acme_server applied to an issuer without an ACME block, ignoring"),
        }
        self
    }

    /// Enable self-signed issuance. An existing ACME block is kept.
    #[must_use]
    pub fn self_signed(mut self) -> Self {
        self.spec.self_signed = Some(SelfSignedIssuer {});
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn issuer_name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn build(&self) -> ClusterIssuer {
        ClusterIssuer {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                labels: Some(build_labels(&self.name, COMPONENT_CLUSTER_ISSUER, true)),
                ..ObjectMeta::default()
            },
            spec: self.spec.clone(),
        }
    }
}

/// Fold the ACME solvers of `desired` into `current`.
///
/// A solver is appended only when no solver with an equal selector is already
/// present, so repeated merges are stable. When `current` has no ACME block the
/// whole desired block is adopted. Returns whether `current` changed.
pub fn merge_acme_solvers(current: &mut ClusterIssuerSpec, desired: &ClusterIssuerSpec) -> bool {
    let Some(wanted) = desired.acme.as_ref() else {
        return false;
    };
    let Some(acme) = current.acme.as_mut() else {
        current.acme = Some(wanted.clone());
        return true;
    };

    let mut changed = false;
    for solver in &wanted.solvers {
        if !acme.solvers.iter().any(|s| s.selector == solver.selector) {
            acme.solvers.push(solver.clone());
            changed = true;
        }
    }
    changed
}

/// Submit the issuer described by `builder`.
///
/// # Errors
///
/// Any API error is returned verbatim, including `AlreadyExists`.
pub async fn create_cluster_issuer<A>(
    api: &A,
    builder: &ClusterIssuerBuilder,
    cancel: &CancellationToken,
) -> Result<ClusterIssuer, ProvisionError>
where
    A: ObjectApi<ClusterIssuer> + ?Sized,
{
    create_object(api, &builder.build(), cancel).await
}

/// Replace the spec of the stored issuer `name` with the one `builder`
/// describes. The built spec is computed once, so retries never duplicate
/// solvers.
///
/// # Errors
///
/// Returns the API error verbatim when the issuer does not exist, the last
/// conflict when the retry budget runs out, or [`ProvisionError::Cancelled`].
pub async fn update_cluster_issuer<A>(
    api: &A,
    name: &str,
    builder: &ClusterIssuerBuilder,
    cancel: &CancellationToken,
) -> Result<ClusterIssuer, ProvisionError>
where
    A: ObjectApi<ClusterIssuer> + ?Sized,
{
    let desired = builder.build().spec;
    replace_with_retry(api, name, cancel, |current: &mut ClusterIssuer| {
        current.spec = desired.clone();
    })
    .await
}

#[cfg(test)]
#[path = "issuer_tests.rs"]
mod issuer_tests;
