// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Typed wire shapes for the custom resources tawny writes.
//!
//! These types are not owned by tawny; they mirror the subset of the
//! cert-manager and traefik APIs the builders populate. Fields tawny never sets
//! are omitted, and optional fields are skipped when empty so the serialized
//! manifests stay minimal.
//!
//! # Resource Types
//!
//! - [`Certificate`] - `cert-manager.io/v1`, namespaced
//! - [`ClusterIssuer`] - `cert-manager.io/v1`, cluster-scoped
//! - [`IngressRoute`] - `traefik.io/v1alpha1`, namespaced
//!
//! See <https://cert-manager.io/docs/reference/api-docs/> and
//! <https://doc.traefik.io/traefik/routing/providers/kubernetes-crd/>.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// cert-manager: Certificate
// ============================================================================

/// A request for a TLS certificate, written into `secretName` once issued.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "Certificate",
    namespaced,
    doc = "Certificate requests a TLS certificate from an issuer and stores it in a secret."
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Secret the issued key pair is written to.
    pub secret_name: String,

    /// Subject alternative names. Accumulates one entry per domain option.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,

    /// Issuer that signs the certificate.
    pub issuer_ref: IssuerReference,
}

/// Reference to an `Issuer` or `ClusterIssuer`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuerReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

// ============================================================================
// cert-manager: ClusterIssuer
// ============================================================================

/// Cluster-scoped certificate authority configuration.
///
/// Exactly one strategy is expected, but both blocks may be present; the API
/// server's admission is the authority on validity.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "ClusterIssuer",
    doc = "ClusterIssuer describes how certificates are obtained for any namespace."
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIssuerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acme: Option<AcmeIssuer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_signed: Option<SelfSignedIssuer>,
}

/// ACME account and challenge solvers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcmeIssuer {
    /// Contact email registered with the ACME server.
    pub email: String,

    /// ACME directory URL.
    pub server: String,

    /// Secret holding the ACME account private key.
    pub private_key_secret_ref: SecretKeySelector,

    /// Challenge solvers; tried in order of selector specificity by cert-manager.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub solvers: Vec<AcmeChallengeSolver>,
}

/// Reference to a key within a secret.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcmeChallengeSolver {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<CertificateDnsNameSelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns01: Option<AcmeChallengeSolverDns01>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http01: Option<AcmeChallengeSolverHttp01>,
}

/// Restricts a solver to specific names or zones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDnsNameSelector {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_zones: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcmeChallengeSolverDns01 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudflare: Option<AcmeIssuerDns01ProviderCloudflare>,
}

/// Cloudflare DNS-01 provider credentials.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcmeIssuerDns01ProviderCloudflare {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token_secret_ref: Option<SecretKeySelector>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcmeChallengeSolverHttp01 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<AcmeChallengeSolverHttp01Ingress>,
}

/// Ingress that serves HTTP-01 challenge responses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcmeChallengeSolverHttp01Ingress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_class_name: Option<String>,
}

/// Marker for self-signed issuance; serialized as `{}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelfSignedIssuer {}

// ============================================================================
// traefik: IngressRoute
// ============================================================================

/// Host routing rules bound to traefik entry points.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "traefik.io",
    version = "v1alpha1",
    kind = "IngressRoute",
    namespaced,
    doc = "IngressRoute routes matching requests to backend services through traefik."
)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_points: Vec<String>,

    #[serde(default)]
    pub routes: Vec<Route>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<Tls>,
}

/// A single match rule and the services it forwards to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Traefik rule expression, e.g. ``Host(`app.example.com`)``.
    #[serde(rename = "match")]
    pub match_: String,

    pub kind: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<RouteService>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middlewares: Vec<MiddlewareRef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteService {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<IntOrString>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MiddlewareRef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// TLS termination settings of an `IngressRoute`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tls {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_name: String,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
