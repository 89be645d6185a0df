// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Global constants for tawny domain provisioning.
//!
//! This module contains all string and numeric constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Application Constants
// ============================================================================

/// Application name, used as label prefix value and reserved namespace
pub const APP_NAME: &str = "tawny";

/// Namespace reserved for the system's own workloads (tier escalation applies here)
pub const CORE_NAMESPACE: &str = "tawny";

/// Suffix appended to every canonical label value for objects in the core tier
pub const CORE_TIER_SUFFIX: &str = "-core";

/// Default `ClusterIssuer` name used by certificates unless overridden
pub const DEFAULT_CLUSTER_ISSUER: &str = "tawny-clusterissuer";

/// Suffix of the secret a certificate writes its key pair into
pub const CERT_SECRET_SUFFIX: &str = "cert-secret";

/// Fixed trailing segment of every generated `IngressRoute` name
pub const INGRESS_ROUTE_SUFFIX: &str = "ingressroute";

/// Prefix of the ACME account private key secret for HTTP-01 issuers
pub const HTTP01_PRIVATE_KEY_PREFIX: &str = "domain-cert";

// ============================================================================
// ACME Constants
// ============================================================================

/// Let's Encrypt staging directory (default for HTTP-01 issuers)
pub const LETS_ENCRYPT_STAGING: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Let's Encrypt production directory
pub const LETS_ENCRYPT_PRODUCTION: &str = "https://acme-v02.api.letsencrypt.org/directory";

/// Ingress class that serves HTTP-01 challenges
pub const HTTP01_INGRESS_CLASS: &str = "traefik";

/// Service type used for HTTP-01 challenge solvers
pub const HTTP01_SERVICE_TYPE: &str = "ClusterIP";

// ============================================================================
// API Constants
// ============================================================================

/// API group of cert-manager resources
pub const CERT_MANAGER_GROUP: &str = "cert-manager.io";

/// API version of cert-manager resources
pub const CERT_MANAGER_VERSION: &str = "v1";

/// API group of traefik resources
pub const TRAEFIK_GROUP: &str = "traefik.io";

/// API version of traefik resources
pub const TRAEFIK_VERSION: &str = "v1alpha1";

/// Kind name for cert-manager `Certificate`
pub const KIND_CERTIFICATE: &str = "Certificate";

/// Kind name for cert-manager `ClusterIssuer`
pub const KIND_CLUSTER_ISSUER: &str = "ClusterIssuer";

/// Kind name for traefik `IngressRoute`
pub const KIND_INGRESS_ROUTE: &str = "IngressRoute";

/// Resource coordinate of traefik ingress routes (the "domains" of a tenant)
pub const INGRESS_ROUTES_GVR: &str = "traefik.io/v1alpha1/ingressroutes";

/// Resource coordinate of cert-manager certificates
pub const CERTIFICATES_GVR: &str = "cert-manager.io/v1/certificates";

// ============================================================================
// Label Component Values
// ============================================================================

/// Component value for `Certificate` objects
pub const COMPONENT_CERTIFICATE: &str = "certificate";

/// Component value for `ClusterIssuer` objects
pub const COMPONENT_CLUSTER_ISSUER: &str = "clusterissuer";

/// Component value for `IngressRoute` objects
pub const COMPONENT_INGRESS_ROUTE: &str = "ingressroute";

/// Maximum length of a Kubernetes label value
pub const MAX_LABEL_VALUE_LEN: usize = 63;

// ============================================================================
// Conflict Retry Constants
// ============================================================================

/// Total attempts of a get-mutate-replace cycle before a conflict is surfaced
pub const CONFLICT_RETRY_ATTEMPTS: u32 = 5;

/// Interval between conflict retries (10ms)
pub const CONFLICT_RETRY_INTERVAL_MILLIS: u64 = 10;

/// Backoff multiplier between conflict retries (constant interval)
pub const CONFLICT_RETRY_FACTOR: f64 = 1.0;

/// Randomization factor for conflict retries (±10%)
pub const CONFLICT_RETRY_JITTER: f64 = 0.1;

// ============================================================================
// Environment Constants
// ============================================================================

/// Environment variable holding an out-of-cluster kubeconfig path
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Field manager recorded on objects this crate writes
pub const FIELD_MANAGER: &str = "tawny";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;
