// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! # Tawny - Domain provisioning for Kubernetes tenants
//!
//! Tawny makes tenant services reachable on their own domains. For every domain
//! it writes three coordinated objects: a cert-manager `ClusterIssuer`, a
//! `Certificate`, and a traefik `IngressRoute` that terminates TLS with the
//! issued certificate.
//!
//! ## Overview
//!
//! - Builders describe desired state with deterministic names and ownership labels
//! - Updates use optimistic concurrency and retry on conflicts
//! - Every cluster call is cancellable
//!
//! ## Modules
//!
//! - [`certificate`], [`issuer`], [`ingress`] - Builders and create/update operations
//! - [`provision`] - End-to-end provisioning of a tenant domain
//! - [`client`] - Cluster access from `KUBECONFIG` or in-cluster credentials
//! - [`resources`], [`retry`] - Generic persistence and conflict retry
//! - [`gvr`], [`unstructured`] - Dynamic resource addressing and access
//! - [`labels`] - Ownership label taxonomy
//! - [`crd`] - Wire types of the cert-manager and traefik resources
//!
//! ## Example
//!
//! ```rust,no_run
//! use tawny::client::ClusterClient;
//! use tawny::provision::{DomainRequest, IssuerStrategy, TlsPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ClusterClient::from_env().await?;
//! let request = DomainRequest {
//!     name: "app".into(),
//!     namespace: "tenant".into(),
//!     domain: "app.example.com".into(),
//!     service_name: "app-svc".into(),
//!     service_namespace: "tenant".into(),
//!     service_port: 8080,
//!     tls: TlsPolicy::Acme(IssuerStrategy::Http01 {
//!         email: "ops@example.com".into(),
//!     }),
//!     middlewares: vec![],
//! };
//!
//! let provisioned = client
//!     .provision_domain(&request, &CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod certificate;
pub mod client;
pub mod constants;
pub mod crd;
pub mod errors;
pub mod gvr;
pub mod ingress;
pub mod issuer;
pub mod labels;
pub mod provision;
pub mod resources;
pub mod retry;
pub mod unstructured;

#[cfg(test)]
mod test_support;
