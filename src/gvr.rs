// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Resource coordinates (`group/version/resource[:subresource]`).
//!
//! A [`ResourceCoordinate`] addresses any resource type on the API server,
//! including custom resources unknown at compile time. Coordinates are parsed
//! from a compact string form and are never checked against API discovery: a
//! typo yields a coordinate that fails once it reaches the API server.
//!
//! # Parsing Rules
//!
//! 1. Split on `:`; if exactly two parts result, the second is the subresource.
//! 2. Split the remainder on `/`.
//! 3. Three segments are `group/version/resource`, two are `version/resource`
//!    (core API group), one is `resource`.
//! 4. Any other segment count is logged and yields a coordinate with only the
//!    raw string set. Its resource is empty and [`ResourceCoordinate::is_valid`]
//!    returns `false`.
//!
//! # Example
//!
//! ```rust
//! use tawny::gvr::ResourceCoordinate;
//!
//! let gvr = ResourceCoordinate::resolve("traefik.io/v1alpha1/ingressroutes");
//! assert_eq!(gvr.group(), "traefik.io");
//! assert_eq!(gvr.version(), "v1alpha1");
//! assert_eq!(gvr.resource(), "ingressroutes");
//!
//! let pods = ResourceCoordinate::resolve("v1/pods:log");
//! assert_eq!(pods.group(), "");
//! assert_eq!(pods.subresource(), "log");
//!
//! assert!(!ResourceCoordinate::resolve("a/b/c/d").is_valid());
//! ```

use crate::errors::ProvisionError;
use kube::api::ApiResource;
use kube::core::GroupVersionKind;
use std::fmt;
use tracing::error;

/// Structured address of a resource type on the API server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResourceCoordinate {
    raw: String,
    group: String,
    version: String,
    resource: String,
    subresource: String,
}

impl ResourceCoordinate {
    /// Parse a `group/version/resource[:subresource]` string.
    ///
    /// Never fails; an unusable input produces a coordinate whose resource is
    /// empty (see the module documentation).
    #[must_use]
    pub fn resolve(spec: &str) -> Self {
        let (raw, subresource) = match spec.split(':').collect::<Vec<_>>().as_slice() {
            [raw, sub] => ((*raw).to_string(), (*sub).to_string()),
            _ => (spec.to_string(), String::new()),
        };

        let segments: Vec<&str> = raw.split('/').collect();
        let (group, version, resource) = match segments.as_slice() {
            [g, v, r] => ((*g).to_string(), (*v).to_string(), (*r).to_string()),
            [v, r] => (String::new(), (*v).to_string(), (*r).to_string()),
            [r] => (String::new(), String::new(), (*r).to_string()),
            _ => {
                error!(
                    gvr = %spec,
                    segments = segments.len(),
                    "invalid resource coordinate"
                );
                return Self {
                    raw,
                    ..Self::default()
                };
            }
        };

        Self {
            raw,
            group,
            version,
            resource,
            subresource,
        }
    }

    /// API group; empty for the core group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Plural resource name; empty when parsing failed.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    #[must_use]
    pub fn subresource(&self) -> &str {
        &self.subresource
    }

    /// The input with any subresource stripped.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `group/version`, or just `version` for the core group.
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// A coordinate is usable only when it names a resource.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.resource.is_empty()
    }

    /// Build the [`ApiResource`] used to address this coordinate with a dynamic
    /// [`kube::Api`].
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::InvalidCoordinate`] when the coordinate failed
    /// to parse.
    pub fn api_resource(&self, kind: &str) -> Result<ApiResource, ProvisionError> {
        if !self.is_valid() {
            return Err(ProvisionError::InvalidCoordinate {
                raw: self.raw.clone(),
            });
        }
        let gvk = GroupVersionKind::gvk(&self.group, &self.version, kind);
        Ok(ApiResource::from_gvk_with_plural(&gvk, &self.resource))
    }
}

impl fmt::Display for ResourceCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str(&self.raw);
        }
        match (self.group.is_empty(), self.version.is_empty()) {
            (false, _) => write!(f, "{}/{}/{}", self.group, self.version, self.resource)?,
            (true, false) => write!(f, "{}/{}", self.version, self.resource)?,
            (true, true) => f.write_str(&self.resource)?,
        }
        if !self.subresource.is_empty() {
            write!(f, ":{}", self.subresource)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "gvr_tests.rs"]
mod gvr_tests;
