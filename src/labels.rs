// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Ownership labels applied to every object tawny creates.
//!
//! Every built object carries the four canonical keys below, so objects can be
//! selected and attributed to tawny later. Objects in the system's own namespace
//! are escalated to the core tier: every canonical value gets the
//! [`CORE_TIER_SUFFIX`]. Caller-supplied labels are merged last, are never
//! suffixed and may override the canonical keys.
//!
//! # Example
//!
//! ```rust
//! use tawny::labels::{LabelBuilder, TAWNY_COMPONENT, TAWNY_NAME};
//!
//! let labels = LabelBuilder::new()
//!     .name("app")
//!     .component("ingressroute")
//!     .custom("team", "blue")
//!     .core(true)
//!     .build();
//!
//! assert_eq!(labels[TAWNY_NAME], "tawny-app-core");
//! assert_eq!(labels[TAWNY_COMPONENT], "tawny-ingressroute-core");
//! assert_eq!(labels["team"], "blue");
//! ```

use crate::constants::{APP_NAME, CORE_TIER_SUFFIX, MAX_LABEL_VALUE_LEN};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

// ============================================================================
// Tawny Labels
// ============================================================================

/// Name of the object the label set belongs to (`tawny-<name>`)
pub const TAWNY_NAME: &str = "tawny.sh/name";

/// Component within tawny (`tawny-<component>`)
pub const TAWNY_COMPONENT: &str = "tawny.sh/component";

/// Higher-level application the object is part of
pub const TAWNY_PART_OF: &str = "tawny.sh/part-of";

/// Tool managing the object
pub const TAWNY_MANAGED_BY: &str = "tawny.sh/managed-by";

/// Hex characters of the digest kept when a label value is shortened
const DIGEST_SUFFIX_LEN: usize = 8;

/// Accumulates label options; [`LabelBuilder::build`] produces the label set.
///
/// Options may be applied in any order. `name`, `component` and `core`
/// overwrite earlier calls; `custom` accumulates, with later values for the same
/// key winning.
#[derive(Clone, Debug, Default)]
pub struct LabelBuilder {
    name: String,
    component: String,
    core: bool,
    extra: BTreeMap<String, String>,
}

impl LabelBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// Add a caller-supplied label; merged after the canonical keys.
    #[must_use]
    pub fn custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Escalate the canonical values to the core tier.
    #[must_use]
    pub fn core(mut self, core: bool) -> Self {
        self.core = core;
        self
    }

    /// Produce the label set. Always contains the four canonical keys.
    #[must_use]
    pub fn build(self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (TAWNY_NAME.to_string(), prefixed(&self.name)),
            (TAWNY_COMPONENT.to_string(), prefixed(&self.component)),
            (TAWNY_PART_OF.to_string(), APP_NAME.to_string()),
            (TAWNY_MANAGED_BY.to_string(), APP_NAME.to_string()),
        ]);

        for value in labels.values_mut() {
            if self.core {
                value.push_str(CORE_TIER_SUFFIX);
            }
            *value = fit_label_value(value);
        }

        labels.extend(self.extra);
        labels
    }
}

/// Shorthand for the label sets the builders need.
#[must_use]
pub fn build_labels(name: &str, component: &str, core: bool) -> BTreeMap<String, String> {
    LabelBuilder::new()
        .name(name)
        .component(component)
        .core(core)
        .build()
}

/// `tawny-<value>`, or plain `tawny` when the value is empty so the result never
/// ends in a dash.
fn prefixed(value: &str) -> String {
    if value.is_empty() {
        APP_NAME.to_string()
    } else {
        format!("{APP_NAME}-{value}")
    }
}

/// Shorten a label value to the API server's limit.
///
/// Values that fit are returned unchanged. Longer values keep a prefix and gain
/// a digest of the full value, so distinct long names stay distinct.
#[must_use]
pub fn fit_label_value(value: &str) -> String {
    if value.len() <= MAX_LABEL_VALUE_LEN {
        return value.to_string();
    }

    let digest = Sha256::digest(value.as_bytes());
    let hex: String = digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(DIGEST_SUFFIX_LEN)
        .collect();

    // byte budget, cut on a char boundary
    let keep = MAX_LABEL_VALUE_LEN - DIGEST_SUFFIX_LEN - 1;
    let end = value
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= keep)
        .last()
        .unwrap_or(0);
    let prefix = value[..end].trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
    format!("{prefix}-{hex}")
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod labels_tests;
