// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Path helpers for untyped resources.
//!
//! Resources listed through a dynamic [`kube::Api`] arrive as
//! [`DynamicObject`]s whose body is a plain JSON document. These helpers read and
//! write nested fields by path without deserializing into a typed struct, so the
//! wire shape is preserved exactly.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use tawny::unstructured::{get_path, set_path};
//!
//! let mut doc = json!({"spec": {"tls": {"secretName": "a"}}});
//! assert_eq!(get_path(&doc, &["spec", "tls", "secretName"]), Some(&json!("a")));
//!
//! set_path(&mut doc, &["spec", "entryPoints"], json!(["websecure"]));
//! assert_eq!(doc["spec"]["entryPoints"][0], "websecure");
//! ```

use kube::api::DynamicObject;
use serde_json::{Map, Value};

/// Prefix of a traefik host matcher
const HOST_MATCHER: &str = "Host(`";

/// Read the value at `path`, descending through objects only.
#[must_use]
pub fn get_path<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |current, key| current.get(*key))
}

/// Read a string at `path`.
#[must_use]
pub fn get_str<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a str> {
    get_path(doc, path).and_then(Value::as_str)
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Any non-object value found along the path is replaced by an object.
/// An empty path replaces the whole document.
pub fn set_path(doc: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *doc = value;
        return;
    };

    let mut current = doc;
    for key in parents {
        current = object_mut(current)
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    object_mut(current).insert((*last).to_string(), value);
}

fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

/// Hosts matched by an untyped traefik `IngressRoute`.
///
/// Every ``Host(`...`)`` term of every route's `match` expression is returned in
/// order of appearance; other matchers are ignored.
#[must_use]
pub fn ingress_route_hosts(route: &DynamicObject) -> Vec<String> {
    let Some(routes) = get_path(&route.data, &["spec", "routes"]).and_then(Value::as_array) else {
        return Vec::new();
    };

    routes
        .iter()
        .filter_map(|r| get_str(r, &["match"]))
        .flat_map(parse_hosts)
        .collect()
}

/// TLS secret referenced by an untyped traefik `IngressRoute`.
#[must_use]
pub fn ingress_route_tls_secret(route: &DynamicObject) -> Option<&str> {
    get_str(&route.data, &["spec", "tls", "secretName"]).filter(|s| !s.is_empty())
}

fn parse_hosts(expr: &str) -> Vec<String> {
    let mut hosts = Vec::new();
    let mut rest = expr;
    while let Some(start) = rest.find(HOST_MATCHER) {
        rest = &rest[start + HOST_MATCHER.len()..];
        let Some(end) = rest.find('`') else {
            break;
        };
        hosts.push(rest[..end].to_string());
        rest = &rest[end + 1..];
    }
    hosts
}

#[cfg(test)]
#[path = "unstructured_tests.rs"]
mod unstructured_tests;
