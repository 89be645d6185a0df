// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Unit tests for `unstructured.rs`

#[cfg(test)]
mod tests {
    use super::super::{get_path, get_str, ingress_route_hosts, ingress_route_tls_secret, set_path};
    use kube::api::{ApiResource, DynamicObject};
    use kube::core::GroupVersionKind;
    use serde_json::json;

    fn dynamic_route(spec: serde_json::Value) -> DynamicObject {
        let gvk = GroupVersionKind::gvk("traefik.io", "v1alpha1", "IngressRoute");
        let ar = ApiResource::from_gvk_with_plural(&gvk, "ingressroutes");
        DynamicObject::new("route", &ar)
            .within("tenant")
            .data(json!({ "spec": spec }))
    }

    #[test]
    fn test_get_path_missing_segment() {
        let doc = json!({"spec": {"routes": []}});
        assert!(get_path(&doc, &["spec", "tls", "secretName"]).is_none());
        assert_eq!(get_path(&doc, &[]), Some(&doc));
    }

    #[test]
    fn test_get_str_rejects_non_strings() {
        let doc = json!({"spec": {"port": 8080}});
        assert!(get_str(&doc, &["spec", "port"]).is_none());
    }

    #[test]
    fn test_set_path_creates_intermediate_objects() {
        let mut doc = json!({});
        set_path(&mut doc, &["metadata", "labels", "tawny.sh/name"], json!("tawny-app"));
        assert_eq!(doc, json!({"metadata": {"labels": {"tawny.sh/name": "tawny-app"}}}));
    }

    #[test]
    fn test_set_path_keeps_sibling_fields() {
        let mut doc = json!({"spec": {"routes": [1], "tls": {"secretName": "old"}}});
        set_path(&mut doc, &["spec", "tls", "secretName"], json!("new"));
        assert_eq!(doc["spec"]["routes"], json!([1]));
        assert_eq!(doc["spec"]["tls"]["secretName"], "new");
    }

    #[test]
    fn test_set_path_replaces_scalars_on_the_way() {
        let mut doc = json!({"spec": "oops"});
        set_path(&mut doc, &["spec", "tls"], json!({}));
        assert_eq!(doc, json!({"spec": {"tls": {}}}));
    }

    #[test]
    fn test_ingress_route_hosts() {
        let route = dynamic_route(json!({
            "routes": [
                {"match": "Host(`app.example.com`)", "kind": "Rule"},
                {
                    "match": "Host(`a.example.com`) || Host(`b.example.com`) && PathPrefix(`/api`)",
                    "kind": "Rule"
                },
                {"kind": "Rule"}
            ]
        }));
        assert_eq!(
            ingress_route_hosts(&route),
            vec!["app.example.com", "a.example.com", "b.example.com"]
        );
    }

    #[test]
    fn test_ingress_route_without_routes() {
        let route = dynamic_route(json!({}));
        assert!(ingress_route_hosts(&route).is_empty());
        assert!(ingress_route_tls_secret(&route).is_none());
    }

    #[test]
    fn test_ingress_route_tls_secret() {
        let route = dynamic_route(json!({"tls": {"secretName": "app-cert-secret"}}));
        assert_eq!(ingress_route_tls_secret(&route), Some("app-cert-secret"));
    }
}
