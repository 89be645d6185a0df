// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Unit tests for `issuer.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        create_cluster_issuer, merge_acme_solvers, update_cluster_issuer, AcmeDns01,
        ClusterIssuerBuilder,
    };
    use crate::crd::ClusterIssuer;
    use crate::labels::{TAWNY_COMPONENT, TAWNY_NAME};
    use crate::test_support::FakeApi;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    // ========================================================================
    // Helper Functions
    // ========================================================================

    fn create_test_dns01(zones: &[&str]) -> AcmeDns01 {
        AcmeDns01 {
            email: "ops@example.com".to_string(),
            server: "https://acme-v02.api.letsencrypt.org/directory".to_string(),
            private_key_secret: "tawny-acme-account".to_string(),
            api_token_secret: "cloudflare".to_string(),
            api_token_key: "api-token".to_string(),
            dns_zones: zones.iter().map(ToString::to_string).collect(),
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    #[test]
    fn test_default_issuer_is_core_tier() {
        let issuer = ClusterIssuerBuilder::new().build();

        assert_eq!(issuer.metadata.name.as_deref(), Some("tawny-clusterissuer"));
        assert!(issuer.metadata.namespace.is_none(), "cluster-scoped");
        let labels = issuer.metadata.labels.unwrap();
        assert_eq!(labels[TAWNY_NAME], "tawny-tawny-clusterissuer-core");
        assert_eq!(labels[TAWNY_COMPONENT], "tawny-clusterissuer-core");
        assert!(issuer.spec.acme.is_none());
        assert!(issuer.spec.self_signed.is_none());
    }

    #[test]
    fn test_custom_name_flows_into_labels() {
        let issuer = ClusterIssuerBuilder::new().name("letsencrypt").build();
        assert_eq!(issuer.metadata.name.as_deref(), Some("letsencrypt"));
        assert_eq!(issuer.metadata.labels.unwrap()[TAWNY_NAME], "tawny-letsencrypt-core");
    }

    #[test]
    fn test_dns01_serializes_cloudflare_solver() {
        let issuer = ClusterIssuerBuilder::new()
            .acme_dns01(create_test_dns01(&["example.com"]))
            .build();

        let value = serde_json::to_value(&issuer.spec).unwrap();
        assert_eq!(
            value,
            json!({
                "acme": {
                    "email": "ops@example.com",
                    "server": "https://acme-v02.api.letsencrypt.org/directory",
                    "privateKeySecretRef": {"name": "tawny-acme-account"},
                    "solvers": [{
                        "selector": {"dnsZones": ["example.com"]},
                        "dns01": {
                            "cloudflare": {
                                "email": "ops@example.com",
                                "apiTokenSecretRef": {"name": "cloudflare", "key": "api-token"}
                            }
                        }
                    }]
                }
            })
        );
    }

    #[test]
    fn test_dns01_twice_appends_both_zone_sets() {
        let mut second = create_test_dns01(&["example.org", "example.net"]);
        second.email = "other@example.com".to_string();

        let issuer = ClusterIssuerBuilder::new()
            .acme_dns01(create_test_dns01(&["example.com"]))
            .acme_dns01(second)
            .build();

        let acme = issuer.spec.acme.unwrap();
        assert_eq!(acme.email, "ops@example.com", "account initialized only once");
        assert_eq!(acme.solvers.len(), 2);
        let zones: Vec<Vec<String>> = acme
            .solvers
            .iter()
            .map(|s| s.selector.clone().unwrap().dns_zones)
            .collect();
        assert_eq!(zones, vec![vec!["example.com"], vec!["example.org", "example.net"]]);
    }

    #[test]
    fn test_http01_defaults() {
        let issuer = ClusterIssuerBuilder::new()
            .acme_http01("ops@example.com", "app.example.com")
            .build();

        let acme = issuer.spec.acme.unwrap();
        assert_eq!(acme.server, "https://acme-staging-v02.api.letsencrypt.org/directory");
        assert_eq!(acme.private_key_secret_ref.name, "domain-cert-app.example.com");
        assert_eq!(
            acme.private_key_secret_ref.key.as_deref(),
            Some("domain-cert-app.example.com")
        );

        let solver = &acme.solvers[0];
        assert_eq!(solver.selector.as_ref().unwrap().dns_names, vec!["app.example.com"]);
        let ingress = solver.http01.as_ref().unwrap().ingress.as_ref().unwrap();
        assert_eq!(ingress.service_type.as_deref(), Some("ClusterIP"));
        assert_eq!(ingress.ingress_class_name.as_deref(), Some("traefik"));
    }

    #[test]
    fn test_acme_server_overrides_only_existing_account() {
        let without = ClusterIssuerBuilder::new()
            .acme_server("https://acme-v02.api.letsencrypt.org/directory")
            .build();
        assert!(without.spec.acme.is_none());

        let with = ClusterIssuerBuilder::new()
            .acme_http01("ops@example.com", "app.example.com")
            .acme_server("https://acme-v02.api.letsencrypt.org/directory")
            .build();
        assert_eq!(
            with.spec.acme.unwrap().server,
            "https://acme-v02.api.letsencrypt.org/directory"
        );
    }

    #[test]
    fn test_self_signed_keeps_acme_block() {
        let issuer = ClusterIssuerBuilder::new()
            .acme_http01("ops@example.com", "app.example.com")
            .self_signed()
            .build();

        assert!(issuer.spec.acme.is_some());
        let value = serde_json::to_value(&issuer.spec).unwrap();
        assert_eq!(value["selfSigned"], json!({}));
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    #[tokio::test]
    async fn test_create_cluster_issuer_already_exists() {
        let builder = ClusterIssuerBuilder::new().self_signed();
        let api = FakeApi::with_object(builder.build());

        let err = create_cluster_issuer(&api, &builder, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_update_conflict_rereads_without_duplicating_solvers() {
        let existing = ClusterIssuerBuilder::new()
            .acme_dns01(create_test_dns01(&["old.example.com"]))
            .build();
        let api = FakeApi::<ClusterIssuer>::with_object(existing);
        api.conflict_next_replaces(1);

        let builder = ClusterIssuerBuilder::new().acme_dns01(create_test_dns01(&["example.com"]));
        let cancel = CancellationToken::new();
        let updated = update_cluster_issuer(&api, "tawny-clusterissuer", &builder, &cancel)
            .await
            .unwrap();

        let seen = api.versions_seen();
        assert_eq!(seen.len(), 2);
        let first: u64 = seen[0].parse().unwrap();
        let second: u64 = seen[1].parse().unwrap();
        assert_eq!(second, first + 1, "second attempt reads the bumped version");

        let solvers = updated.spec.acme.unwrap().solvers;
        assert_eq!(solvers.len(), 1, "retry must not append solvers twice");
        assert_eq!(solvers[0].selector.as_ref().unwrap().dns_zones, vec!["example.com"]);
    }

    #[tokio::test]
    async fn test_update_missing_issuer_is_not_found() {
        let api = FakeApi::<ClusterIssuer>::new();
        let err = update_cluster_issuer(
            &api,
            "tawny-clusterissuer",
            &ClusterIssuerBuilder::new().self_signed(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(api.calls().creates, 0);
    }

    #[test]
    fn test_merge_appends_solver_for_new_selector() {
        let mut current = ClusterIssuerBuilder::new()
            .acme_http01("ops@example.com", "a.example.com")
            .build()
            .spec;
        let desired = ClusterIssuerBuilder::new()
            .acme_http01("other@example.com", "b.example.com")
            .build()
            .spec;

        assert!(merge_acme_solvers(&mut current, &desired));
        assert!(!merge_acme_solvers(&mut current, &desired), "second merge is a no-op");

        let acme = current.acme.unwrap();
        assert_eq!(acme.email, "ops@example.com", "account is kept");
        let names: Vec<_> = acme
            .solvers
            .iter()
            .map(|s| s.selector.as_ref().unwrap().dns_names.clone())
            .collect();
        assert_eq!(names, vec![vec!["a.example.com"], vec!["b.example.com"]]);
    }

    #[test]
    fn test_merge_adopts_acme_block_when_missing() {
        let mut current = ClusterIssuerBuilder::new().self_signed().build().spec;
        let desired = ClusterIssuerBuilder::new()
            .acme_dns01(create_test_dns01(&["example.com"]))
            .build()
            .spec;

        assert!(merge_acme_solvers(&mut current, &desired));
        assert!(current.self_signed.is_some());
        assert_eq!(current.acme, desired.acme);
    }

    #[test]
    fn test_merge_without_desired_acme_changes_nothing() {
        let mut current = ClusterIssuerBuilder::new()
            .acme_http01("ops@example.com", "a.example.com")
            .build()
            .spec;
        let before = current.clone();
        let desired = ClusterIssuerBuilder::new().self_signed().build().spec;

        assert!(!merge_acme_solvers(&mut current, &desired));
        assert_eq!(current, before);
    }
}
