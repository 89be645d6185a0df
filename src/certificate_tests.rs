// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Unit tests for `certificate.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        certificate_secret_name, create_certificate, update_certificate, CertificateBuilder,
    };
    use crate::crd::Certificate;
    use crate::labels::{TAWNY_COMPONENT, TAWNY_MANAGED_BY, TAWNY_NAME};
    use crate::test_support::FakeApi;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_default_certificate_in_core_namespace() {
        let cert = CertificateBuilder::new("example", "tawny").build();

        assert_eq!(cert.metadata.name.as_deref(), Some("example"));
        assert_eq!(cert.metadata.namespace.as_deref(), Some("tawny"));
        assert_eq!(cert.spec.secret_name, "example-cert-secret");
        assert_eq!(cert.spec.issuer_ref.kind.as_deref(), Some("ClusterIssuer"));
        assert_eq!(cert.spec.issuer_ref.name, "tawny-clusterissuer");
        assert!(cert.spec.dns_names.is_empty());

        let labels = cert.metadata.labels.unwrap();
        assert_eq!(labels[TAWNY_NAME], "tawny-example-core");
        assert_eq!(labels[TAWNY_COMPONENT], "tawny-certificate-core");
        assert_eq!(labels[TAWNY_MANAGED_BY], "tawny-core");
    }

    #[test]
    fn test_tenant_certificate_has_plain_labels() {
        let cert = CertificateBuilder::new("app", "tenant").build();
        let labels = cert.metadata.labels.unwrap();
        assert_eq!(labels[TAWNY_NAME], "tawny-app");
        assert_eq!(labels[TAWNY_COMPONENT], "tawny-certificate");
    }

    #[test]
    fn test_domains_accumulate_in_order() {
        let cert = CertificateBuilder::new("app", "tenant")
            .domain("app.example.com")
            .domain("www.app.example.com")
            .build();
        assert_eq!(cert.spec.dns_names, vec!["app.example.com", "www.app.example.com"]);
    }

    #[test]
    fn test_issuer_options_overwrite() {
        let cert = CertificateBuilder::new("app", "tenant")
            .issuer_name("first")
            .issuer_kind("Issuer")
            .issuer_name("letsencrypt-prod")
            .build();
        assert_eq!(cert.spec.issuer_ref.name, "letsencrypt-prod");
        assert_eq!(cert.spec.issuer_ref.kind.as_deref(), Some("Issuer"));
    }

    #[test]
    fn test_secret_name_is_pure() {
        assert_eq!(certificate_secret_name("app"), "app-cert-secret");
        assert_eq!(
            certificate_secret_name("app"),
            CertificateBuilder::new("app", "other").build().spec.secret_name
        );
    }

    #[tokio::test]
    async fn test_create_then_update_replaces_spec() {
        let api = FakeApi::<Certificate>::new();
        let cancel = CancellationToken::new();

        let builder = CertificateBuilder::new("app", "tenant").domain("app.example.com");
        create_certificate(&api, &builder, &cancel).await.unwrap();

        let builder = builder.domain("www.app.example.com");
        let updated = update_certificate(&api, &builder, &cancel).await.unwrap();

        assert_eq!(updated.spec.dns_names, vec!["app.example.com", "www.app.example.com"]);
        assert_eq!(api.stored("app").unwrap().spec, builder.build().spec);
    }

    #[tokio::test]
    async fn test_update_missing_certificate_is_not_found() {
        let api = FakeApi::<Certificate>::new();
        let builder = CertificateBuilder::new("app", "tenant").domain("app.example.com");

        let err = update_certificate(&api, &builder, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(api.calls().creates, 0);
    }

    #[tokio::test]
    async fn test_update_survives_conflict() {
        let api = FakeApi::with_object(CertificateBuilder::new("app", "tenant").build());
        api.conflict_next_replaces(2);
        let builder = CertificateBuilder::new("app", "tenant").domain("app.example.com");

        let updated = update_certificate(&api, &builder, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(updated.spec.dns_names, vec!["app.example.com"]);
        assert_eq!(api.calls().replaces, 3);
    }
}
