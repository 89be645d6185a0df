// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tawny::{
    client::ClusterClient,
    constants::{LETS_ENCRYPT_PRODUCTION, TOKIO_WORKER_THREADS},
    gvr::ResourceCoordinate,
    issuer::AcmeDns01,
    provision::{DomainRequest, IssuerStrategy, TlsPolicy},
    unstructured::{get_path, ingress_route_hosts, ingress_route_tls_secret},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a resource coordinate such as `apps/v1/deployments:status`
    Resolve {
        /// Coordinate in `group/version/resource[:subresource]` form
        coordinate: String,
    },
    /// Provision the issuer, certificate and ingress route for a domain
    Provision(ProvisionArgs),
    /// List the ingress routes (domains) in a namespace
    ListDomains {
        #[arg(long, short)]
        namespace: String,
    },
    /// List the certificates in a namespace
    ListCertificates {
        #[arg(long, short)]
        namespace: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TlsMode {
    /// Plain HTTP, no certificate
    None,
    /// ACME HTTP-01 through traefik
    Http01,
    /// ACME DNS-01 through Cloudflare
    Dns01,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(clap::Args, Debug)]
struct ProvisionArgs {
    /// Tenant resource name the objects are named after
    #[arg(long)]
    name: String,
    /// Tenant namespace
    #[arg(long, short)]
    namespace: String,
    /// Domain to serve
    #[arg(long)]
    domain: String,
    /// Backend service name
    #[arg(long)]
    service: String,
    /// Backend service namespace (defaults to --namespace)
    #[arg(long)]
    service_namespace: Option<String>,
    /// Backend service port
    #[arg(long)]
    port: i32,
    #[arg(long, value_enum, default_value_t = TlsMode::Http01)]
    tls: TlsMode,
    /// ACME account email (required for http01 and dns01)
    #[arg(long, required_if_eq_any = [("tls", "http01"), ("tls", "dns01")])]
    email: Option<String>,
    /// DNS zones the DNS-01 solver answers for (repeatable)
    #[arg(long = "dns-zone", required_if_eq("tls", "dns01"))]
    dns_zones: Vec<String>,
    /// ACME directory for DNS-01 issuers
    #[arg(long, default_value = LETS_ENCRYPT_PRODUCTION)]
    acme_server: String,
    /// Secret holding the ACME account private key (dns01)
    #[arg(long, default_value = "tawny-acme-account")]
    account_key_secret: String,
    /// Secret holding the Cloudflare API token (dns01)
    #[arg(long, default_value = "cloudflare-api-token")]
    cloudflare_secret: String,
    /// Key of the token within --cloudflare-secret
    #[arg(long, default_value = "api-token")]
    cloudflare_key: String,
    /// traefik middleware to apply (repeatable)
    #[arg(long = "middleware")]
    middlewares: Vec<String>,
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Yaml)]
    output: OutputFormat,
}

impl ProvisionArgs {
    fn into_request(self) -> DomainRequest {
        let email = self.email.unwrap_or_default();
        let tls = match self.tls {
            TlsMode::None => TlsPolicy::None,
            TlsMode::Http01 => TlsPolicy::Acme(IssuerStrategy::Http01 { email }),
            TlsMode::Dns01 => TlsPolicy::Acme(IssuerStrategy::Dns01(AcmeDns01 {
                email,
                server: self.acme_server,
                private_key_secret: self.account_key_secret,
                api_token_secret: self.cloudflare_secret,
                api_token_key: self.cloudflare_key,
                dns_zones: self.dns_zones,
            })),
        };

        DomainRequest {
            service_namespace: self.service_namespace.unwrap_or_else(|| self.namespace.clone()),
            name: self.name,
            namespace: self.namespace,
            domain: self.domain,
            service_name: self.service,
            service_port: self.port,
            tls,
            middlewares: self.middlewares,
        }
    }
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("tawny")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging();
    debug!("Logging initialized with file and line number tracking");

    // Ctrl-C aborts in-flight cluster calls
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight requests");
            on_signal.cancel();
        }
    });

    match cli.command {
        Commands::Resolve { coordinate } => resolve(&coordinate),
        Commands::Provision(args) => {
            let output = args.output;
            let client = connect().await?;
            let provisioned = client
                .provision_domain(&args.into_request(), &cancel)
                .await
                .context("Failed to provision domain")?;

            if let Some(issuer) = &provisioned.issuer {
                print_object(issuer, output)?;
            }
            if let Some(certificate) = &provisioned.certificate {
                print_object(certificate, output)?;
            }
            print_object(&provisioned.ingress_route, output)
        }
        Commands::ListDomains { namespace } => {
            let client = connect().await?;
            let routes = client.list_domains(&namespace, &cancel).await?;
            for route in &routes.items {
                println!(
                    "{}\t{}\t{}",
                    route.metadata.name.as_deref().unwrap_or_default(),
                    ingress_route_hosts(route).join(","),
                    ingress_route_tls_secret(route).unwrap_or("-"),
                );
            }
            Ok(())
        }
        Commands::ListCertificates { namespace } => {
            let client = connect().await?;
            let certificates = client.list_certificates(&namespace, &cancel).await?;
            for cert in &certificates.items {
                let dns_names = get_path(&cert.data, &["spec", "dnsNames"])
                    .and_then(|v| v.as_array())
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(|n| n.as_str())
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .unwrap_or_default();
                println!(
                    "{}\t{}",
                    cert.metadata.name.as_deref().unwrap_or_default(),
                    dns_names
                );
            }
            Ok(())
        }
    }
}

/// Initialize logging with custom format.
///
/// Respects `RUST_LOG` if set, otherwise defaults to INFO level.
/// `RUST_LOG_FORMAT=json` switches to JSON output. Logs go to stderr so
/// command output on stdout stays machine-readable.
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn connect() -> Result<ClusterClient> {
    debug!("Initializing Kubernetes client");
    let client = ClusterClient::from_env()
        .await
        .context("Failed to load Kubernetes credentials")?;
    info!("Kubernetes client initialized");
    Ok(client)
}

fn resolve(coordinate: &str) -> Result<()> {
    let resolved = ResourceCoordinate::resolve(coordinate);
    if !resolved.is_valid() {
        anyhow::bail!("invalid resource coordinate: {coordinate}");
    }

    println!("group:       {}", resolved.group());
    println!("version:     {}", resolved.version());
    println!("resource:    {}", resolved.resource());
    println!("subresource: {}", resolved.subresource());
    println!("apiVersion:  {}", resolved.api_version());
    Ok(())
}

fn print_object<T: Serialize>(object: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => print!("---\n{}", serde_yaml::to_string(object)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(object)?),
    }
    Ok(())
}
