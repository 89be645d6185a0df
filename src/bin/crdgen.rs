// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Writes the schemas of the cert-manager and traefik types tawny writes, as
//! modelled in src/crd.rs. They cover only the fields tawny sets and are meant
//! for test clusters that run without cert-manager or traefik installed.
//!
//! Usage:
//!   cargo run --bin crdgen [output-dir]
//!
//! Files are written to deploy/test-crds/ unless another directory is given.

use kube::CustomResourceExt;
use std::fs;
use std::path::{Path, PathBuf};
use tawny::crd::{Certificate, ClusterIssuer, IngressRoute};

const HEADER: &str = "# Copyright (c) 2025 Daniel Michaels
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs for test clusters.
# Production clusters use the CRDs shipped by cert-manager and traefik.
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("deploy/test-crds"), PathBuf::from);

    fs::create_dir_all(&output_dir)?;

    println!("Generating CRD YAML files from src/crd.rs...");

    generate_crd::<Certificate>("certificates.crd.yaml", &output_dir)?;
    generate_crd::<ClusterIssuer>("clusterissuers.crd.yaml", &output_dir)?;
    generate_crd::<IngressRoute>("ingressroutes.crd.yaml", &output_dir)?;

    println!("✓ Successfully generated CRD YAML files in {}", output_dir.display());

    Ok(())
}

fn generate_crd<T>(filename: &str, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>>
where
    T: CustomResourceExt,
{
    let yaml = serde_yaml::to_string(&T::crd())?;
    let content = format!("{HEADER}{yaml}");

    fs::write(output_dir.join(filename), content)?;

    println!("  ✓ Generated {filename}");

    Ok(())
}
