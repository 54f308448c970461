// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Functionality for assembling the credential bundle of a set of nodes

use std::io::Write;
use std::path::PathBuf;

use clap::{crate_version, Parser};

use network_credentials::file::save_bundle_to_file;
use network_credentials::{build_bundle, PemDirectoryLoader};

use super::error::CredentialCliError;
use crate::config::Config;

#[derive(Debug, Parser)]
#[clap(
    name = "netcred-build-bundle",
    about = "Extracts the certificate hierarchy of each node and writes them as a single JSON credential bundle",
    version = crate_version!()
)]
pub struct BuildBundleOpts {
    #[arg(
        long,
        env = "NETCRED_CFG_PATH",
        help = "The path to a TOML config; replaces all other configuration options",
        exclusive = true
    )]
    pub cfg_path: Option<PathBuf>,

    #[command(flatten)]
    pub config: Option<Config>,

    #[arg(long, help = "Replace the output file if it already exists")]
    pub force: bool,
}

impl BuildBundleOpts {
    pub fn load_config(&self) -> Result<Config, CredentialCliError> {
        match (&self.cfg_path, &self.config) {
            (Some(path), _) => Config::from_toml_file(path),
            (None, Some(config)) => Ok(config.clone()),
            (None, None) => Err(CredentialCliError::MissingConfig),
        }
    }
}

/// The bundle (or a note saying where it was written) and one line per node
/// left out of it.
pub struct BuildReport {
    pub output: String,
    pub skipped: Vec<String>,
}

pub fn main<W: Write, E: Write>(
    opts: &BuildBundleOpts,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<(), std::io::Error> {
    match run(opts) {
        Ok(report) => {
            writeln!(stdout, "{}", report.output)?;
            for line in report.skipped {
                writeln!(stderr, "{line}")?;
            }
            Ok(())
        }
        Err(err) => writeln!(stderr, "{err}"),
    }
}

pub fn run(opts: &BuildBundleOpts) -> Result<BuildReport, CredentialCliError> {
    let config = opts.load_config()?;
    let options = config.batch_options();
    let outcome = build_bundle(&config.nodes, &PemDirectoryLoader, &options)?;

    let skipped = outcome
        .skipped
        .iter()
        .map(|skipped| format!("Skipped node {}: {}", skipped.node, skipped.error))
        .collect();

    let output = match &config.output {
        Some(path) => {
            save_bundle_to_file(&outcome.bundle, path, opts.force)?;
            format!(
                "Credential bundle for {} node(s) saved to {}",
                outcome.bundle.len(),
                path.display()
            )
        }
        None => outcome
            .bundle
            .to_json_pretty()
            .map_err(|err| CredentialCliError::BundleSerialization(err.to_string()))?,
    };

    Ok(BuildReport { output, skipped })
}
