// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Functionality for inspecting the chains held in a single credential store

use std::{io::Write, path::PathBuf};

use clap::{crate_version, Parser};

use network_credentials::{CertificateStore, CredentialStore};

use crate::inspect::{format_reports, EntryReport, FormatMethod};

use super::error::CredentialCliError;

#[derive(Debug, Parser)]
#[clap(
    name = "netcred-inspect-store",
    about = "Lists the certificate chains in a credential store and whether each one validates",
    version = crate_version!()
)]
pub struct InspectStoreOpts {
    #[clap(help = "Path of the credential store directory to be inspected")]
    pub store: PathBuf,
    #[clap(long, help = "Only show the entry with this alias")]
    pub alias: Option<String>,
    #[clap(
        long,
        help = "How to display results [default: plain] [possible values: plain, json]",
        default_value = "plain"
    )]
    pub format: FormatMethod,
}

pub fn main<W: Write, E: Write>(
    opts: &InspectStoreOpts,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<(), std::io::Error> {
    match run(opts) {
        Ok(display_text) => {
            writeln!(stdout, "{display_text}")?;
            Ok(())
        }
        Err(err) => writeln!(stderr, "{err}"),
    }
}

fn run(opts: &InspectStoreOpts) -> Result<String, CredentialCliError> {
    let store = CertificateStore::load_pem_dir(&opts.store)?;

    let reports: Vec<EntryReport> = match &opts.alias {
        Some(alias) => {
            let entry = store
                .entries()
                .iter()
                .find(|entry| entry.alias() == alias)
                .ok_or_else(|| CredentialCliError::NoSuchAlias(alias.clone()))?;
            vec![EntryReport::new(entry)]
        }
        None => store.entries().iter().map(EntryReport::new).collect(),
    };

    let display_text = format_reports(&reports, &opts.format)?;
    Ok(display_text)
}
