// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{Display, Write};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use network_credentials::{
    extract_organization, is_self_signed, validate_chain, ChainRole, StoreEntry,
    CANONICAL_CHAIN_LENGTH,
};

pub const EMPTY_STORE_TEXT: &str = "The store holds no certificate entries";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatMethod {
    /// Display as plain text
    Plain,
    /// Display as json
    Json,
}

#[derive(Error, Debug, PartialEq)]
#[error("unable to format store contents")]
pub struct FormatError;

#[derive(Error, Debug)]
#[error("could not parse display type, expected one of (plain, json)")]
pub struct FormatMethodParseError;

impl FromStr for FormatMethod {
    type Err = FormatMethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(FormatMethod::Plain),
            "json" => Ok(FormatMethod::Json),
            _ => Err(FormatMethodParseError),
        }
    }
}

/// What the inspection tool reports about one store entry.
#[derive(Debug, Serialize)]
pub struct EntryReport {
    pub alias: String,
    pub length: usize,
    pub valid: bool,
    /// Why the chain failed validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
    /// Valid, of the length used for bundle extraction, and naming an organization.
    pub extractable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub certificates: Vec<CertificateReport>,
}

#[derive(Debug, Serialize)]
pub struct CertificateReport {
    /// Only assigned for valid chains.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ChainRole>,
    pub subject: String,
    pub issuer: String,
    pub self_signed: bool,
}

impl EntryReport {
    pub fn new(entry: &StoreEntry) -> Self {
        let chain = entry.chain();
        let verdict = validate_chain(chain.certificates());
        let valid = verdict.is_ok();

        let certificates = chain
            .certificates()
            .iter()
            .enumerate()
            .map(|(index, cert)| CertificateReport {
                role: valid.then(|| ChainRole::for_position(index, chain.len())),
                subject: cert.subject().to_string(),
                issuer: cert.issuer().to_string(),
                self_signed: is_self_signed(cert),
            })
            .collect();

        let organization = chain
            .leaf()
            .and_then(|leaf| extract_organization(leaf.subject()).ok())
            .map(|org| org.to_string());

        Self {
            alias: entry.alias().to_owned(),
            length: chain.len(),
            valid,
            rejection: verdict.err().map(|err| err.to_string()),
            extractable: valid
                && chain.len() == CANONICAL_CHAIN_LENGTH
                && organization.is_some(),
            organization,
            certificates,
        }
    }
}

impl Display for EntryReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} certificate(s)): ", self.alias, self.length)?;
        match &self.rejection {
            None if self.extractable => writeln!(f, "valid, extractable")?,
            None => writeln!(f, "valid, not extractable")?,
            Some(reason) => writeln!(f, "invalid, {reason}")?,
        }
        if let Some(org) = &self.organization {
            writeln!(f, "  Organization: {org}")?;
        }
        for cert in &self.certificates {
            let role = cert
                .role
                .map(|role| role.to_string())
                .unwrap_or_else(|| "-".to_owned());
            let marker = if cert.self_signed { " (self-signed)" } else { "" };
            writeln!(f, "  {role:<10} {}{marker}", cert.subject)?;
        }
        Ok(())
    }
}

pub fn format_reports(reports: &[EntryReport], method: &FormatMethod) -> Result<String, FormatError> {
    match method {
        FormatMethod::Plain => {
            if reports.is_empty() {
                return Ok(EMPTY_STORE_TEXT.to_owned());
            }
            let mut text = String::new();
            for report in reports {
                write!(text, "{report}").map_err(|_| FormatError)?;
            }
            Ok(text.trim_end().to_owned())
        }
        FormatMethod::Json => serde_json::to_string_pretty(reports).map_err(|_| FormatError),
    }
}
