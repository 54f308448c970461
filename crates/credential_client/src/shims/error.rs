// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::PathBuf;

use network_credentials::{file::FileError, BatchError, LoadError};

use crate::inspect::FormatError;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CredentialCliError {
    #[error("Unable to read the config file {:?}: {}.", .0, .1)]
    ConfigRead(PathBuf, String),
    #[error("Unable to parse the config file {:?} as TOML: {}.", .0, .1)]
    ConfigParse(PathBuf, String),
    #[error("Please supply either --cfg-path or --nodes-dir together with at least one --node.")]
    MissingConfig,
    #[error("Unable to assemble the credential bundle. {0}")]
    Batch(#[from] BatchError),
    #[error("Unable to display the credential bundle: {0}.")]
    BundleSerialization(String),
    #[error(transparent)]
    FileError(#[from] FileError),
    #[error(transparent)]
    LoadError(#[from] LoadError),
    #[error("The store has no entry with alias {0:?}.")]
    NoSuchAlias(String),
    #[error("Unable to display the store contents in the format requested.")]
    FormatError,
}

impl From<FormatError> for CredentialCliError {
    fn from(_: FormatError) -> Self {
        Self::FormatError
    }
}
