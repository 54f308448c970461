// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::PathBuf;

use pem::PemError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum EncodeError {
    #[error("could not persist encoded certificate to {0:?}: {1}")]
    CouldNotPersist(PathBuf, String),
}

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error(transparent)]
    PemError(#[from] PemError),
    #[error("could not decode base64: {0}")]
    Base64(String),
    #[error("unexpected tag, expected {0}, got {1}")]
    UnexpectedPEMTag(String, String),
    #[error("could not parse X.509 certificate: {0}")]
    X509(String),
    #[error("unexpected trailing bytes after certificate")]
    TrailingData,
}
