// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered certificate chains and the structural role of each position.

use std::fmt::Display;

use serde::Serialize;

use crate::certificate::Certificate;

/// Certificates ordered from the leaf (index 0) up to the expected root (last index).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CertificateChain(Vec<Certificate>);

impl CertificateChain {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_certificates<I>(certs: I) -> Self
    where
        I: IntoIterator<Item = Certificate>,
    {
        Self(certs.into_iter().collect())
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn leaf(&self) -> Option<&Certificate> {
        self.0.first()
    }

    pub fn root(&self) -> Option<&Certificate> {
        self.0.last()
    }

    /// Pairs every certificate with the role implied by its position.
    /// Only meaningful once the chain has been validated.
    pub fn classify(&self) -> impl Iterator<Item = (ChainRole, &Certificate)> {
        let len = self.0.len();
        self.0
            .iter()
            .enumerate()
            .map(move |(index, cert)| (ChainRole::for_position(index, len), cert))
    }
}

impl From<Vec<Certificate>> for CertificateChain {
    fn from(certs: Vec<Certificate>) -> Self {
        Self(certs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainRole {
    Leaf,
    /// The node CA that issues the leaf.
    IssuingCa,
    /// The doorman CA between the node CA and the root.
    IntermediateCa,
    Root,
}

impl ChainRole {
    /// Role of the certificate at `index` in a chain of `len` certificates.
    /// A lone certificate is its own root.
    pub fn for_position(index: usize, len: usize) -> ChainRole {
        if index + 1 >= len {
            ChainRole::Root
        } else if index == 0 {
            ChainRole::Leaf
        } else if index == 1 {
            ChainRole::IssuingCa
        } else {
            ChainRole::IntermediateCa
        }
    }
}

impl Display for ChainRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainRole::Leaf => write!(f, "leaf"),
            ChainRole::IssuingCa => write!(f, "node CA"),
            ChainRole::IntermediateCa => write!(f, "doorman CA"),
            ChainRole::Root => write!(f, "root"),
        }
    }
}
