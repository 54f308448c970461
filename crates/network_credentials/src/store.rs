// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential stores: named certificate chains belonging to one node.
//!
//! The on-disk form read by [`PemDirectoryLoader`] is a directory in which
//! every `.pem`, `.crt` or `.cer` file is one entry. The entry's alias is the
//! file stem and its chain is the file's `CERTIFICATE` blocks in order, leaf
//! first. Any other PEM blocks (private keys, parameters) are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::chain::CertificateChain;
use crate::error::DecodeError;
use crate::pem::MultiItemPemBuilder;
use crate::Certificate;

pub const STORE_ENTRY_EXTENSIONS: [&str; 3] = ["pem", "crt", "cer"];

#[derive(Error, Debug, PartialEq)]
pub enum LoadError {
    #[error("credential store {0:?} does not exist")]
    NotFound(PathBuf),
    #[error("credential store {0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("unable to read {0:?}: {1}")]
    CouldNotRead(PathBuf, String),
    #[error("unable to load certificates from {0:?}: {1}")]
    UnexpectedContents(PathBuf, DecodeError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreEntry {
    alias: String,
    chain: CertificateChain,
}

impl StoreEntry {
    pub fn new(alias: impl Into<String>, chain: CertificateChain) -> Self {
        Self {
            alias: alias.into(),
            chain,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// May be empty, e.g. for an entry that only holds a key.
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }
}

pub trait CredentialStore {
    /// Every entry, in the store's enumeration order.
    fn entries(&self) -> &[StoreEntry];

    fn certificate_chain(&self, alias: &str) -> Option<&CertificateChain> {
        self.entries()
            .iter()
            .find(|entry| entry.alias() == alias)
            .map(StoreEntry::chain)
    }
}

/// Opens the credential store found at a path.
pub trait StoreLoader {
    type Store: CredentialStore;

    fn load(&self, path: &Path) -> Result<Self::Store, LoadError>;
}

/// In-memory store, enumerated in alias order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CertificateStore {
    entries: Vec<StoreEntry>,
}

impl CertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any existing entry with the same alias.
    pub fn insert(&mut self, alias: impl Into<String>, chain: CertificateChain) {
        let entry = StoreEntry::new(alias, chain);
        match self
            .entries
            .binary_search_by(|existing| existing.alias.as_str().cmp(entry.alias()))
        {
            Ok(index) => self.entries[index] = entry,
            Err(index) => self.entries.insert(index, entry),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads a PEM directory store.
    pub fn load_pem_dir(path: &Path) -> Result<Self, LoadError> {
        let metadata = fs::metadata(path).map_err(|_| LoadError::NotFound(path.to_owned()))?;
        if !metadata.is_dir() {
            return Err(LoadError::NotADirectory(path.to_owned()));
        }

        let read_dir = fs::read_dir(path)
            .map_err(|err| LoadError::CouldNotRead(path.to_owned(), err.to_string()))?;

        let mut store = CertificateStore::new();
        for dir_entry in read_dir {
            let file_path = dir_entry
                .map_err(|err| LoadError::CouldNotRead(path.to_owned(), err.to_string()))?
                .path();
            let Some(alias) = entry_alias(&file_path) else {
                debug!(path = %file_path.display(), "ignoring non-certificate file in store");
                continue;
            };
            let chain = read_chain_file(&file_path)?;
            store.insert(alias, chain);
        }
        Ok(store)
    }
}

impl CredentialStore for CertificateStore {
    fn entries(&self) -> &[StoreEntry] {
        &self.entries
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PemDirectoryLoader;

impl StoreLoader for PemDirectoryLoader {
    type Store = CertificateStore;

    fn load(&self, path: &Path) -> Result<CertificateStore, LoadError> {
        CertificateStore::load_pem_dir(path)
    }
}

fn entry_alias(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !STORE_ENTRY_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_owned)
}

fn read_chain_file(path: &Path) -> Result<CertificateChain, LoadError> {
    let contents =
        fs::read(path).map_err(|err| LoadError::CouldNotRead(path.to_owned(), err.to_string()))?;
    let certs = MultiItemPemBuilder::parse(contents)
        .and_then(|items| items.find_all::<Certificate>())
        .map_err(|err| LoadError::UnexpectedContents(path.to_owned(), err))?;
    Ok(CertificateChain::from(certs))
}
