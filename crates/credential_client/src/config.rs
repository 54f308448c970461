// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bundle builder configuration, read from CLI args/env vars or a TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Deserialize;

use network_credentials::{
    AliasSelector, BatchOptions, NodeAggregator, StoreLayout, TransportPolicy,
    DEFAULT_IDENTITY_STORE, DEFAULT_TLS_STORE,
};

use crate::shims::error::CredentialCliError;

#[derive(Clone, Debug, PartialEq, Eq, Args, Deserialize)]
pub struct Config {
    #[clap(
        long,
        help = "Directory holding one subdirectory per node",
        env = "NETCRED_NODES_DIR"
    )]
    pub nodes_dir: PathBuf,

    #[clap(
        long = "node",
        help = "Node to include in the bundle; may be repeated",
        env = "NETCRED_NODES",
        value_delimiter = ',',
        required = true
    )]
    pub nodes: Vec<String>,

    #[clap(
        long,
        help = "Name of the identity store inside each node's certificates directory",
        default_value_t = Config::default_identity_store(),
        env = "NETCRED_IDENTITY_STORE"
    )]
    #[serde(default = "Config::default_identity_store")]
    pub identity_store: String,

    #[clap(
        long,
        help = "Name of the TLS store inside each node's certificates directory",
        default_value_t = Config::default_tls_store(),
        env = "NETCRED_TLS_STORE"
    )]
    #[serde(default = "Config::default_tls_store")]
    pub tls_store: String,

    #[clap(
        long,
        help = "How TLS chains are handled [possible values: skip, optional, required]",
        default_value_t = TransportPolicy::default(),
        env = "NETCRED_TRANSPORT"
    )]
    #[serde(default)]
    pub transport: TransportPolicy,

    #[clap(
        long,
        help = "Only consider identity store entries whose alias starts with this prefix",
        env = "NETCRED_IDENTITY_ALIAS_PREFIX"
    )]
    pub identity_alias_prefix: Option<String>,

    #[clap(
        long,
        help = "Where to write the bundle (.json); printed to stdout when absent",
        env = "NETCRED_OUTPUT"
    )]
    pub output: Option<PathBuf>,

    #[clap(
        long,
        help = "Parent directory for per-node scratch space",
        env = "NETCRED_SCRATCH_DIR"
    )]
    pub scratch_dir: Option<PathBuf>,
}

impl Config {
    pub fn default_identity_store() -> String {
        DEFAULT_IDENTITY_STORE.to_owned()
    }

    pub fn default_tls_store() -> String {
        DEFAULT_TLS_STORE.to_owned()
    }

    /// Reads a TOML config. Relative paths in it are taken relative to the
    /// file's own directory.
    pub fn from_toml_file(path: &Path) -> Result<Self, CredentialCliError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| CredentialCliError::ConfigRead(path.to_owned(), err.to_string()))?;
        let config: Config = toml::from_str(&contents)
            .map_err(|err| CredentialCliError::ConfigParse(path.to_owned(), err.to_string()))?;
        let parent_path = path.parent().unwrap_or(".".as_ref());
        Ok(config.relative_to(parent_path))
    }

    pub fn relative_to(mut self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        self.nodes_dir = base.join(self.nodes_dir);
        self.output = self.output.map(|p| base.join(p));
        self.scratch_dir = self.scratch_dir.map(|p| base.join(p));
        self
    }

    pub fn batch_options(&self) -> BatchOptions {
        let layout = StoreLayout::new(&self.nodes_dir)
            .with_store_names(&self.identity_store, &self.tls_store);
        let mut aggregator = NodeAggregator::new(self.transport);
        if let Some(prefix) = &self.identity_alias_prefix {
            aggregator = aggregator.with_identity_selector(AliasSelector::Prefix(prefix.clone()));
        }
        BatchOptions {
            layout,
            aggregator,
            scratch_root: self.scratch_dir.clone(),
        }
    }
}
