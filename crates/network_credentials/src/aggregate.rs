// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Combines the identity and transport stores of one node into a record.

use std::fmt::Display;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::extract::{AliasSelector, ChainExtractor, ExtractionError, RoleLabels};
use crate::name::NameError;
use crate::record::NodeCredentialRecord;
use crate::scratch::ScratchScope;
use crate::store::{CredentialStore, StoreLoader};

pub const DEFAULT_IDENTITY_STORE: &str = "nodekeystore";
pub const DEFAULT_TLS_STORE: &str = "sslkeystore";
const CERTIFICATES_DIR: &str = "certificates";

/// How a node's TLS chain is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPolicy {
    /// Never read the TLS store.
    Skip,
    /// Include the TLS chain when it can be extracted, otherwise leave it out.
    #[default]
    Optional,
    /// A node without an extractable TLS chain is dropped.
    Required,
}

impl Display for TransportPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportPolicy::Skip => write!(f, "skip"),
            TransportPolicy::Optional => write!(f, "optional"),
            TransportPolicy::Required => write!(f, "required"),
        }
    }
}

#[derive(Error, Debug)]
#[error("could not parse transport policy, expected one of (skip, optional, required)")]
pub struct TransportPolicyParseError;

impl FromStr for TransportPolicy {
    type Err = TransportPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(TransportPolicy::Skip),
            "optional" => Ok(TransportPolicy::Optional),
            "required" => Ok(TransportPolicy::Required),
            _ => Err(TransportPolicyParseError),
        }
    }
}

/// Where a node's stores live: `<nodes_dir>/<node>/certificates/<store>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreLayout {
    nodes_dir: PathBuf,
    identity_store: String,
    tls_store: String,
}

impl StoreLayout {
    pub fn new(nodes_dir: impl Into<PathBuf>) -> Self {
        Self {
            nodes_dir: nodes_dir.into(),
            identity_store: DEFAULT_IDENTITY_STORE.to_owned(),
            tls_store: DEFAULT_TLS_STORE.to_owned(),
        }
    }

    pub fn with_store_names(
        mut self,
        identity_store: impl Into<String>,
        tls_store: impl Into<String>,
    ) -> Self {
        self.identity_store = identity_store.into();
        self.tls_store = tls_store.into();
        self
    }

    pub fn nodes_dir(&self) -> &Path {
        &self.nodes_dir
    }

    pub fn certificates_dir(&self, node: &str) -> PathBuf {
        self.nodes_dir.join(node).join(CERTIFICATES_DIR)
    }

    pub fn identity_store_path(&self, node: &str) -> PathBuf {
        self.certificates_dir(node).join(&self.identity_store)
    }

    pub fn tls_store_path(&self, node: &str) -> PathBuf {
        self.certificates_dir(node).join(&self.tls_store)
    }

    /// Loads the stores `policy` asks for. Under [`TransportPolicy::Optional`]
    /// a TLS store that cannot be loaded is logged and left out.
    ///
    /// `node` must name a directory directly inside the nodes directory.
    pub fn load_node_stores<L: StoreLoader>(
        &self,
        loader: &L,
        node: &str,
        policy: TransportPolicy,
    ) -> Result<NodeStores<L::Store>, ExtractionError> {
        check_node_id(node)?;
        let identity = loader.load(&self.identity_store_path(node))?;
        let transport = match policy {
            TransportPolicy::Skip => None,
            TransportPolicy::Optional => match loader.load(&self.tls_store_path(node)) {
                Ok(store) => Some(store),
                Err(err) => {
                    warn!(node, %err, "TLS store unavailable, continuing without it");
                    None
                }
            },
            TransportPolicy::Required => Some(
                loader
                    .load(&self.tls_store_path(node))
                    .map_err(|err| ExtractionError::Transport(Box::new(err.into())))?,
            ),
        };
        Ok(NodeStores {
            identity,
            transport,
        })
    }
}

fn check_node_id(node: &str) -> Result<(), ExtractionError> {
    let mut components = Path::new(node).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == node => Ok(()),
        _ => Err(ExtractionError::InvalidNodeId(node.to_owned())),
    }
}

/// The loaded stores of one node.
#[derive(Clone, Debug)]
pub struct NodeStores<S> {
    pub identity: S,
    pub transport: Option<S>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeAggregator {
    identity: ChainExtractor,
    transport: ChainExtractor,
    policy: TransportPolicy,
}

impl Default for NodeAggregator {
    fn default() -> Self {
        Self::new(TransportPolicy::default())
    }
}

impl NodeAggregator {
    pub fn new(policy: TransportPolicy) -> Self {
        Self {
            identity: ChainExtractor::new(AliasSelector::Any, RoleLabels::identity()),
            transport: ChainExtractor::new(AliasSelector::Any, RoleLabels::transport())
                .without_organization(),
            policy,
        }
    }

    pub fn with_identity_selector(mut self, selector: AliasSelector) -> Self {
        self.identity.selector = selector;
        self
    }

    pub fn with_transport_selector(mut self, selector: AliasSelector) -> Self {
        self.transport.selector = selector;
        self
    }

    pub fn policy(&self) -> TransportPolicy {
        self.policy
    }

    pub fn build_node_record<S: CredentialStore>(
        &self,
        stores: &NodeStores<S>,
        scratch: &ScratchScope,
    ) -> Result<NodeCredentialRecord, ExtractionError> {
        let identity = self.identity.extract(&stores.identity, scratch)?;
        let name = identity
            .organization()
            .cloned()
            .ok_or_else(|| NameError::MissingAttribute("Organization".to_owned()))?;

        let transport = match (self.policy, stores.transport.as_ref()) {
            (TransportPolicy::Skip, _) => None,
            (TransportPolicy::Optional, None) => None,
            (TransportPolicy::Required, None) => {
                return Err(ExtractionError::TransportStoreMissing)
            }
            (TransportPolicy::Optional, Some(store)) => {
                match self.transport.extract(store, scratch) {
                    Ok(chain) => Some(chain),
                    Err(err) => {
                        warn!(
                            organization = %name,
                            %err,
                            "no usable TLS chain, record will not carry transport credentials"
                        );
                        None
                    }
                }
            }
            (TransportPolicy::Required, Some(store)) => Some(
                self.transport
                    .extract(store, scratch)
                    .map_err(|err| ExtractionError::Transport(Box::new(err)))?,
            ),
        };

        info!(
            organization = %name,
            identities = identity.leaf_certs().len(),
            transport = transport.is_some(),
            "extracted node credentials"
        );
        Ok(NodeCredentialRecord::new(name, identity, transport))
    }
}
