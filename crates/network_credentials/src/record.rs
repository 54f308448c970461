// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::extract::ExtractedChain;
use crate::name::Organization;

/// Everything a relay needs to trust one node: its organization and the
/// transport encoded certificates of its identity hierarchy, optionally
/// followed by the hierarchy its TLS certificates chain to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCredentialRecord {
    name: Organization,
    root_certs: Vec<String>,
    intermediate_certs: Vec<String>,
    node_ca_certs: Vec<String>,
    identity_certs: Vec<String>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    transport: Option<TransportCredentials>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportCredentials {
    tls_root_certs: Vec<String>,
    tls_intermediate_certs: Vec<String>,
    tls_node_ca_certs: Vec<String>,
    tls_certs: Vec<String>,
}

impl NodeCredentialRecord {
    /// `name` is the organization of the identity leaf; the transport chain
    /// never names the node.
    pub fn new(
        name: Organization,
        identity: ExtractedChain,
        transport: Option<ExtractedChain>,
    ) -> Self {
        let [root_certs, intermediate_certs, node_ca_certs, identity_certs] =
            identity.into_parts();
        Self {
            name,
            root_certs,
            intermediate_certs,
            node_ca_certs,
            identity_certs,
            transport: transport.map(TransportCredentials::from),
        }
    }

    pub fn name(&self) -> &Organization {
        &self.name
    }

    pub fn root_certs(&self) -> &[String] {
        &self.root_certs
    }

    pub fn intermediate_certs(&self) -> &[String] {
        &self.intermediate_certs
    }

    pub fn node_ca_certs(&self) -> &[String] {
        &self.node_ca_certs
    }

    pub fn identity_certs(&self) -> &[String] {
        &self.identity_certs
    }

    pub fn transport(&self) -> Option<&TransportCredentials> {
        self.transport.as_ref()
    }
}

impl TransportCredentials {
    pub fn tls_root_certs(&self) -> &[String] {
        &self.tls_root_certs
    }

    pub fn tls_intermediate_certs(&self) -> &[String] {
        &self.tls_intermediate_certs
    }

    pub fn tls_node_ca_certs(&self) -> &[String] {
        &self.tls_node_ca_certs
    }

    pub fn tls_certs(&self) -> &[String] {
        &self.tls_certs
    }
}

impl From<ExtractedChain> for TransportCredentials {
    fn from(chain: ExtractedChain) -> Self {
        let [tls_root_certs, tls_intermediate_certs, tls_node_ca_certs, tls_certs] =
            chain.into_parts();
        Self {
            tls_root_certs,
            tls_intermediate_certs,
            tls_node_ca_certs,
            tls_certs,
        }
    }
}
