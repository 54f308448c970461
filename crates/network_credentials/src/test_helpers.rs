// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for throwaway certificate hierarchies and on-disk node stores.

use std::fs;
use std::path::{Path, PathBuf};

use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, Issuer, KeyPair};

use crate::aggregate::StoreLayout;
use crate::pem::MultiItemPemBuilder;
use crate::{Certificate, CertificateChain};

pub const ROOT_CA_NAME: &str = "Network Root CA";
pub const DOORMAN_CA_NAME: &str = "Network Doorman CA";
pub const NETWORK_OPERATOR: &str = "Network Operator";

/// Aliases used by a typical node identity store and TLS store.
pub const NODE_CA_ALIAS: &str = "cordaclientca";
pub const IDENTITY_ALIAS: &str = "identity-private-key";
pub const TLS_ALIAS: &str = "cordaclienttls";

type Subject = Vec<(DnType, String)>;

/// Builds a four level hierarchy: leaf <- node CA <- doorman CA <- root.
pub struct HierarchyBuilder {
    root: Subject,
    doorman: Subject,
    node_ca: Subject,
    leaf: Subject,
}

impl HierarchyBuilder {
    /// Hierarchy for a node whose legal name carries `organization`.
    pub fn new(organization: &str) -> Self {
        let node_name = vec![
            (DnType::OrganizationName, organization.to_owned()),
            (DnType::LocalityName, "London".to_owned()),
            (DnType::CountryName, "GB".to_owned()),
        ];
        Self {
            root: vec![
                (DnType::CommonName, ROOT_CA_NAME.to_owned()),
                (DnType::OrganizationName, NETWORK_OPERATOR.to_owned()),
            ],
            doorman: vec![
                (DnType::CommonName, DOORMAN_CA_NAME.to_owned()),
                (DnType::OrganizationName, NETWORK_OPERATOR.to_owned()),
            ],
            node_ca: node_name.clone(),
            leaf: node_name,
        }
    }

    pub fn leaf_subject(mut self, subject: &[(DnType, &str)]) -> Self {
        self.leaf = to_subject(subject);
        self
    }

    pub fn build(self) -> TestHierarchy {
        let root_key = generate_key();
        let root_params = ca_params(&self.root);
        let root = root_params
            .clone()
            .self_signed(&root_key)
            .expect("could not self sign root");
        let root_issuer = Issuer::new(root_params, root_key);

        let doorman_key = generate_key();
        let doorman_params = ca_params(&self.doorman);
        let doorman = doorman_params
            .clone()
            .signed_by(&doorman_key, &root_issuer)
            .expect("could not issue doorman CA");
        let doorman_issuer = Issuer::new(doorman_params, doorman_key);

        let node_ca_key = generate_key();
        let node_ca_params = ca_params(&self.node_ca);
        let node_ca = node_ca_params
            .clone()
            .signed_by(&node_ca_key, &doorman_issuer)
            .expect("could not issue node CA");
        let node_ca_issuer = Issuer::new(node_ca_params, node_ca_key);

        let leaf = leaf_params(&self.leaf)
            .signed_by(&generate_key(), &node_ca_issuer)
            .expect("could not issue leaf");

        let certs = [leaf, node_ca, doorman, root]
            .iter()
            .map(|cert| Certificate::from_der(cert.der().to_vec()).expect("rcgen produced bad DER"))
            .collect();

        TestHierarchy {
            certs,
            node_ca_issuer,
        }
    }
}

pub struct TestHierarchy {
    certs: Vec<Certificate>,
    node_ca_issuer: Issuer<'static, KeyPair>,
}

impl TestHierarchy {
    /// leaf, node CA, doorman CA, root
    pub fn chain(&self) -> &[Certificate] {
        &self.certs
    }

    pub fn certificate_chain(&self) -> CertificateChain {
        CertificateChain::from_certificates(self.certs.iter().cloned())
    }

    pub fn leaf(&self) -> &Certificate {
        &self.certs[0]
    }

    pub fn root(&self) -> &Certificate {
        &self.certs[3]
    }

    /// The chain without its leaf, as held under a node CA alias.
    pub fn node_ca_chain(&self) -> CertificateChain {
        CertificateChain::from_certificates(self.certs[1..].iter().cloned())
    }

    /// A fresh leaf issued by this hierarchy's node CA, with the rest of the chain attached.
    pub fn issue_leaf(&self, subject: &[(DnType, &str)]) -> CertificateChain {
        let leaf = leaf_params(&to_subject(subject))
            .signed_by(&generate_key(), &self.node_ca_issuer)
            .expect("could not issue leaf");
        let leaf = Certificate::from_der(leaf.der().to_vec()).expect("rcgen produced bad DER");
        CertificateChain::from_certificates(
            std::iter::once(leaf).chain(self.certs[1..].iter().cloned()),
        )
    }
}

/// Flips the final byte of the certificate's signature. The result still parses.
pub fn corrupt_signature(cert: &Certificate) -> Certificate {
    let mut der = cert.as_der().to_vec();
    if let Some(last) = der.last_mut() {
        *last ^= 0x01;
    }
    Certificate::from_der(der).expect("corrupted certificate should still parse")
}

/// Writes `chain` as the entry `alias` of the PEM directory store at `store_dir`.
pub fn write_store_entry(store_dir: &Path, alias: &str, chain: &[Certificate]) -> PathBuf {
    fs::create_dir_all(store_dir).expect("could not create store directory");
    let mut builder = MultiItemPemBuilder::new();
    for cert in chain {
        builder.add_item(cert);
    }
    let path = store_dir.join(alias).with_extension("pem");
    fs::write(&path, builder.finish()).expect("could not write store entry");
    path
}

/// Lays out a node the way a deployed node holds its stores: the identity
/// store with a node CA entry and an identity entry, and the TLS store with a
/// TLS leaf issued by the same node CA.
pub fn write_node(layout: &StoreLayout, node: &str, hierarchy: &TestHierarchy) {
    let identity_dir = layout.identity_store_path(node);
    write_store_entry(
        &identity_dir,
        NODE_CA_ALIAS,
        hierarchy.node_ca_chain().certificates(),
    );
    write_store_entry(&identity_dir, IDENTITY_ALIAS, hierarchy.chain());

    let tls = hierarchy.issue_leaf(&[
        (DnType::OrganizationName, "TLS"),
        (DnType::CommonName, node),
    ]);
    write_store_entry(&layout.tls_store_path(node), TLS_ALIAS, tls.certificates());
}

fn to_subject(subject: &[(DnType, &str)]) -> Subject {
    subject
        .iter()
        .map(|(ty, value)| (ty.clone(), (*value).to_owned()))
        .collect()
}

fn generate_key() -> KeyPair {
    KeyPair::generate().expect("could not generate key pair")
}

fn base_params(subject: &Subject) -> CertificateParams {
    let mut params =
        CertificateParams::new(Vec::<String>::new()).expect("empty SAN list is always valid");
    let mut name = rcgen::DistinguishedName::new();
    for (ty, value) in subject {
        name.push(ty.clone(), value.as_str());
    }
    params.distinguished_name = name;
    params
}

fn ca_params(subject: &Subject) -> CertificateParams {
    let mut params = base_params(subject);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params
}

fn leaf_params(subject: &Subject) -> CertificateParams {
    let mut params = base_params(subject);
    params.is_ca = IsCa::ExplicitNoCa;
    params
}
