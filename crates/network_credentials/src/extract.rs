// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Selection and materialization of the canonical chain held in a store.
//!
//! The first valid four certificate chain in a store supplies the whole
//! hierarchy (root, doorman CA, node CA, leaf). Every later valid chain
//! contributes its leaf only: a store is expected to hold several identities
//! issued under a single hierarchy.
//!
//! Only identity stores name the node. Transport extraction runs with
//! [`ChainExtractor::without_organization`] and never looks at the leaf subject.

use thiserror::Error;
use tracing::{debug, warn};

use crate::chain::ChainRole;
use crate::error::EncodeError;
use crate::name::{extract_organization, NameError, Organization};
use crate::pem::encode_to_transport_form;
use crate::scratch::ScratchScope;
use crate::store::{CredentialStore, LoadError, StoreEntry};
use crate::validation::{validate_chain, ChainValidationError};

/// Only chains of exactly this length are considered for extraction.
pub const CANONICAL_CHAIN_LENGTH: usize = 4;

#[derive(Error, Debug, PartialEq)]
pub enum ExtractionError {
    #[error("no valid 4 certificate chain found ({candidates} candidate(s) rejected)")]
    NoMatchingChain {
        candidates: usize,
        first_rejection: Option<ChainValidationError>,
    },
    #[error("unable to determine organization: {0}")]
    Name(#[from] NameError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("node identifier {0:?} is not a single directory name")]
    InvalidNodeId(String),
    #[error("transport credentials are required but no transport store was loaded")]
    TransportStoreMissing,
    #[error("transport credentials: {0}")]
    Transport(Box<ExtractionError>),
}

/// Which store entries are considered at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AliasSelector {
    #[default]
    Any,
    Exact(Vec<String>),
    Prefix(String),
}

impl AliasSelector {
    pub fn matches(&self, alias: &str) -> bool {
        match self {
            AliasSelector::Any => true,
            AliasSelector::Exact(aliases) => aliases.iter().any(|a| a == alias),
            AliasSelector::Prefix(prefix) => alias.starts_with(prefix.as_str()),
        }
    }
}

/// Labels naming the scratch artifacts written for each role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleLabels {
    pub root: String,
    pub doorman: String,
    pub node_ca: String,
    pub leaf: String,
}

impl RoleLabels {
    pub fn identity() -> Self {
        Self::with_leaf_label("identity")
    }

    pub fn transport() -> Self {
        Self::with_leaf_label("tls")
    }

    fn with_leaf_label(leaf: &str) -> Self {
        Self {
            root: "root".to_owned(),
            doorman: "doorman".to_owned(),
            node_ca: "nodeca".to_owned(),
            leaf: leaf.to_owned(),
        }
    }

    pub fn label(&self, role: ChainRole) -> &str {
        match role {
            ChainRole::Root => &self.root,
            ChainRole::IntermediateCa => &self.doorman,
            ChainRole::IssuingCa => &self.node_ca,
            ChainRole::Leaf => &self.leaf,
        }
    }
}

impl Default for RoleLabels {
    fn default() -> Self {
        Self::identity()
    }
}

/// Transport encoded certificates of one store, grouped by role. Each list
/// holds distinct encodings in the order they were first seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedChain {
    /// `None` when the extractor did not ask for one.
    organization: Option<Organization>,
    root_certs: Vec<String>,
    intermediate_certs: Vec<String>,
    node_ca_certs: Vec<String>,
    leaf_certs: Vec<String>,
}

impl ExtractedChain {
    fn new(organization: Option<Organization>) -> Self {
        Self {
            organization,
            root_certs: Vec::new(),
            intermediate_certs: Vec::new(),
            node_ca_certs: Vec::new(),
            leaf_certs: Vec::new(),
        }
    }

    pub fn organization(&self) -> Option<&Organization> {
        self.organization.as_ref()
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

    pub fn leaf_certs(&self) -> &[String] {
        &self.leaf_certs
    }

    pub(crate) fn into_parts(self) -> [Vec<String>; 4] {
        [
            self.root_certs,
            self.intermediate_certs,
            self.node_ca_certs,
            self.leaf_certs,
        ]
    }

    fn certs_mut(&mut self, role: ChainRole) -> &mut Vec<String> {
        match role {
            ChainRole::Root => &mut self.root_certs,
            ChainRole::IntermediateCa => &mut self.intermediate_certs,
            ChainRole::IssuingCa => &mut self.node_ca_certs,
            ChainRole::Leaf => &mut self.leaf_certs,
        }
    }

    fn record(&mut self, role: ChainRole, encoded: String) {
        let certs = self.certs_mut(role);
        if !certs.contains(&encoded) {
            certs.push(encoded);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainExtractor {
    pub selector: AliasSelector,
    pub labels: RoleLabels,
    /// Whether the leaf of the materialized chain must carry an Organization.
    pub require_organization: bool,
}

impl Default for ChainExtractor {
    fn default() -> Self {
        Self::new(AliasSelector::default(), RoleLabels::default())
    }
}

impl ChainExtractor {
    pub fn new(selector: AliasSelector, labels: RoleLabels) -> Self {
        Self {
            selector,
            labels,
            require_organization: true,
        }
    }

    /// Extracts certificates only, leaving the organization unset.
    pub fn without_organization(mut self) -> Self {
        self.require_organization = false;
        self
    }

    pub fn extract<S: CredentialStore + ?Sized>(
        &self,
        store: &S,
        scratch: &ScratchScope,
    ) -> Result<ExtractedChain, ExtractionError> {
        let mut extracted: Option<ExtractedChain> = None;
        let mut candidates = 0usize;
        let mut first_rejection = None;

        for entry in store.entries() {
            if !self.selector.matches(entry.alias()) {
                debug!(alias = entry.alias(), "alias not selected");
                continue;
            }
            if entry.chain().len() != CANONICAL_CHAIN_LENGTH {
                debug!(
                    alias = entry.alias(),
                    length = entry.chain().len(),
                    "skipping chain of non-canonical length"
                );
                continue;
            }
            if let Err(err) = validate_chain(entry.chain().certificates()) {
                debug!(alias = entry.alias(), %err, "skipping invalid chain");
                candidates += 1;
                first_rejection.get_or_insert(err);
                continue;
            }

            match extracted.as_mut() {
                None => extracted = Some(self.materialize(entry, scratch)?),
                Some(chain) => self.add_leaf(chain, entry, scratch)?,
            }
        }

        extracted.ok_or(ExtractionError::NoMatchingChain {
            candidates,
            first_rejection,
        })
    }

    fn materialize(
        &self,
        entry: &StoreEntry,
        scratch: &ScratchScope,
    ) -> Result<ExtractedChain, ExtractionError> {
        let mut extracted = ExtractedChain::new(None);
        for (role, cert) in entry.chain().classify() {
            if role == ChainRole::Leaf && self.require_organization {
                extracted.organization = Some(extract_organization(cert.subject())?);
            }
            let encoded = encode_to_transport_form(cert);
            scratch.persist(self.labels.label(role), &encoded)?;
            extracted.record(role, encoded);
        }
        debug!(
            alias = entry.alias(),
            organization = ?extracted.organization.as_ref().map(Organization::as_str),
            "materialized canonical chain"
        );
        Ok(extracted)
    }

    fn add_leaf(
        &self,
        extracted: &mut ExtractedChain,
        entry: &StoreEntry,
        scratch: &ScratchScope,
    ) -> Result<(), ExtractionError> {
        let chain = entry.chain();
        if let Some(root) = chain.root() {
            if !extracted.root_certs.contains(&encode_to_transport_form(root)) {
                warn!(
                    alias = entry.alias(),
                    subject = %root.subject(),
                    "chain is rooted in a different hierarchy; recording its leaf only"
                );
            }
        }

        let Some(leaf) = chain.leaf() else {
            return Ok(());
        };
        let encoded = encode_to_transport_form(leaf);
        if extracted.leaf_certs.contains(&encoded) {
            debug!(alias = entry.alias(), "leaf already recorded");
            return Ok(());
        }
        scratch.persist(self.labels.label(ChainRole::Leaf), &encoded)?;
        extracted.record(ChainRole::Leaf, encoded);
        Ok(())
    }
}

/// Runs a [`ChainExtractor`] built from `selector` and `labels` over `store`.
pub fn extract_chain<S: CredentialStore + ?Sized>(
    store: &S,
    selector: AliasSelector,
    labels: RoleLabels,
    scratch: &ScratchScope,
) -> Result<ExtractedChain, ExtractionError> {
    ChainExtractor::new(selector, labels).extract(store, scratch)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rcgen::DnType;

    use super::{
        extract_chain, AliasSelector, ChainExtractor, ExtractionError, RoleLabels,
    };
    use crate::name::NameError;
    use crate::pem::{decode_transport_form, encode_to_transport_form};
    use crate::scratch::ScratchScope;
    use crate::store::CertificateStore;
    use crate::test_helpers::{corrupt_signature, HierarchyBuilder};
    use crate::validation::ChainValidationError;
    use crate::CertificateChain;

    fn extract(store: &CertificateStore) -> Result<super::ExtractedChain, ExtractionError> {
        let scratch = ScratchScope::acquire().unwrap();
        ChainExtractor::default().extract(store, &scratch)
    }

    #[test]
    fn single_chain_is_fully_materialized() {
        let hierarchy = HierarchyBuilder::new("Alice Corp").build();
        let mut store = CertificateStore::new();
        store.insert("identity-private-key", hierarchy.certificate_chain());

        let extracted = extract(&store).unwrap();
        let chain = hierarchy.chain();
        assert_eq!(extracted.organization().unwrap().as_str(), "Alice Corp");
        assert_eq!(extracted.leaf_certs(), [encode_to_transport_form(&chain[0])]);
        assert_eq!(extracted.node_ca_certs(), [encode_to_transport_form(&chain[1])]);
        assert_eq!(
            extracted.intermediate_certs(),
            [encode_to_transport_form(&chain[2])]
        );
        assert_eq!(extracted.root_certs(), [encode_to_transport_form(&chain[3])]);
    }

    #[test]
    fn later_chains_contribute_only_their_leaf() {
        let hierarchy = HierarchyBuilder::new("Alice Corp").build();
        let second = hierarchy.issue_leaf(&[(DnType::OrganizationName, "Alice Corp")]);
        let mut store = CertificateStore::new();
        store.insert("a-identity", hierarchy.certificate_chain());
        store.insert("b-identity", second.clone());

        let extracted = extract(&store).unwrap();
        assert_eq!(extracted.root_certs().len(), 1);
        assert_eq!(extracted.intermediate_certs().len(), 1);
        assert_eq!(extracted.node_ca_certs().len(), 1);
        assert_eq!(
            extracted.leaf_certs(),
            [
                encode_to_transport_form(&hierarchy.chain()[0]),
                encode_to_transport_form(second.leaf().unwrap()),
            ]
        );
    }

    #[test]
    fn duplicate_leaves_are_recorded_once() {
        let hierarchy = HierarchyBuilder::new("Alice Corp").build();
        let mut store = CertificateStore::new();
        store.insert("first", hierarchy.certificate_chain());
        store.insert("second", hierarchy.certificate_chain());

        let extracted = extract(&store).unwrap();
        assert_eq!(extracted.leaf_certs().len(), 1);
    }

    #[test]
    fn chains_of_other_lengths_are_skipped() {
        let hierarchy = HierarchyBuilder::new("Alice Corp").build();
        let mut store = CertificateStore::new();
        store.insert("cordaclientca", hierarchy.node_ca_chain());
        store.insert("empty", CertificateChain::new());

        assert_eq!(
            extract(&store),
            Err(ExtractionError::NoMatchingChain {
                candidates: 0,
                first_rejection: None
            })
        );
    }

    #[test]
    fn invalid_chains_are_skipped_in_favour_of_valid_ones() {
        let hierarchy = HierarchyBuilder::new("Alice Corp").build();
        let mut broken = hierarchy.chain().to_vec();
        broken[1] = corrupt_signature(&broken[1]);

        let mut store = CertificateStore::new();
        store.insert("a-broken", CertificateChain::from(broken));
        store.insert("b-good", hierarchy.certificate_chain());

        let extracted = extract(&store).unwrap();
        assert_eq!(extracted.leaf_certs().len(), 1);
    }

    #[test]
    fn only_invalid_chains_is_no_matching_chain() {
        let hierarchy = HierarchyBuilder::new("Alice Corp").build();
        let mut broken = hierarchy.chain().to_vec();
        broken.swap(1, 2);

        let mut store = CertificateStore::new();
        store.insert("identity", CertificateChain::from(broken));

        assert_eq!(
            extract(&store),
            Err(ExtractionError::NoMatchingChain {
                candidates: 1,
                first_rejection: Some(ChainValidationError::IssuerMismatch { position: 0 })
            })
        );
    }

    #[test]
    fn leaf_without_organization_fails_extraction() {
        let hierarchy = HierarchyBuilder::new("Alice Corp")
            .leaf_subject(&[(DnType::CommonName, "anonymous")])
            .build();
        let mut store = CertificateStore::new();
        store.insert("identity", hierarchy.certificate_chain());

        assert!(matches!(
            extract(&store),
            Err(ExtractionError::Name(NameError::MissingAttribute(_)))
        ));
    }

    #[test]
    fn leaf_without_organization_is_extracted_when_not_required() {
        let hierarchy = HierarchyBuilder::new("Alice Corp").build();
        let tls = hierarchy.issue_leaf(&[(DnType::CommonName, "partya.example")]);
        let mut store = CertificateStore::new();
        store.insert("cordaclienttls", tls.clone());

        let scratch = ScratchScope::acquire().unwrap();
        let extracted = ChainExtractor::new(AliasSelector::Any, RoleLabels::transport())
            .without_organization()
            .extract(&store, &scratch)
            .unwrap();
        assert_eq!(extracted.organization(), None);
        assert_eq!(
            extracted.leaf_certs(),
            [encode_to_transport_form(tls.leaf().unwrap())]
        );
        assert_eq!(extracted.root_certs(), [encode_to_transport_form(hierarchy.root())]);
    }

    #[test]
    fn selector_limits_the_considered_entries() {
        let alice = HierarchyBuilder::new("Alice Corp").build();
        let bob = HierarchyBuilder::new("Bob Corp").build();
        let mut store = CertificateStore::new();
        store.insert("alice", alice.certificate_chain());
        store.insert("bob", bob.certificate_chain());

        let scratch = ScratchScope::acquire().unwrap();
        let extracted = extract_chain(
            &store,
            AliasSelector::Exact(vec!["bob".to_owned()]),
            RoleLabels::identity(),
            &scratch,
        )
        .unwrap();
        assert_eq!(extracted.organization().unwrap().as_str(), "Bob Corp");
        assert_eq!(extracted.leaf_certs().len(), 1);

        let extracted = extract_chain(
            &store,
            AliasSelector::Prefix("ali".to_owned()),
            RoleLabels::identity(),
            &scratch,
        )
        .unwrap();
        assert_eq!(extracted.organization().unwrap().as_str(), "Alice Corp");
    }

    #[test]
    fn foreign_hierarchy_contributes_leaf_only() {
        let alice = HierarchyBuilder::new("Alice Corp").build();
        let bob = HierarchyBuilder::new("Bob Corp").build();
        let mut store = CertificateStore::new();
        store.insert("a", alice.certificate_chain());
        store.insert("b", bob.certificate_chain());

        let extracted = extract(&store).unwrap();
        assert_eq!(extracted.organization().unwrap().as_str(), "Alice Corp");
        assert_eq!(
            extracted.root_certs(),
            [encode_to_transport_form(alice.root())]
        );
        assert_eq!(extracted.leaf_certs().len(), 2);
    }

    #[test]
    fn artifacts_are_persisted_under_role_labels() {
        let hierarchy = HierarchyBuilder::new("Alice Corp").build();
        let mut store = CertificateStore::new();
        store.insert("identity", hierarchy.certificate_chain());

        let scratch = ScratchScope::acquire().unwrap();
        ChainExtractor::new(AliasSelector::Any, RoleLabels::transport())
            .extract(&store, &scratch)
            .unwrap();

        let mut names: Vec<_> = fs::read_dir(scratch.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["doorman.pem", "nodeca.pem", "root.pem", "tls.pem"]);

        let persisted = fs::read_to_string(scratch.path().join("root.pem")).unwrap();
        let root = decode_transport_form(&persisted).unwrap();
        assert_eq!(root.subject(), hierarchy.root().subject());
    }
}
