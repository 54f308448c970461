// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::record::NodeCredentialRecord;

/// Node identifier to record. Serializes as a single JSON object with keys in
/// sorted order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialBundle(BTreeMap<String, NodeCredentialRecord>);

impl CredentialBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node's record. Returns false, leaving the bundle untouched, if
    /// the node already has one.
    pub fn insert(&mut self, node: impl Into<String>, record: NodeCredentialRecord) -> bool {
        match self.0.entry(node.into()) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(record);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, node: &str) -> Option<&NodeCredentialRecord> {
        self.0.get(node)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.0.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeCredentialRecord)> {
        self.0.iter().map(|(node, record)| (node.as_str(), record))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::CredentialBundle;
    use crate::extract::ChainExtractor;
    use crate::record::NodeCredentialRecord;
    use crate::scratch::ScratchScope;
    use crate::store::CertificateStore;
    use crate::test_helpers::HierarchyBuilder;

    fn record(organization: &str) -> NodeCredentialRecord {
        let hierarchy = HierarchyBuilder::new(organization).build();
        let mut store = CertificateStore::new();
        store.insert("identity", hierarchy.certificate_chain());
        let scratch = ScratchScope::acquire().unwrap();
        let identity = ChainExtractor::default().extract(&store, &scratch).unwrap();
        let name = identity.organization().unwrap().clone();
        NodeCredentialRecord::new(name, identity, None)
    }

    #[test]
    fn keys_are_unique_and_sorted() {
        let mut bundle = CredentialBundle::new();
        assert!(bundle.insert("PartyB", record("Bob Corp")));
        assert!(bundle.insert("PartyA", record("Alice Corp")));
        assert!(!bundle.insert("PartyA", record("Mallory Corp")));

        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.node_ids().collect::<Vec<_>>(), ["PartyA", "PartyB"]);
        assert_eq!(bundle.get("PartyA").unwrap().name().as_str(), "Alice Corp");
    }

    #[test]
    fn serializes_as_object_keyed_by_node() {
        let mut bundle = CredentialBundle::new();
        bundle.insert("PartyA", record("Alice Corp"));

        let json = bundle.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["PartyA"]["name"], "Alice Corp");

        let parsed: CredentialBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn empty_bundle_is_an_empty_object() {
        assert_eq!(CredentialBundle::new().to_json_pretty().unwrap(), "{}");
    }
}
