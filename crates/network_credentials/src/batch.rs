// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds a bundle from many nodes. A node that fails is logged, reported in
//! the outcome and left out of the bundle; the remaining nodes carry on.

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{NodeAggregator, StoreLayout};
use crate::bundle::CredentialBundle;
use crate::extract::ExtractionError;
use crate::scratch::{ScratchError, ScratchScope};
use crate::store::StoreLoader;

#[derive(Error, Debug, PartialEq)]
pub enum BatchError {
    #[error(transparent)]
    Scratch(#[from] ScratchError),
}

#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub layout: StoreLayout,
    pub aggregator: NodeAggregator,
    /// Parent directory for per-node scratch space. The system temporary
    /// directory when absent.
    pub scratch_root: Option<PathBuf>,
}

impl BatchOptions {
    pub fn new(layout: StoreLayout, aggregator: NodeAggregator) -> Self {
        Self {
            layout,
            aggregator,
            scratch_root: None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct SkippedNode {
    pub node: String,
    pub error: ExtractionError,
}

#[derive(Debug, Default, PartialEq)]
pub struct BatchOutcome {
    pub bundle: CredentialBundle,
    pub skipped: Vec<SkippedNode>,
}

pub fn build_bundle<L, I, N>(
    nodes: I,
    loader: &L,
    options: &BatchOptions,
) -> Result<BatchOutcome, BatchError>
where
    L: StoreLoader,
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    let mut outcome = BatchOutcome::default();
    let mut seen = BTreeSet::new();

    for node in nodes {
        let node = node.as_ref();
        if !seen.insert(node.to_owned()) {
            debug!(node, "node listed more than once, ignoring repeat");
            continue;
        }

        let scratch = match &options.scratch_root {
            Some(root) => ScratchScope::acquire_in(root)?,
            None => ScratchScope::acquire()?,
        };

        let result = options
            .layout
            .load_node_stores(loader, node, options.aggregator.policy())
            .and_then(|stores| options.aggregator.build_node_record(&stores, &scratch));

        if let Err(err) = scratch.release() {
            warn!(node, %err, "could not clean up scratch space");
        }

        match result {
            Ok(record) => {
                outcome.bundle.insert(node, record);
            }
            Err(error) => {
                warn!(node, %error, "skipping node");
                outcome.skipped.push(SkippedNode {
                    node: node.to_owned(),
                    error,
                });
            }
        }
    }

    info!(
        extracted = outcome.bundle.len(),
        skipped = outcome.skipped.len(),
        "credential bundle assembled"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{build_bundle, BatchError, BatchOptions};
    use crate::aggregate::{NodeAggregator, StoreLayout, TransportPolicy};
    use crate::extract::ExtractionError;
    use crate::scratch::ScratchError;
    use crate::store::{LoadError, PemDirectoryLoader};
    use crate::test_helpers::{write_node, HierarchyBuilder};

    fn options(dir: &TempDir) -> BatchOptions {
        BatchOptions::new(
            StoreLayout::new(dir.path()),
            NodeAggregator::new(TransportPolicy::Optional),
        )
    }

    #[test]
    fn failed_nodes_are_reported_and_left_out() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);
        write_node(
            &opts.layout,
            "PartyA",
            &HierarchyBuilder::new("Alice Corp").build(),
        );

        let outcome =
            build_bundle(["PartyA", "PartyB"], &PemDirectoryLoader, &opts).unwrap();

        assert_eq!(outcome.bundle.node_ids().collect::<Vec<_>>(), ["PartyA"]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].node, "PartyB");
        assert_eq!(
            outcome.skipped[0].error,
            ExtractionError::Load(LoadError::NotFound(
                opts.layout.identity_store_path("PartyB")
            ))
        );
    }

    #[test]
    fn node_ids_outside_the_nodes_dir_are_skipped() {
        let dir = TempDir::new().unwrap();
        let hierarchy = HierarchyBuilder::new("Mallory Corp").build();
        write_node(&StoreLayout::new(dir.path()), "Outside", &hierarchy);
        let opts = BatchOptions::new(
            StoreLayout::new(dir.path().join("nodes")),
            NodeAggregator::new(TransportPolicy::Optional),
        );

        let outcome = build_bundle(["../Outside"], &PemDirectoryLoader, &opts).unwrap();
        assert!(outcome.bundle.is_empty());
        assert_eq!(
            outcome.skipped[0].error,
            ExtractionError::InvalidNodeId("../Outside".to_owned())
        );
    }

    #[test]
    fn repeated_nodes_are_processed_once() {
        let dir = TempDir::new().unwrap();
        let opts = options(&dir);
        write_node(
            &opts.layout,
            "PartyA",
            &HierarchyBuilder::new("Alice Corp").build(),
        );

        let outcome = build_bundle(
            vec!["PartyA".to_owned(), "PartyA".to_owned()],
            &PemDirectoryLoader,
            &opts,
        )
        .unwrap();
        assert_eq!(outcome.bundle.len(), 1);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn scratch_space_is_released_for_every_node() {
        let dir = TempDir::new().unwrap();
        let scratch_root = TempDir::new().unwrap();
        let mut opts = options(&dir);
        opts.scratch_root = Some(scratch_root.path().to_owned());
        write_node(
            &opts.layout,
            "PartyA",
            &HierarchyBuilder::new("Alice Corp").build(),
        );

        build_bundle(["PartyA", "PartyB"], &PemDirectoryLoader, &opts).unwrap();
        assert_eq!(std::fs::read_dir(scratch_root.path()).unwrap().count(), 0);
    }

    #[test]
    fn unavailable_scratch_space_aborts_the_batch() {
        let dir = TempDir::new().unwrap();
        let mut opts = options(&dir);
        opts.scratch_root = Some(dir.path().join("missing"));

        assert!(matches!(
            build_bundle(["PartyA"], &PemDirectoryLoader, &opts),
            Err(BatchError::Scratch(ScratchError::Unavailable(_)))
        ));
    }

    #[test]
    fn no_nodes_gives_an_empty_bundle() {
        let dir = TempDir::new().unwrap();
        let outcome =
            build_bundle(Vec::<String>::new(), &PemDirectoryLoader, &options(&dir)).unwrap();
        assert!(outcome.bundle.is_empty());
        assert!(outcome.skipped.is_empty());
    }
}
