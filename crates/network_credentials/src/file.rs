// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::CredentialBundle;

pub const BUNDLE_EXT: &str = "json";

/// Writes the bundle as pretty printed JSON. An existing file is only
/// replaced when `overwrite` is set.
pub fn save_bundle_to_file(
    bundle: &CredentialBundle,
    path: &Path,
    overwrite: bool,
) -> Result<(), FileError> {
    validate_extension(path, BUNDLE_EXT)?;
    let contents = bundle
        .to_json_pretty()
        .map_err(|err| FileError::CouldNotSerializeBundle(err.to_string()))?;

    let mut file = if overwrite {
        File::create(path).map_err(|err| FileError::FileCreation(path.to_owned(), err.to_string()))?
    } else {
        create_new_file(path)?
    };
    writeln!(file, "{}", contents).map_err(|err| FileError::FileWriteError(err.to_string()))?;
    Ok(())
}

pub fn load_bundle_from_file(path: &Path) -> Result<CredentialBundle, FileError> {
    validate_extension(path, BUNDLE_EXT)?;
    let contents = fs::read(path).map_err(|_| FileError::CouldNotReadFromFile(path.to_owned()))?;
    serde_json::from_slice(&contents)
        .map_err(|err| FileError::UnexpectedBundleFileContents(path.to_owned(), err.to_string()))
}

fn create_new_file(path: &Path) -> Result<File, FileError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| FileError::FileCreation(path.to_owned(), err.to_string()))
}

fn validate_extension(path: &Path, expected_ext: &str) -> Result<(), FileError> {
    if let Some(ext) = path.extension() {
        if ext == expected_ext {
            return Ok(());
        }
    }
    Err(FileError::UnexpectedFileExtension(
        path.to_owned(),
        expected_ext.to_string(),
    ))
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FileError {
    #[error("Unable to create the file {:?}. Error: {}.", .0, .1)]
    FileCreation(PathBuf, String),
    #[error("Unable to serialize the credential bundle: {0}.")]
    CouldNotSerializeBundle(String),
    #[error("Unable to read from {:?}. Perhaps the file does not exist.", .0)]
    CouldNotReadFromFile(PathBuf),
    #[error("The supplied file {:?} does not have the expected extension ({}).", .0, .1)]
    UnexpectedFileExtension(PathBuf, String),
    #[error("Unable to load a credential bundle from the supplied file {0:?}: {1}")]
    UnexpectedBundleFileContents(PathBuf, String),
    #[error("Unable to write to file. {0}.")]
    FileWriteError(String),
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{load_bundle_from_file, save_bundle_to_file, FileError, BUNDLE_EXT};
    use crate::aggregate::{NodeAggregator, StoreLayout, TransportPolicy};
    use crate::batch::{build_bundle, BatchOptions};
    use crate::store::PemDirectoryLoader;
    use crate::test_helpers::{write_node, HierarchyBuilder};
    use crate::CredentialBundle;

    fn bundle() -> (TempDir, CredentialBundle) {
        let dir = TempDir::new().unwrap();
        let opts = BatchOptions::new(
            StoreLayout::new(dir.path()),
            NodeAggregator::new(TransportPolicy::Optional),
        );
        write_node(
            &opts.layout,
            "PartyA",
            &HierarchyBuilder::new("Alice Corp").build(),
        );
        let outcome = build_bundle(["PartyA"], &PemDirectoryLoader, &opts).unwrap();
        (dir, outcome.bundle)
    }

    #[test]
    fn can_save_bundle_and_load_from_file() {
        let (dir, bundle) = bundle();
        let path = dir.path().join("bundle.json");

        save_bundle_to_file(&bundle, &path, false).unwrap();
        let loaded = load_bundle_from_file(&path).unwrap();
        assert_eq!(loaded, bundle);
    }

    #[test]
    fn refuses_to_overwrite_unless_asked() {
        let (dir, bundle) = bundle();
        let path = dir.path().join("bundle.json");
        fs::write(&path, "{}").unwrap();

        assert!(matches!(
            save_bundle_to_file(&bundle, &path, false),
            Err(FileError::FileCreation(_, _))
        ));
        save_bundle_to_file(&bundle, &path, true).unwrap();
        assert_eq!(load_bundle_from_file(&path).unwrap(), bundle);
    }

    #[test]
    fn wrong_extension_is_rejected() {
        let (dir, bundle) = bundle();
        let path = dir.path().join("bundle.txt");
        assert_eq!(
            save_bundle_to_file(&bundle, &path, false),
            Err(FileError::UnexpectedFileExtension(
                path.clone(),
                BUNDLE_EXT.to_owned()
            ))
        );
    }

    #[test]
    fn malformed_contents_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.json");
        fs::write(&path, r#"{"PartyA": {"name": "Alice Corp"}}"#).unwrap();
        assert!(matches!(
            load_bundle_from_file(&path),
            Err(FileError::UnexpectedBundleFileContents(_, _))
        ));
    }
}
