// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-node scratch space for encoded certificate artifacts.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;

use crate::error::EncodeError;

const SCRATCH_PREFIX: &str = "netcred-";
const ARTIFACT_EXT: &str = "pem";

#[derive(Error, Debug, PartialEq)]
pub enum ScratchError {
    #[error("unable to allocate scratch space: {0}")]
    Unavailable(String),
    #[error("unable to remove scratch space {0:?}: {1}")]
    Release(PathBuf, String),
}

/// A uniquely named temporary directory. Everything persisted into it is
/// removed on [`ScratchScope::release`], or when the scope is dropped.
#[derive(Debug)]
pub struct ScratchScope {
    dir: TempDir,
}

impl ScratchScope {
    pub fn acquire() -> Result<Self, ScratchError> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .map_err(|err| ScratchError::Unavailable(err.to_string()))?;
        Ok(Self { dir })
    }

    pub fn acquire_in(parent: &Path) -> Result<Self, ScratchError> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)
            .map_err(|err| ScratchError::Unavailable(format!("{}: {err}", parent.display())))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `contents` to a new file named after `label`. Repeated labels get
    /// a numeric suffix, so earlier artifacts are never overwritten.
    pub fn persist(&self, label: &str, contents: &str) -> Result<PathBuf, EncodeError> {
        let mut attempt = 0usize;
        loop {
            let file_name = match attempt {
                0 => format!("{label}.{ARTIFACT_EXT}"),
                n => format!("{label}-{n}.{ARTIFACT_EXT}"),
            };
            let path = self.dir.path().join(file_name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(contents.as_bytes())
                        .map_err(|err| EncodeError::CouldNotPersist(path.clone(), err.to_string()))?;
                    return Ok(path);
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(EncodeError::CouldNotPersist(path, err.to_string())),
            }
        }
    }

    pub fn release(self) -> Result<(), ScratchError> {
        let path = self.dir.path().to_owned();
        self.dir
            .close()
            .map_err(|err| ScratchError::Release(path, err.to_string()))
    }
}
