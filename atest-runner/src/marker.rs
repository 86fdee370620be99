// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PASS/FAILED marker files.
//!
//! A marker is an empty file named `<scenario>.<KIND>` in the pass directory. Only its existence
//! matters.

use crate::errors::{MarkerError, MarkerOperation};
use camino::Utf8PathBuf;
use std::{fmt, fs, io};

/// The kind of marker.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MarkerKind {
    /// Every repetition of the scenario passed.
    Pass,

    /// The scenario failed.
    ///
    /// Stale FAILED markers are removed before a scenario runs, but the driver never writes one:
    /// a failure ends the run with a non-zero exit code instead.
    Failed,
}

impl MarkerKind {
    /// The file extension for this kind.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Marker files under a single directory.
#[derive(Clone, Debug)]
pub struct MarkerStore {
    dir: Utf8PathBuf,
}

impl MarkerStore {
    /// Creates a store rooted at `dir`. The directory is not created.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The path of a marker.
    pub fn path(&self, scenario: &str, kind: MarkerKind) -> Utf8PathBuf {
        self.dir.join(format!("{scenario}.{kind}"))
    }

    /// Returns true if the marker exists.
    pub fn exists(&self, scenario: &str, kind: MarkerKind) -> bool {
        self.path(scenario, kind).exists()
    }

    /// Removes the PASS and FAILED markers for a scenario. Missing markers are not an error.
    pub fn clear(&self, scenario: &str) -> Result<(), MarkerError> {
        for kind in [MarkerKind::Pass, MarkerKind::Failed] {
            let path = self.path(scenario, kind);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => return Err(MarkerError::new(MarkerOperation::Remove, path, error)),
            }
        }
        Ok(())
    }

    /// Creates an empty marker, truncating any existing one, and returns its path.
    pub fn write(&self, scenario: &str, kind: MarkerKind) -> Result<Utf8PathBuf, MarkerError> {
        let path = self.path(scenario, kind);
        match fs::File::create(&path) {
            Ok(_) => Ok(path),
            Err(error) => Err(MarkerError::new(MarkerOperation::Create, path, error)),
        }
    }
}
