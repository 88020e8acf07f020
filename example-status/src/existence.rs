// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checking whether spec files still exist.

use crate::errors::MergeError;
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    collections::{BTreeSet, HashMap},
    io,
};
use tracing::trace;

/// Answers whether a spec file currently exists.
///
/// The merger uses this to decide whether records for spec files that weren't
/// loaded this run should be kept.
pub trait SpecFileExists {
    /// Returns true if the spec file at `path` exists.
    fn spec_file_exists(&self, path: &Utf8Path) -> io::Result<bool>;
}

impl<E: SpecFileExists + ?Sized> SpecFileExists for &E {
    fn spec_file_exists(&self, path: &Utf8Path) -> io::Result<bool> {
        (**self).spec_file_exists(path)
    }
}

/// A known, fixed set of spec files.
impl SpecFileExists for BTreeSet<Utf8PathBuf> {
    fn spec_file_exists(&self, path: &Utf8Path) -> io::Result<bool> {
        Ok(self.contains(path))
    }
}

/// Checks spec files against the filesystem.
#[derive(Clone, Debug, Default)]
pub struct FilesystemSpecFiles {
    root: Option<Utf8PathBuf>,
}

impl FilesystemSpecFiles {
    /// Resolves relative spec file paths against the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative spec file paths against `root`.
    pub fn with_root(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Returns the root that relative paths are resolved against, if any.
    pub fn root(&self) -> Option<&Utf8Path> {
        self.root.as_deref()
    }
}

impl SpecFileExists for FilesystemSpecFiles {
    fn spec_file_exists(&self, path: &Utf8Path) -> io::Result<bool> {
        match &self.root {
            Some(root) => root.join(path).try_exists(),
            None => path.try_exists(),
        }
    }
}

/// Memoizes [`SpecFileExists`] answers for the duration of one merge.
///
/// Each distinct spec file is queried at most once. Errors are not cached.
#[derive(Debug)]
pub struct ExistenceCache<'a, E: ?Sized> {
    inner: &'a E,
    cache: HashMap<String, bool>,
}

impl<'a, E: SpecFileExists + ?Sized> ExistenceCache<'a, E> {
    /// Creates an empty cache over `inner`.
    pub fn new(inner: &'a E) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
        }
    }

    /// Returns whether `spec_file` exists, querying `inner` on first use.
    pub fn exists(&mut self, spec_file: &str) -> Result<bool, MergeError> {
        if let Some(&exists) = self.cache.get(spec_file) {
            return Ok(exists);
        }

        let path = Utf8Path::new(spec_file);
        let exists =
            self.inner
                .spec_file_exists(path)
                .map_err(|error| MergeError::SpecFileExists {
                    path: path.to_owned(),
                    error,
                })?;
        trace!(spec_file, exists, "checked spec file existence");
        self.cache.insert(spec_file.to_owned(), exists);
        Ok(exists)
    }

    /// Returns the number of distinct spec files queried so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns true if no spec files have been queried.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
