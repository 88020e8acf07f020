// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by example-status.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::io;
use thiserror::Error;

/// An error that occurred while parsing the scoped portion of an example ID.
///
/// Example IDs are produced upstream and are expected to look like
/// `spec/foo_spec.rb[1:2:3]`. This error indicates that the upstream producer
/// violated that contract.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("non-numeric scoped-id component in example ID `{example_id}`: {reason}")]
pub struct ScopedIdParseError {
    example_id: String,
    reason: ScopedIdParseErrorReason,
}

impl ScopedIdParseError {
    pub(crate) fn new(example_id: impl Into<String>, reason: ScopedIdParseErrorReason) -> Self {
        Self {
            example_id: example_id.into(),
            reason,
        }
    }

    /// Returns the example ID that failed to parse.
    pub fn example_id(&self) -> &str {
        &self.example_id
    }

    /// Returns the reason the example ID failed to parse.
    pub fn reason(&self) -> &ScopedIdParseErrorReason {
        &self.reason
    }
}

/// The reason a scoped ID failed to parse.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScopedIdParseErrorReason {
    /// The scoped ID did not end with `]`.
    #[error("missing closing `]`")]
    MissingClosingBracket,

    /// A component was empty, e.g. `[1::2]` or `[]`.
    #[error("empty component at position {index}")]
    EmptyComponent {
        /// The zero-based position of the component.
        index: usize,
    },

    /// A component was not a non-negative integer.
    #[error("component `{component}` is not a non-negative integer")]
    InvalidComponent {
        /// The offending component.
        component: String,
    },

    /// A component was an integer larger than `u64::MAX`.
    #[error("component `{component}` does not fit in 64 bits")]
    ComponentOutOfRange {
        /// The offending component.
        component: String,
    },
}

/// An error that occurred while merging example status lists.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MergeError {
    /// A record did not have an `example_id` field.
    #[error("record at position {index} in the {list} list has no `example_id` field")]
    MissingExampleId {
        /// Which list the record came from.
        list: MergeListKind,
        /// The position of the record within that list.
        index: usize,
    },

    /// An example ID could not be parsed while sorting.
    #[error("failed to sort merged records")]
    ScopedId(#[from] ScopedIdParseError),

    /// Checking whether a spec file exists failed.
    #[error("failed to check whether spec file `{path}` exists")]
    SpecFileExists {
        /// The spec file being checked.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },
}

/// Identifies one of the two lists passed into a merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeListKind {
    /// Records observed during this run.
    ThisRun,
    /// Records persisted by a previous run.
    Previous,
}

impl std::fmt::Display for MergeListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ThisRun => write!(f, "this-run"),
            Self::Previous => write!(f, "previous-run"),
        }
    }
}

/// An error that occurred while loading a status file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreLoadError {
    /// Error reading the status file.
    #[error("failed to read status file at {path}")]
    Read {
        /// The path that failed to be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while saving a status file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreSaveError {
    /// Error creating the parent directory.
    #[error("failed to create directory {path}")]
    CreateDir {
        /// The directory path that failed to be created.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// Error writing the status file.
    #[error("failed to write status file to {path}")]
    Write {
        /// The path that failed to be written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: atomicwrites::Error<io::Error>,
    },
}

/// An error that occurred while clearing a status file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreClearError {
    /// Error removing the status file.
    #[error("failed to remove status file at {path}")]
    Remove {
        /// The path that failed to be removed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while loading, merging and saving statuses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistError {
    /// Loading the previous statuses failed.
    #[error(transparent)]
    Load(#[from] StoreLoadError),

    /// Merging failed.
    #[error("failed to merge statuses for {path}")]
    Merge {
        /// The status file being updated.
        path: Utf8PathBuf,
        /// The underlying merge error.
        #[source]
        error: MergeError,
    },

    /// Saving the merged statuses failed.
    #[error(transparent)]
    Save(#[from] StoreSaveError),
}

/// An error that occurred while parsing the user config.
#[derive(Debug, Error)]
#[error("failed to parse example-status config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &camino::Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing the user config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}
