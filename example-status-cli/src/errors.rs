// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::{FromPathBufError, Utf8PathBuf};
use example_status::errors::{ConfigParseError, PersistError, StoreClearError, StoreLoadError};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `example-status` failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum ExampleStatusExitCode {}

impl ExampleStatusExitCode {
    /// No errors occurred and example-status exited normally.
    pub const OK: i32 = 0;

    /// The working directory, the config, or an input file could not be set up.
    pub const SETUP_ERROR: i32 = 96;

    /// The statuses could not be merged because an input broke the record
    /// contract.
    pub const MERGE_FAILED: i32 = 97;

    /// Reading, writing or removing the status file failed.
    pub const STORE_ERROR: i32 = 98;

    /// Writing data to stdout failed.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected error that causes example-status to exit.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    GetCurrentDirFailed { error: std::io::Error },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { error: FromPathBufError },
    #[error("directory not found")]
    DirectoryNotFound { path: Utf8PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to read this run's statuses")]
    ThisRunRead {
        path: Utf8PathBuf,
        err: std::io::Error,
    },
    #[error("failed to load statuses")]
    StoreLoad {
        #[from]
        err: StoreLoadError,
    },
    #[error("failed to clear statuses")]
    StoreClear {
        #[from]
        err: StoreClearError,
    },
    #[error("failed to persist statuses")]
    Persist {
        #[from]
        err: PersistError,
    },
    #[error("error writing output")]
    WriteOutput { err: std::io::Error },
    #[error("error serializing output as JSON")]
    SerializeJson { err: serde_json::Error },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::GetCurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::DirectoryNotFound { .. }
            | Self::ConfigParseError { .. }
            | Self::ThisRunRead { .. } => ExampleStatusExitCode::SETUP_ERROR,
            Self::Persist {
                err: PersistError::Merge { .. },
            } => ExampleStatusExitCode::MERGE_FAILED,
            Self::StoreLoad { .. } | Self::StoreClear { .. } | Self::Persist { .. } => {
                ExampleStatusExitCode::STORE_ERROR
            }
            Self::WriteOutput { .. } | Self::SerializeJson { .. } => {
                ExampleStatusExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error: Option<&dyn Error> = match self {
            Self::GetCurrentDirFailed { error } => {
                error!("could not determine the current directory");
                Some(error as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { error } => {
                error!("current directory is not valid UTF-8");
                Some(error as &dyn Error)
            }
            Self::DirectoryNotFound { path } => {
                error!("directory `{}` not found", path.style(styles.bold));
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse config at `{}`",
                    err.config_file().style(styles.bold)
                );
                err.source()
            }
            Self::ThisRunRead { path, err } => {
                error!(
                    "failed to read this run's statuses from `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::StoreLoad { err } => {
                error!("{err}");
                err.source()
            }
            Self::StoreClear { err } => {
                error!("{err}");
                err.source()
            }
            Self::Persist {
                err: PersistError::Merge { path, error },
            } => {
                error!("failed to merge statuses into `{}`", path.style(styles.bold));
                Some(error as &dyn Error)
            }
            Self::Persist { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteOutput { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
            Self::SerializeJson { err } => {
                error!("error serializing output as JSON");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use example_status::errors::{MergeError, MergeListKind, StoreSaveError};

    #[test]
    fn persist_errors_map_to_distinct_exit_codes() {
        let merge = ExpectedError::from(PersistError::Merge {
            path: "statuses.txt".into(),
            error: MergeError::MissingExampleId {
                list: MergeListKind::ThisRun,
                index: 0,
            },
        });
        assert_eq!(merge.process_exit_code(), ExampleStatusExitCode::MERGE_FAILED);

        let save = ExpectedError::from(PersistError::Save(StoreSaveError::CreateDir {
            path: "dir".into(),
            error: std::io::Error::other("read-only"),
        }));
        assert_eq!(save.process_exit_code(), ExampleStatusExitCode::STORE_ERROR);
    }
}
