// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence and reconciliation of per-example test statuses.
//!
//! A test run observes a status (`passed`, `failed`, `pending`, ...) for each
//! example it executes. This crate keeps those statuses across runs, so that a
//! later run can select only the examples that failed last time, while still
//! remembering examples that were filtered out of the latest run.
//!
//! # Architecture
//!
//! - [`ExampleStatusRecord`]: an ordered mapping of field names to string values.
//! - [`StatusMerger`]: reconciles this run's records with the previously
//!   persisted records, pruning examples that provably no longer exist.
//! - [`table::encode`] and [`table::decode`]: the fixed-width, human-diffable
//!   text table used as the on-disk format.
//! - [`StatusStore`]: loads, merges and saves that table at a given path.
//! - [`StatusConfig`]: user configuration for the store.

#![warn(missing_docs)]

mod config;
pub mod errors;
mod existence;
mod merge;
mod record;
mod store;
pub mod table;

pub use config::{
    COLOR_ENV, CONFIG_FILE_NAME, ConfigLocation, ENV_PREFIX, EnvSource, LOG_ENV, StatusConfig,
    StoreConfig,
};
pub use existence::{ExistenceCache, FilesystemSpecFiles, SpecFileExists};
pub use merge::{StatusMerger, merge, sort_records};
pub use record::{
    EXAMPLE_ID_FIELD, ExampleId, ExampleStatusRecord, FAILED_STATUS, PASSED_STATUS,
    PENDING_STATUS, RUN_TIME_FIELD, STATUS_FIELD, ScopedId, UNKNOWN_STATUS,
};
pub use store::{StatusStore, StatusSummary, failed_example_ids};
